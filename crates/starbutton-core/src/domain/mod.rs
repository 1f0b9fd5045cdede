//! Domain entities for the StarButtonBox server.
//!
//! Pure data and arithmetic with no OS or network dependencies, so it can be
//! unit-tested on any platform.
//!
//! - [`geometry`] – Screen points in desktop pixel coordinates.
//! - [`drag`] – The source/destination pair used by the automatic drag loop.

pub mod drag;
pub mod geometry;

//! # starbutton-core
//!
//! Shared library for the StarButtonBox PC server containing the UDP wire
//! protocol, the macro action model, drag-loop geometry, and key name
//! translation tables.
//!
//! This crate has zero dependencies on OS APIs, sockets, or threads.  The
//! server crate layers the network loop, worker pool, and input emulation on
//! top of it.
//!
//! # Architecture overview (for beginners)
//!
//! A phone app (the "button box") sends small JSON datagrams to the PC over
//! the LAN.  Each datagram is a [`Packet`] with a `type` tag.  Some packets
//! carry a second, JSON-encoded document in their `payload` field; for macro
//! commands that document describes an [`Action`]: tap a key, hold a mouse
//! button, scroll the wheel, and so on.
//!
//! - **`protocol`** – The packet envelope, the packet type enum, and the
//!   typed payloads (actions, capture requests, loop commands).
//!
//! - **`domain`** – Screen points and the drag endpoint pair used by the
//!   automatic drag loop.
//!
//! - **`keymap`** – Translation from the key names used on the wire
//!   (`"a"`, `"shift"`, `"pagedown"`) to Windows virtual-key codes.

pub mod domain;
pub mod keymap;
pub mod protocol;

pub use domain::drag::{CapturePurpose, DragEndpoints};
pub use domain::geometry::Point;
pub use protocol::action::{Action, KeyAction, PointerAction, PressKind, PressType, ScrollAction};
pub use protocol::packet::{decode_packet, encode_packet, DecodeError, Packet, PacketId, PacketType};

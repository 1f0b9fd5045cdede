//! Infrastructure layer for the dispatch server.
//!
//! Contains OS-facing adapters: input synthesis, the UDP socket, the settings
//! file, LAN advertisement and the browser opener.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `starbutton_core`, but MUST NOT be imported by the `application` layer.
//!
//! # Sub-modules
//!
//! - **`input_emulation`** – implementations of `PlatformInputEmulator`,
//!   selected at compile time with `#[cfg(target_os)]`, plus a
//!   `MockInputEmulator` for tests.
//! - **`network`** – the `DispatchServer` that owns the socket, the receive
//!   thread and the worker pool.
//! - **`storage`** – `server_settings.toml` persistence.
//! - **`discovery`** – mDNS service registration.
//! - **`browser`** – opens URLs in the default browser.

pub mod browser;
pub mod discovery;
pub mod input_emulation;
pub mod network;
pub mod storage;

//! starbutton-server library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does the server do?
//!
//! The StarButtonBox phone app is a configurable button panel.  Each button
//! sends a small JSON datagram over UDP to this server, which runs on the
//! gaming PC and turns the datagram into real keyboard and mouse input:
//!
//! 1. `HEALTH_CHECK_PING` is answered with a `HEALTH_CHECK_PONG` so the app
//!    can show a connection indicator.
//! 2. `MACRO_COMMAND` is acknowledged immediately, then handed to a worker
//!    pool that presses modifiers, taps or holds the key or mouse button,
//!    and releases the modifiers again.
//! 3. `CAPTURE_MOUSE_POSITION` and `AUTO_DRAG_LOOP_COMMAND` drive a repeating
//!    drag between two captured screen points.
//! 4. `TRIGGER_IMPORT_BROWSER` opens a URL on the PC.
//!
//! The server also advertises itself over mDNS so the app can find it
//! without the user typing an address.

/// Application layer: use cases and the collaborator traits they need.
pub mod application;

/// Infrastructure layer: OS adapters, network, settings and discovery.
pub mod infrastructure;

//! Platform-specific input emulation implementations.
//!
//! The correct implementation is selected at compile time via
//! `#[cfg(target_os = ...)]`; [`platform_emulator`] returns it.

use std::sync::Arc;

use crate::application::emulate_input::PlatformInputEmulator;

pub mod mock;
pub mod null;

#[cfg(target_os = "windows")]
pub mod windows;

/// Returns the input emulator for the current platform.
///
/// Windows gets the `SendInput` backend.  Other platforms get a
/// [`null::NullInputEmulator`] that only logs, so the server can still be run
/// and its protocol tested there.
pub fn platform_emulator() -> Arc<dyn PlatformInputEmulator> {
    #[cfg(target_os = "windows")]
    {
        Arc::new(windows::WindowsInputEmulator::new())
    }

    #[cfg(not(target_os = "windows"))]
    {
        tracing::warn!("no input backend for this platform; input will only be logged");
        Arc::new(null::NullInputEmulator::new())
    }
}

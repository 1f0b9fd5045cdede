//! The OS input synthesis port.
//!
//! The executor and the drag loop talk to the operating system only through
//! [`PlatformInputEmulator`].  Platform implementations live in
//! `infrastructure::input_emulation`; tests inject recording doubles.

use starbutton_core::{protocol::MouseButton, Point};
use thiserror::Error;

/// Error type for input emulation operations.
#[derive(Debug, Error)]
pub enum EmulationError {
    #[error("platform error: {0}")]
    Platform(String),
    #[error("unknown key name: {0:?}")]
    UnknownKey(String),
    #[error("unknown mouse button: {0:?}")]
    UnknownButton(String),
    #[error("unknown scroll direction: {0:?}")]
    UnknownScrollDirection(String),
    #[error("empty key name")]
    EmptyKey,
}

/// Platform-agnostic input emulation trait.
///
/// Keys are identified by their wire names (`"a"`, `"shift"`, `"f5"`); each
/// backend resolves them to native codes.
pub trait PlatformInputEmulator: Send + Sync {
    /// Emulates a key press (key-down event).
    fn emit_key_down(&self, key: &str) -> Result<(), EmulationError>;

    /// Emulates a key release (key-up event).
    fn emit_key_up(&self, key: &str) -> Result<(), EmulationError>;

    /// Presses and immediately releases a key.
    fn emit_key_tap(&self, key: &str) -> Result<(), EmulationError> {
        self.emit_key_down(key)?;
        self.emit_key_up(key)
    }

    /// Emulates a mouse button press or release at the current cursor position.
    fn emit_mouse_button(&self, button: MouseButton, pressed: bool) -> Result<(), EmulationError>;

    /// Presses and immediately releases a mouse button.
    fn emit_mouse_click(&self, button: MouseButton) -> Result<(), EmulationError> {
        self.emit_mouse_button(button, true)?;
        self.emit_mouse_button(button, false)
    }

    /// Scrolls the vertical wheel.  Positive `clicks` scroll up.
    fn emit_mouse_scroll(&self, clicks: i32) -> Result<(), EmulationError>;

    /// Moves the cursor to an absolute desktop position.
    fn emit_mouse_move(&self, x: i32, y: i32) -> Result<(), EmulationError>;

    /// Reads the current cursor position.
    fn cursor_position(&self) -> Result<Point, EmulationError>;
}

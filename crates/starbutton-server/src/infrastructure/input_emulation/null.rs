//! Input emulator for platforms without a native backend.
//!
//! Every call is logged at debug level.  A virtual cursor tracks
//! `emit_mouse_move` so drag endpoint capture still returns something
//! meaningful.

use std::sync::Mutex;

use starbutton_core::{protocol::MouseButton, Point};
use tracing::debug;

use crate::application::emulate_input::{EmulationError, PlatformInputEmulator};

#[derive(Default)]
pub struct NullInputEmulator {
    cursor: Mutex<Point>,
}

impl NullInputEmulator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PlatformInputEmulator for NullInputEmulator {
    fn emit_key_down(&self, key: &str) -> Result<(), EmulationError> {
        debug!("key down {key:?} (no input backend)");
        Ok(())
    }

    fn emit_key_up(&self, key: &str) -> Result<(), EmulationError> {
        debug!("key up {key:?} (no input backend)");
        Ok(())
    }

    fn emit_mouse_button(&self, button: MouseButton, pressed: bool) -> Result<(), EmulationError> {
        debug!("mouse {button:?} pressed={pressed} (no input backend)");
        Ok(())
    }

    fn emit_mouse_scroll(&self, clicks: i32) -> Result<(), EmulationError> {
        debug!("scroll {clicks} (no input backend)");
        Ok(())
    }

    fn emit_mouse_move(&self, x: i32, y: i32) -> Result<(), EmulationError> {
        *self.cursor.lock().unwrap_or_else(|p| p.into_inner()) = Point::new(x, y);
        debug!("mouse move to ({x}, {y}) (no input backend)");
        Ok(())
    }

    fn cursor_position(&self) -> Result<Point, EmulationError> {
        Ok(*self.cursor.lock().unwrap_or_else(|p| p.into_inner()))
    }
}

//! Mock platform input emulator for tests.
//!
//! # Why a mock emulator?
//!
//! The real backend makes OS calls that need a desktop session, actually move
//! the cursor or press keys on the test machine, and cannot be observed from
//! Rust test code.  `MockInputEmulator` instead records every call, with the
//! time it was made, so tests can assert on exactly what was emitted and in
//! what order relative to other events such as reply datagrams.
//!
//! # Usage in tests
//!
//! ```ignore
//! let emulator = Arc::new(MockInputEmulator::new());
//! emulator.set_cursor(Point::new(100, 200));
//! // ... run the server with `emulator` ...
//! assert_eq!(emulator.calls(), vec![InputCall::KeyDown("a".into()), InputCall::KeyUp("a".into())]);
//! ```
//!
//! Call [`MockInputEmulator::set_should_fail`] to make every method return
//! `EmulationError::Platform`, to exercise error-handling paths.  Narrower
//! failures are injected with [`MockInputEmulator::fail_key`],
//! [`MockInputEmulator::set_fail_moves`] and
//! [`MockInputEmulator::set_fail_cursor`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use starbutton_core::{protocol::MouseButton, Point};

use crate::application::emulate_input::{EmulationError, PlatformInputEmulator};

/// One recorded emulator call.
#[derive(Debug, Clone, PartialEq)]
pub enum InputCall {
    KeyDown(String),
    KeyUp(String),
    MouseButton(MouseButton, bool),
    Scroll(i32),
    MouseMove(i32, i32),
}

/// A mock emulator that records all calls without performing OS API calls.
#[derive(Default)]
pub struct MockInputEmulator {
    calls: Mutex<Vec<(Instant, InputCall)>>,
    cursor: Mutex<Point>,
    should_fail: AtomicBool,
    failing_keys: Mutex<Vec<String>>,
    fail_moves: AtomicBool,
    fail_cursor: AtomicBool,
}

impl MockInputEmulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded calls in order.
    pub fn calls(&self) -> Vec<InputCall> {
        self.lock_calls().iter().map(|(_, call)| call.clone()).collect()
    }

    /// Recorded calls with the instant each was made.
    pub fn timed_calls(&self) -> Vec<(Instant, InputCall)> {
        self.lock_calls().clone()
    }

    /// Sets the position reported by `cursor_position`.
    pub fn set_cursor(&self, point: Point) {
        *self.cursor.lock().unwrap_or_else(|p| p.into_inner()) = point;
    }

    /// When `true`, every method returns an `EmulationError::Platform`.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::SeqCst);
    }

    /// Makes key-down of `key` fail; other keys still succeed.
    pub fn fail_key(&self, key: &str) {
        self.failing_keys
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(key.to_string());
    }

    /// When `true`, `emit_mouse_move` fails and records nothing.
    pub fn set_fail_moves(&self, fail: bool) {
        self.fail_moves.store(fail, Ordering::SeqCst);
    }

    /// When `true`, `cursor_position` fails.
    pub fn set_fail_cursor(&self, fail: bool) {
        self.fail_cursor.store(fail, Ordering::SeqCst);
    }

    fn lock_calls(&self) -> std::sync::MutexGuard<'_, Vec<(Instant, InputCall)>> {
        self.calls.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn record(&self, call: InputCall) -> Result<(), EmulationError> {
        if self.should_fail.load(Ordering::SeqCst) {
            return Err(EmulationError::Platform("mock failure".into()));
        }
        self.lock_calls().push((Instant::now(), call));
        Ok(())
    }
}

impl PlatformInputEmulator for MockInputEmulator {
    fn emit_key_down(&self, key: &str) -> Result<(), EmulationError> {
        let failing = self.failing_keys.lock().unwrap_or_else(|p| p.into_inner());
        if failing.iter().any(|k| k == key) {
            return Err(EmulationError::Platform(format!("mock failure for key {key:?}")));
        }
        drop(failing);
        self.record(InputCall::KeyDown(key.to_string()))
    }

    fn emit_key_up(&self, key: &str) -> Result<(), EmulationError> {
        self.record(InputCall::KeyUp(key.to_string()))
    }

    fn emit_mouse_button(&self, button: MouseButton, pressed: bool) -> Result<(), EmulationError> {
        self.record(InputCall::MouseButton(button, pressed))
    }

    fn emit_mouse_scroll(&self, clicks: i32) -> Result<(), EmulationError> {
        self.record(InputCall::Scroll(clicks))
    }

    /// Records the move and updates the reported cursor position.
    fn emit_mouse_move(&self, x: i32, y: i32) -> Result<(), EmulationError> {
        if self.fail_moves.load(Ordering::SeqCst) {
            return Err(EmulationError::Platform("mock move failure".into()));
        }
        self.record(InputCall::MouseMove(x, y))?;
        self.set_cursor(Point::new(x, y));
        Ok(())
    }

    fn cursor_position(&self) -> Result<Point, EmulationError> {
        if self.should_fail.load(Ordering::SeqCst) || self.fail_cursor.load(Ordering::SeqCst) {
            return Err(EmulationError::Platform("mock failure".into()));
        }
        Ok(*self.cursor.lock().unwrap_or_else(|p| p.into_inner()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_calls_in_order() {
        // Arrange
        let em = MockInputEmulator::new();

        // Act
        em.emit_key_tap("a").unwrap();
        em.emit_mouse_scroll(-2).unwrap();

        // Assert
        assert_eq!(
            em.calls(),
            vec![
                InputCall::KeyDown("a".into()),
                InputCall::KeyUp("a".into()),
                InputCall::Scroll(-2)
            ]
        );
    }

    #[test]
    fn test_should_fail_returns_platform_error_and_records_nothing() {
        let em = MockInputEmulator::new();
        em.set_should_fail(true);

        assert!(matches!(em.emit_key_down("a"), Err(EmulationError::Platform(_))));
        assert!(em.cursor_position().is_err());
        assert!(em.calls().is_empty());
    }

    #[test]
    fn test_mouse_move_updates_cursor() {
        let em = MockInputEmulator::new();

        em.emit_mouse_move(-50, 75).unwrap();

        assert_eq!(em.cursor_position().unwrap(), Point::new(-50, 75));
    }

    #[test]
    fn test_fail_key_only_affects_named_key() {
        let em = MockInputEmulator::new();
        em.fail_key("f13");

        assert!(em.emit_key_down("f13").is_err());
        assert!(em.emit_key_down("a").is_ok());
        assert_eq!(em.calls(), vec![InputCall::KeyDown("a".into())]);
    }

    #[test]
    fn test_fail_moves_keeps_cursor_in_place() {
        let em = MockInputEmulator::new();
        em.set_cursor(Point::new(3, 4));
        em.set_fail_moves(true);

        assert!(em.emit_mouse_move(10, 10).is_err());
        assert_eq!(em.cursor_position().unwrap(), Point::new(3, 4));
        assert!(em.calls().is_empty());
    }
}

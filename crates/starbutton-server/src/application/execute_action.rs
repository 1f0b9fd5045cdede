//! ActionExecutor: replays one decoded [`Action`] as synthetic OS input.
//!
//! Runs on a worker pool thread.  Failures never cross the
//! [`ActionExecutor::run`] boundary; they are logged with the packet id so a
//! bad macro cannot take a worker down.
//!
//! # Modifier handling
//!
//! Modifiers are pressed in payload order before the primary action and
//! released in reverse order afterwards by a [`ModifierGuard`].  Because the
//! release happens in `Drop`, it also runs when the primary action returns
//! early with an error or panics.  A modifier whose key-down failed is never
//! released, so a half-failed chord cannot leave a stray key-up behind.

use std::sync::Arc;
use std::time::Instant;

use starbutton_core::{
    protocol::{MouseButton, ScrollDirection},
    Action, KeyAction, PacketId, PointerAction, PressKind, ScrollAction,
};
use tracing::{debug, warn};

use super::emulate_input::{EmulationError, PlatformInputEmulator};
use super::events::{EventSink, LatencySample, ServerEvent};

/// Failures while replaying an action.
pub type ExecutionError = EmulationError;

/// Per-request data threaded from the receive loop to the executor.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub packet_id: Option<PacketId>,
    /// Monotonic time at which the datagram was received.
    pub received_at: Instant,
}

pub struct ActionExecutor {
    emulator: Arc<dyn PlatformInputEmulator>,
    events: EventSink,
}

impl ActionExecutor {
    pub fn new(emulator: Arc<dyn PlatformInputEmulator>, events: EventSink) -> Self {
        Self { emulator, events }
    }

    /// Executes `action`, logging any failure.
    pub fn run(&self, action: &Action, ctx: &RequestContext) {
        let result = match action {
            Action::Key(key) => self.run_key(key, ctx),
            Action::Pointer(pointer) => self.run_pointer(pointer, ctx),
            Action::Scroll(scroll) => self.run_scroll(scroll, ctx),
        };
        match result {
            Ok(()) => debug!(packet_id = ?ctx.packet_id, kind = action.kind(), "action executed"),
            Err(e) => warn!(packet_id = ?ctx.packet_id, kind = action.kind(), "action failed: {e}"),
        }
    }

    fn run_key(&self, action: &KeyAction, ctx: &RequestContext) -> Result<(), ExecutionError> {
        if action.key.is_empty() {
            return Err(EmulationError::EmptyKey);
        }
        // A whitespace-only name such as " " names the whitespace key itself.
        let key = match action.key.trim() {
            "" => action.key.as_str(),
            trimmed => trimmed,
        };

        let _modifiers = ModifierGuard::press(self.emulator.as_ref(), &action.modifiers);
        self.record_latency(ctx, "key_event");
        match action.press_type.kind() {
            PressKind::Tap => self.emulator.emit_key_tap(key),
            PressKind::Hold(duration) => {
                self.emulator.emit_key_down(key)?;
                std::thread::sleep(duration);
                self.emulator.emit_key_up(key)
            }
        }
    }

    fn run_pointer(
        &self,
        action: &PointerAction,
        ctx: &RequestContext,
    ) -> Result<(), ExecutionError> {
        let button = MouseButton::from_wire(&action.button)
            .ok_or_else(|| EmulationError::UnknownButton(action.button.clone()))?;

        let _modifiers = ModifierGuard::press(self.emulator.as_ref(), &action.modifiers);
        self.record_latency(ctx, "mouse_event");
        match action.press_type.kind() {
            PressKind::Tap => self.emulator.emit_mouse_click(button),
            PressKind::Hold(duration) => {
                self.emulator.emit_mouse_button(button, true)?;
                std::thread::sleep(duration);
                self.emulator.emit_mouse_button(button, false)
            }
        }
    }

    fn run_scroll(&self, action: &ScrollAction, ctx: &RequestContext) -> Result<(), ExecutionError> {
        let direction = ScrollDirection::from_wire(&action.direction)
            .ok_or_else(|| EmulationError::UnknownScrollDirection(action.direction.clone()))?;

        let _modifiers = ModifierGuard::press(self.emulator.as_ref(), &action.modifiers);
        self.record_latency(ctx, "mouse_scroll");
        self.emulator.emit_mouse_scroll(direction.signed_clicks(action.clicks))
    }

    fn record_latency(&self, ctx: &RequestContext, kind: &'static str) {
        let latency = ctx.received_at.elapsed();
        tracing::info!(
            target: "starbutton::latency",
            packet_id = ?ctx.packet_id,
            kind,
            latency_ns = latency.as_nanos() as u64,
            "latency sample"
        );
        self.events.emit(ServerEvent::Latency(LatencySample {
            packet_id: ctx.packet_id.clone(),
            kind,
            latency,
        }));
    }
}

/// Holds modifier keys down for its lifetime.
struct ModifierGuard<'a> {
    emulator: &'a dyn PlatformInputEmulator,
    pressed: Vec<&'a str>,
}

impl<'a> ModifierGuard<'a> {
    fn press(emulator: &'a dyn PlatformInputEmulator, modifiers: &'a [String]) -> Self {
        let mut pressed = Vec::with_capacity(modifiers.len());
        for modifier in modifiers.iter().map(|m| m.trim()).filter(|m| !m.is_empty()) {
            match emulator.emit_key_down(modifier) {
                Ok(()) => pressed.push(modifier),
                Err(e) => warn!("could not press modifier {modifier:?}: {e}"),
            }
        }
        Self { emulator, pressed }
    }
}

impl Drop for ModifierGuard<'_> {
    fn drop(&mut self) {
        for modifier in self.pressed.iter().rev() {
            if let Err(e) = self.emulator.emit_key_up(modifier) {
                warn!("could not release modifier {modifier:?}: {e}");
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

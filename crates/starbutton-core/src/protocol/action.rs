//! The macro action model carried inside `MACRO_COMMAND` payloads.
//!
//! ```text
//! {"type":"key_event","key":"a","modifiers":["shift"],"pressType":{"type":"tap"}}
//! {"type":"mouse_event","button":"LEFT","pressType":{"type":"hold","durationMs":250}}
//! {"type":"mouse_scroll","direction":"DOWN","clicks":3}
//! ```
//!
//! Button and direction names are kept as strings here.  Resolving them is
//! the executor's job, so an unknown name is a per-action error rather than a
//! decode failure of the whole packet.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

/// One decoded keyboard, pointer button, or scroll instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Action {
    #[serde(rename = "key_event")]
    Key(KeyAction),
    #[serde(rename = "mouse_event")]
    Pointer(PointerAction),
    #[serde(rename = "mouse_scroll")]
    Scroll(ScrollAction),
}

impl Action {
    /// Short label used in logs and latency samples.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Key(_) => "key_event",
            Self::Pointer(_) => "mouse_event",
            Self::Scroll(_) => "mouse_scroll",
        }
    }

    /// Modifier key names held for the duration of the action.
    pub fn modifiers(&self) -> &[String] {
        match self {
            Self::Key(a) => &a.modifiers,
            Self::Pointer(a) => &a.modifiers,
            Self::Scroll(a) => &a.modifiers,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyAction {
    pub key: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub modifiers: Vec<String>,
    #[serde(rename = "pressType", default, deserialize_with = "null_as_default")]
    pub press_type: PressType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointerAction {
    pub button: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub modifiers: Vec<String>,
    #[serde(rename = "pressType", default, deserialize_with = "null_as_default")]
    pub press_type: PressType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollAction {
    pub direction: String,
    #[serde(default = "default_clicks", alias = "clickCount")]
    pub clicks: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub modifiers: Vec<String>,
}

fn default_clicks() -> u32 {
    1
}

/// How a key or button is pressed, as sent on the wire.
///
/// `mode` is kept as the raw string; [`PressType::kind`] interprets it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressType {
    #[serde(rename = "type", default = "default_press_mode")]
    pub mode: String,
    #[serde(rename = "durationMs", default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,
}

fn default_press_mode() -> String {
    "tap".to_string()
}

impl Default for PressType {
    fn default() -> Self {
        Self::tap()
    }
}

impl PressType {
    pub fn tap() -> Self {
        Self {
            mode: default_press_mode(),
            duration_ms: None,
        }
    }

    pub fn hold(duration_ms: f64) -> Self {
        Self {
            mode: "hold".to_string(),
            duration_ms: Some(duration_ms),
        }
    }

    /// Returns the effective press kind.
    ///
    /// Only `hold` with a finite, strictly positive `durationMs` that fits
    /// in a [`Duration`] holds; every other combination is a tap.
    pub fn kind(&self) -> PressKind {
        match self.duration_ms {
            Some(ms) if self.mode == "hold" && ms.is_finite() && ms > 0.0 => {
                Duration::try_from_secs_f64(ms / 1000.0).map_or(PressKind::Tap, PressKind::Hold)
            }
            _ => PressKind::Tap,
        }
    }
}

/// The effective press behaviour after validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressKind {
    Tap,
    Hold(Duration),
}

/// Pointer buttons the executor can press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
}

impl MouseButton {
    /// Parses `LEFT`, `RIGHT`, or `MIDDLE` (case-insensitive).
    pub fn from_wire(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "LEFT" => Some(Self::Left),
            "RIGHT" => Some(Self::Right),
            "MIDDLE" => Some(Self::Middle),
            _ => None,
        }
    }
}

/// Scroll wheel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

impl ScrollDirection {
    /// Parses `UP` or `DOWN` (case-insensitive).
    pub fn from_wire(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "UP" => Some(Self::Up),
            "DOWN" => Some(Self::Down),
            _ => None,
        }
    }

    /// Wheel clicks with sign: positive scrolls up (away from the user).
    pub fn signed_clicks(self, clicks: u32) -> i32 {
        let magnitude = i32::try_from(clicks).unwrap_or(i32::MAX);
        match self {
            Self::Up => magnitude,
            Self::Down => -magnitude,
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Action {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_key_event_with_defaults() {
        // Act
        let action = parse(r#"{"type":"key_event","key":"enter"}"#);

        // Assert
        let Action::Key(key) = action else {
            panic!("expected key action");
        };
        assert_eq!(key.key, "enter");
        assert!(key.modifiers.is_empty());
        assert_eq!(key.press_type.kind(), PressKind::Tap);
    }

    #[test]
    fn test_null_press_type_and_modifiers_default() {
        let action = parse(r#"{"type":"key_event","key":"x","modifiers":null,"pressType":null}"#);
        assert!(action.modifiers().is_empty());
        let Action::Key(key) = action else {
            panic!("expected key action");
        };
        assert_eq!(key.press_type, PressType::tap());
    }

    #[test]
    fn test_mouse_event_hold_kind() {
        let action = parse(
            r#"{"type":"mouse_event","button":"RIGHT","pressType":{"type":"hold","durationMs":250}}"#,
        );
        let Action::Pointer(pointer) = action else {
            panic!("expected pointer action");
        };
        assert_eq!(pointer.press_type.kind(), PressKind::Hold(Duration::from_millis(250)));
    }

    #[test]
    fn test_hold_with_non_positive_duration_is_tap() {
        assert_eq!(PressType::hold(0.0).kind(), PressKind::Tap);
        assert_eq!(PressType::hold(-5.0).kind(), PressKind::Tap);
        assert_eq!(PressType::hold(f64::NAN).kind(), PressKind::Tap);
    }

    #[test]
    fn test_overflowing_hold_duration_is_tap() {
        // Arrange
        let press: PressType =
            serde_json::from_str(r#"{"type":"hold","durationMs":1e300}"#).unwrap();

        // Act
        let kind = press.kind();

        // Assert
        assert_eq!(kind, PressKind::Tap);
    }

    #[test]
    fn test_hold_without_duration_is_tap() {
        let press: PressType = serde_json::from_str(r#"{"type":"hold"}"#).unwrap();
        assert_eq!(press.kind(), PressKind::Tap);
    }

    #[test]
    fn test_unknown_press_mode_is_tap() {
        let press: PressType =
            serde_json::from_str(r#"{"type":"double","durationMs":100}"#).unwrap();
        assert_eq!(press.kind(), PressKind::Tap);
    }

    #[test]
    fn test_fractional_hold_duration() {
        assert_eq!(
            PressType::hold(1.5).kind(),
            PressKind::Hold(Duration::from_micros(1500))
        );
    }

    #[test]
    fn test_scroll_defaults_to_one_click() {
        let action = parse(r#"{"type":"mouse_scroll","direction":"UP"}"#);
        let Action::Scroll(scroll) = action else {
            panic!("expected scroll action");
        };
        assert_eq!(scroll.clicks, 1);
    }

    #[test]
    fn test_scroll_accepts_click_count_alias() {
        let action = parse(r#"{"type":"mouse_scroll","direction":"DOWN","clickCount":4}"#);
        let Action::Scroll(scroll) = action else {
            panic!("expected scroll action");
        };
        assert_eq!(scroll.clicks, 4);
    }

    #[test]
    fn test_unknown_action_type_fails_to_decode() {
        let result = serde_json::from_str::<Action>(r#"{"type":"joystick","axis":1}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_button_name_still_decodes() {
        let action = parse(r#"{"type":"mouse_event","button":"X1"}"#);
        let Action::Pointer(pointer) = action else {
            panic!("expected pointer action");
        };
        assert_eq!(MouseButton::from_wire(&pointer.button), None);
    }

    #[test]
    fn test_mouse_button_from_wire_is_case_insensitive() {
        assert_eq!(MouseButton::from_wire("left"), Some(MouseButton::Left));
        assert_eq!(MouseButton::from_wire("Middle"), Some(MouseButton::Middle));
        assert_eq!(MouseButton::from_wire("RIGHT"), Some(MouseButton::Right));
    }

    #[test]
    fn test_scroll_direction_signed_clicks() {
        assert_eq!(ScrollDirection::Up.signed_clicks(3), 3);
        assert_eq!(ScrollDirection::Down.signed_clicks(3), -3);
        assert_eq!(ScrollDirection::from_wire("sideways"), None);
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(parse(r#"{"type":"key_event","key":"a"}"#).kind(), "key_event");
        assert_eq!(parse(r#"{"type":"mouse_scroll","direction":"UP"}"#).kind(), "mouse_scroll");
    }
}

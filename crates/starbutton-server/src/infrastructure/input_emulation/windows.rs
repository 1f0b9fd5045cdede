//! Windows input emulation via the SendInput API.
//!
//! Key names are resolved to Virtual Key codes and sent as hardware scan
//! codes, which games reading raw input (the main use of the button box)
//! accept where plain VK events are ignored.  Mouse coordinates are
//! normalized to the virtual desktop range [0, 65535].

#![cfg(target_os = "windows")]

use starbutton_core::{keymap::KeyMapper, protocol::MouseButton, Point};
use windows::Win32::Foundation::POINT;
use windows::Win32::UI::Input::KeyboardAndMouse::{
    MapVirtualKeyW, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT,
    KEYBD_EVENT_FLAGS, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE,
    MAPVK_VK_TO_VSC, MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP,
    MOUSEEVENTF_MIDDLEDOWN, MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN,
    MOUSEEVENTF_RIGHTUP, MOUSEEVENTF_VIRTUALDESK, MOUSEEVENTF_WHEEL, MOUSEINPUT,
    MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
};
use windows::Win32::UI::WindowsAndMessaging::{
    GetCursorPos, GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
    SM_YVIRTUALSCREEN, WHEEL_DELTA,
};

use crate::application::emulate_input::{EmulationError, PlatformInputEmulator};

/// Windows implementation of [`PlatformInputEmulator`] using SendInput.
pub struct WindowsInputEmulator;

impl WindowsInputEmulator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsInputEmulator {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformInputEmulator for WindowsInputEmulator {
    fn emit_key_down(&self, key: &str) -> Result<(), EmulationError> {
        send_key(resolve_key(key)?, false)
    }

    fn emit_key_up(&self, key: &str) -> Result<(), EmulationError> {
        send_key(resolve_key(key)?, true)
    }

    fn emit_mouse_button(&self, button: MouseButton, pressed: bool) -> Result<(), EmulationError> {
        let flags = match (button, pressed) {
            (MouseButton::Left, true) => MOUSEEVENTF_LEFTDOWN,
            (MouseButton::Left, false) => MOUSEEVENTF_LEFTUP,
            (MouseButton::Right, true) => MOUSEEVENTF_RIGHTDOWN,
            (MouseButton::Right, false) => MOUSEEVENTF_RIGHTUP,
            (MouseButton::Middle, true) => MOUSEEVENTF_MIDDLEDOWN,
            (MouseButton::Middle, false) => MOUSEEVENTF_MIDDLEUP,
        };
        send_mouse(0, 0, 0, flags)
    }

    fn emit_mouse_scroll(&self, clicks: i32) -> Result<(), EmulationError> {
        let delta = clicks.saturating_mul(WHEEL_DELTA as i32);
        // mouseData carries the signed delta reinterpreted as u32.
        send_mouse(0, 0, delta as u32, MOUSEEVENTF_WHEEL)
    }

    fn emit_mouse_move(&self, x: i32, y: i32) -> Result<(), EmulationError> {
        let (norm_x, norm_y) = normalize_coords(x, y, virtual_screen());
        send_mouse(
            norm_x,
            norm_y,
            0,
            MOUSEEVENTF_MOVE | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK,
        )
    }

    fn cursor_position(&self) -> Result<Point, EmulationError> {
        let mut point = POINT::default();
        // SAFETY: `point` is a valid, writable POINT on the stack.
        unsafe { GetCursorPos(&mut point) }
            .map_err(|e| EmulationError::Platform(format!("GetCursorPos failed: {e}")))?;
        Ok(Point::new(point.x, point.y))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn resolve_key(key: &str) -> Result<u8, EmulationError> {
    KeyMapper::name_to_windows_vk(key).ok_or_else(|| EmulationError::UnknownKey(key.to_string()))
}

/// Virtual desktop origin and size, covering every monitor.
#[derive(Debug, Clone, Copy)]
struct VirtualScreen {
    x: i32,
    y: i32,
    width: i32,
    height: i32,
}

fn virtual_screen() -> VirtualScreen {
    // SAFETY: GetSystemMetrics is always safe to call
    unsafe {
        VirtualScreen {
            x: GetSystemMetrics(SM_XVIRTUALSCREEN),
            y: GetSystemMetrics(SM_YVIRTUALSCREEN),
            width: GetSystemMetrics(SM_CXVIRTUALSCREEN),
            height: GetSystemMetrics(SM_CYVIRTUALSCREEN),
        }
    }
}

/// Maps desktop pixel coordinates to the [0, 65535] range used by
/// `MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK`.
fn normalize_coords(x: i32, y: i32, screen: VirtualScreen) -> (i32, i32) {
    fn axis(value: i32, origin: i32, extent: i32) -> i32 {
        if extent <= 1 {
            return 0;
        }
        let offset = i64::from(value) - i64::from(origin);
        (offset * 65535 / i64::from(extent - 1)).clamp(0, 65535) as i32
    }
    (
        axis(x, screen.x, screen.width),
        axis(y, screen.y, screen.height),
    )
}

fn send_key(vk: u8, key_up: bool) -> Result<(), EmulationError> {
    // SAFETY: MapVirtualKeyW has no preconditions.
    let scan = unsafe { MapVirtualKeyW(u32::from(vk), MAPVK_VK_TO_VSC) } as u16;

    let mut flags = if scan != 0 {
        KEYEVENTF_SCANCODE
    } else {
        KEYBD_EVENT_FLAGS(0)
    };
    if key_up {
        flags |= KEYEVENTF_KEYUP;
    }
    if KeyMapper::is_extended_windows_vk(vk) {
        flags |= KEYEVENTF_EXTENDEDKEY;
    }

    let input = INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(u16::from(vk)),
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    send(input)
}

fn send_mouse(
    dx: i32,
    dy: i32,
    mouse_data: u32,
    flags: MOUSE_EVENT_FLAGS,
) -> Result<(), EmulationError> {
    let input = INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: mouse_data,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    };
    send(input)
}

fn send(input: INPUT) -> Result<(), EmulationError> {
    // SAFETY: input is a valid INPUT structure on the stack
    let sent = unsafe { SendInput(&[input], std::mem::size_of::<INPUT>() as i32) };
    if sent == 1 {
        Ok(())
    } else {
        Err(EmulationError::Platform(format!(
            "SendInput failed: {}",
            windows::core::Error::from_win32()
        )))
    }
}

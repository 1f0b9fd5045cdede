//! Wire key name to Windows Virtual Key (VK) code table.
//!
//! Reference: Windows Virtual-Key Codes (winuser.h).  Names follow the key
//! list used by the phone app, plus a few common aliases.
//!
//! # What is a Windows Virtual Key (VK) code? (for beginners)
//!
//! Windows assigns each keyboard key a number called a "Virtual Key code",
//! defined in `<winuser.h>` as `VK_*` (e.g. `VK_RETURN = 0x0D`).  They name
//! *logical* keys rather than physical scan codes, so `VK_A = 0x41` means the
//! letter A whatever the keyboard layout.

/// Looks up an already-normalised (lowercase, trimmed) key name.
pub fn name_to_vk(name: &str) -> Option<u8> {
    // Single ASCII letters and digits share their VK code with the uppercase
    // ASCII value.
    if let [c] = name.as_bytes() {
        match c {
            b'a'..=b'z' => return Some(c.to_ascii_uppercase()),
            b'0'..=b'9' => return Some(*c),
            _ => {}
        }
    }

    if let Some(n) = name.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        // VK_F1 = 0x70 … VK_F24 = 0x87
        return (1..=24).contains(&n).then(|| 0x6F + n);
    }

    if let Some(n) = name
        .strip_prefix("numpad")
        .or_else(|| name.strip_prefix("num"))
        .and_then(|n| n.parse::<u8>().ok())
    {
        // VK_NUMPAD0 = 0x60 … VK_NUMPAD9 = 0x69
        return (n <= 9).then(|| 0x60 + n);
    }

    let vk = match name {
        // ── Editing and whitespace ───────────────────────────────────────────
        "backspace" | "\u{8}" => 0x08,
        "tab" | "\t" => 0x09,
        "clear" => 0x0C,
        "enter" | "return" | "\n" | "\r" => 0x0D,
        "space" | " " => 0x20,
        "esc" | "escape" => 0x1B,

        // ── Modifiers ────────────────────────────────────────────────────────
        "shift" => 0x10,
        "ctrl" | "control" => 0x11,
        "alt" | "menu" => 0x12,
        "shiftleft" | "lshift" => 0xA0,
        "shiftright" | "rshift" => 0xA1,
        "ctrlleft" | "lctrl" => 0xA2,
        "ctrlright" | "rctrl" => 0xA3,
        "altleft" | "lalt" => 0xA4,
        "altright" | "ralt" => 0xA5,
        "win" | "winleft" | "super" | "command" | "cmd" => 0x5B,
        "winright" => 0x5C,
        "apps" => 0x5D,

        // ── Locks and system ─────────────────────────────────────────────────
        "pause" => 0x13,
        "capslock" => 0x14,
        "numlock" => 0x90,
        "scrolllock" => 0x91,
        "printscreen" | "prtsc" | "prtscr" | "prntscrn" | "print" => 0x2C,

        // ── Navigation ───────────────────────────────────────────────────────
        "pageup" | "pgup" => 0x21,
        "pagedown" | "pgdn" => 0x22,
        "end" => 0x23,
        "home" => 0x24,
        "left" => 0x25,
        "up" => 0x26,
        "right" => 0x27,
        "down" => 0x28,
        "insert" => 0x2D,
        "delete" | "del" => 0x2E,

        // ── Numpad operators ─────────────────────────────────────────────────
        "multiply" => 0x6A,
        "add" => 0x6B,
        "separator" => 0x6C,
        "subtract" => 0x6D,
        "decimal" => 0x6E,
        "divide" => 0x6F,

        // ── Punctuation (US layout OEM keys) ─────────────────────────────────
        ";" => 0xBA,
        "=" => 0xBB,
        "," => 0xBC,
        "-" => 0xBD,
        "." => 0xBE,
        "/" => 0xBF,
        "`" => 0xC0,
        "[" => 0xDB,
        "\\" => 0xDC,
        "]" => 0xDD,
        "'" => 0xDE,

        // ── Media ────────────────────────────────────────────────────────────
        "volumemute" => 0xAD,
        "volumedown" => 0xAE,
        "volumeup" => 0xAF,
        "nexttrack" => 0xB0,
        "prevtrack" => 0xB1,
        "stop" => 0xB2,
        "playpause" => 0xB3,

        _ => return None,
    };
    Some(vk)
}

/// Keys that live on the extended part of the keyboard and need
/// `KEYEVENTF_EXTENDEDKEY` for `SendInput` to land on the right key.
pub fn is_extended(vk: u8) -> bool {
    matches!(
        vk,
        0x21..=0x28 // page up/down, end, home, arrows
            | 0x2C  // print screen
            | 0x2D  // insert
            | 0x2E  // delete
            | 0x5B..=0x5D // win keys, apps
            | 0x6F  // numpad divide
            | 0x90  // num lock
            | 0xA3  // right ctrl
            | 0xA5  // right alt
            | 0xAD..=0xB3 // media keys
    )
}

//! Key name translation tables.
//!
//! The phone app names keys with lowercase words such
//! as `"a"`, `"enter"`, `"shift"`, `"pagedown"`, `"f5"`, `"num7"`.  The input
//! emulation backends need platform key codes, so every name is resolved
//! through [`KeyMapper`] at the emulation boundary.

pub mod windows_vk;

/// Unified key mapper for wire key names.
pub struct KeyMapper;

impl KeyMapper {
    /// Translates a wire key name to a Windows Virtual Key code.
    ///
    /// Matching ignores ASCII case and surrounding whitespace, except that a
    /// name made only of whitespace (such as `" "`) is looked up verbatim.
    /// Returns `None` for names with no mapping.
    pub fn name_to_windows_vk(name: &str) -> Option<u8> {
        windows_vk::name_to_vk(&normalize_key_name(name))
    }

    /// Returns `true` if `vk` must be sent with the extended-key flag.
    pub fn is_extended_windows_vk(vk: u8) -> bool {
        windows_vk::is_extended(vk)
    }
}

/// Lowercases and trims a key name.  Whitespace-only names are kept as-is.
pub fn normalize_key_name(name: &str) -> String {
    match name.trim() {
        "" => name.to_string(),
        trimmed => trimmed.to_ascii_lowercase(),
    }
}

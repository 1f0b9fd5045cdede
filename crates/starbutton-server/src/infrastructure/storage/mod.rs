//! Storage infrastructure: the server settings file.
//!
//! The `config` sub-module reads `server_settings.toml` from the platform
//! config directory at startup and can write a default one for the user to
//! edit.

pub mod config;

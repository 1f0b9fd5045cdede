//! TOML settings for the dispatch server.
//!
//! Reads and writes [`ServerSettings`] at the platform-appropriate path:
//! - Windows:  `%APPDATA%\StarButtonBoxServer\server_settings.toml`
//! - Linux:    `~/.config/starbuttonbox/server_settings.toml`
//! - macOS:    `~/Library/Application Support/StarButtonBoxServer/server_settings.toml`
//!
//! ```toml
//! log_level = "info"
//!
//! [server]
//! port = 5005
//! mdns_enabled = true
//!
//! [drag]
//! loop_interval_ms = 100
//! ```
//!
//! Every field has a `#[serde(default = "…")]` helper, so a partial file (or
//! none at all) yields working settings.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::drag_loop::DragTimings;
use crate::infrastructure::network::{ServerConfig, MIN_BUFFER_SIZE};

const SETTINGS_FILE_NAME: &str = "server_settings.toml";

/// Error type for settings file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    #[error("I/O error accessing settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Settings schema ───────────────────────────────────────────────────────────

/// Top-level settings stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSettings {
    /// `tracing` level used when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub drag: DragSection,
}

/// UDP server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerSection {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    /// Receive buffer size in bytes; values below 2048 are raised to 2048.
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Number of macro worker threads; clamped to at least one.
    #[serde(default = "default_worker_capacity")]
    pub worker_capacity: usize,
    /// How long shutdown waits for queued macros.
    #[serde(default = "default_drain_timeout_ms")]
    pub drain_timeout_ms: u64,
    /// Receive timeout used to poll the stop flag.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
    /// Advertise the server on the LAN via mDNS.
    #[serde(default = "default_true")]
    pub mdns_enabled: bool,
}

/// Auto drag loop delays, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DragSection {
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_drag_duration_ms")]
    pub drag_duration_ms: u64,
    #[serde(default = "default_post_drag_ms")]
    pub post_drag_ms: u64,
    #[serde(default = "default_loop_interval_ms")]
    pub loop_interval_ms: u64,
    #[serde(default = "default_unset_retry_ms")]
    pub unset_retry_ms: u64,
    #[serde(default = "default_stop_timeout_ms")]
    pub stop_timeout_ms: u64,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_port() -> u16 {
    5005
}
fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_buffer_size() -> usize {
    MIN_BUFFER_SIZE
}
fn default_worker_capacity() -> usize {
    10
}
fn default_drain_timeout_ms() -> u64 {
    5000
}
fn default_read_timeout_ms() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}
fn default_settle_ms() -> u64 {
    50
}
fn default_drag_duration_ms() -> u64 {
    100
}
fn default_post_drag_ms() -> u64 {
    50
}
fn default_loop_interval_ms() -> u64 {
    100
}
fn default_unset_retry_ms() -> u64 {
    1000
}
fn default_stop_timeout_ms() -> u64 {
    2000
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            server: ServerSection::default(),
            drag: DragSection::default(),
        }
    }
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            buffer_size: default_buffer_size(),
            worker_capacity: default_worker_capacity(),
            drain_timeout_ms: default_drain_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            mdns_enabled: default_true(),
        }
    }
}

impl Default for DragSection {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            drag_duration_ms: default_drag_duration_ms(),
            post_drag_ms: default_post_drag_ms(),
            loop_interval_ms: default_loop_interval_ms(),
            unset_retry_ms: default_unset_retry_ms(),
            stop_timeout_ms: default_stop_timeout_ms(),
        }
    }
}

// ── Conversions ───────────────────────────────────────────────────────────────

impl ServerSection {
    /// Builds the runtime server configuration, applying the lower bounds.
    pub fn to_server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_address: self.bind_address,
            port: self.port,
            buffer_size: self.buffer_size.max(MIN_BUFFER_SIZE),
            worker_capacity: self.worker_capacity.max(1),
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
            // A zero read timeout would make the socket block forever.
            read_timeout: Duration::from_millis(self.read_timeout_ms.max(1)),
        }
    }
}

impl DragSection {
    pub fn to_timings(&self) -> DragTimings {
        DragTimings {
            settle: Duration::from_millis(self.settle_ms),
            drag_duration: Duration::from_millis(self.drag_duration_ms),
            post_drag: Duration::from_millis(self.post_drag_ms),
            loop_interval: Duration::from_millis(self.loop_interval_ms),
            unset_retry: Duration::from_millis(self.unset_retry_ms),
            stop_timeout: Duration::from_millis(self.stop_timeout_ms),
        }
    }
}

// ── Settings repository ───────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the settings file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the base directory
/// cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to `server_settings.toml`.
pub fn settings_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join(SETTINGS_FILE_NAME))
}

/// Loads settings from the default path, or defaults if the file is absent.
pub fn load_settings() -> Result<ServerSettings, ConfigError> {
    load_settings_from(&settings_file_path()?)
}

/// Loads settings from `path`, returning `ServerSettings::default()` if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_settings_from(path: &Path) -> Result<ServerSettings, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ServerSettings::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `settings` to the default path and returns that path.
pub fn save_settings(settings: &ServerSettings) -> Result<PathBuf, ConfigError> {
    let path = settings_file_path()?;
    save_settings_to(settings, &path)?;
    Ok(path)
}

/// Writes `settings` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_settings_to(settings: &ServerSettings, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(settings)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("StarButtonBoxServer"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("starbuttonbox"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("StarButtonBoxServer")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

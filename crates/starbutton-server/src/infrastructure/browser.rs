//! Opens URLs in the user's default browser.
//!
//! Used by `TRIGGER_IMPORT_BROWSER`: the phone serves a layout import page
//! and asks the PC to open it.

use std::process::{Command, Stdio};

use tracing::{debug, warn};

use crate::application::ports::BrowserTrigger;
use crate::application::task::spawn_named;

/// Launches the platform URL opener on a short-lived named thread.
#[derive(Debug, Default)]
pub struct SystemBrowser;

impl SystemBrowser {
    pub fn new() -> Self {
        Self
    }
}

impl BrowserTrigger for SystemBrowser {
    fn open(&self, url: &str) {
        if !is_web_url(url) {
            warn!("refusing to open non-http URL {url:?}");
            return;
        }

        let url = url.to_string();
        let spawned = spawn_named("starbutton-browser", move || {
            let mut command = opener_command(&url);
            match command.stdin(Stdio::null()).stdout(Stdio::null()).status() {
                Ok(status) if status.success() => debug!("opened {url} in browser"),
                Ok(status) => warn!("browser opener exited with {status} for {url}"),
                Err(e) => warn!("failed to launch browser for {url}: {e}"),
            }
        });
        if let Err(e) = spawned {
            warn!("failed to spawn browser thread: {e}");
        }
    }
}

/// Only plain web URLs are handed to the shell opener.
fn is_web_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://"))
        && !url.chars().any(|c| c.is_control() || c == '"')
}

fn opener_command(url: &str) -> Command {
    #[cfg(target_os = "windows")]
    {
        // The empty string is the window title `start` expects first.
        let mut command = Command::new("cmd");
        command.args(["/C", "start", "", url]);
        command
    }

    #[cfg(target_os = "macos")]
    {
        let mut command = Command::new("open");
        command.arg(url);
        command
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        let mut command = Command::new("xdg-open");
        command.arg(url);
        command
    }
}

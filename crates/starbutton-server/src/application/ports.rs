//! Collaborator ports implemented by the infrastructure layer.

use thiserror::Error;

/// Opens a URL in the user's default browser.
///
/// Fire-and-forget: implementations must return promptly and report failures
/// through logging only.
pub trait BrowserTrigger: Send + Sync {
    fn open(&self, url: &str);
}

#[derive(Debug, Error)]
pub enum AdvertiseError {
    #[error("service advertisement failed: {0}")]
    Backend(String),
    #[error("could not determine host name")]
    NoHostName,
}

/// Announces the server on the LAN so the phone app can find it.
#[cfg_attr(test, mockall::automock)]
pub trait ServiceAdvertiser: Send + Sync {
    /// `false` for the placeholder used when discovery is switched off.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Starts advertising the dispatch port.
    fn register(&self, port: u16) -> Result<(), AdvertiseError>;

    /// Withdraws the advertisement.  Calling it when nothing is registered is
    /// a no-op.
    fn unregister(&self);
}

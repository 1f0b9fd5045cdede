//! LAN service advertisement over mDNS / DNS-SD.
//!
//! The phone app browses for `_starbuttonbox._udp.local.` and connects to the
//! first instance it finds, so the user never has to type an IP address.
//! Registration is best effort: if multicast is blocked the server keeps
//! running and the user can still enter the address by hand.

use std::sync::Mutex;

use mdns_sd::{ServiceDaemon, ServiceInfo};
use tracing::{debug, info, warn};

use crate::application::ports::{AdvertiseError, ServiceAdvertiser};

/// DNS-SD service type browsed for by the phone app.
pub const SERVICE_TYPE: &str = "_starbuttonbox._udp.local.";

/// Advertiser used when discovery is disabled in the settings.
pub struct NoopAdvertiser;

impl ServiceAdvertiser for NoopAdvertiser {
    fn is_enabled(&self) -> bool {
        false
    }

    fn register(&self, _port: u16) -> Result<(), AdvertiseError> {
        Ok(())
    }

    fn unregister(&self) {}
}

struct Registration {
    daemon: ServiceDaemon,
    fullname: String,
}

/// Advertises the server through the `mdns-sd` responder.
#[derive(Default)]
pub struct MdnsAdvertiser {
    registration: Mutex<Option<Registration>>,
}

impl MdnsAdvertiser {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ServiceAdvertiser for MdnsAdvertiser {
    fn register(&self, port: u16) -> Result<(), AdvertiseError> {
        let mut registration = self.registration.lock().unwrap_or_else(|p| p.into_inner());
        if registration.is_some() {
            warn!("mDNS service already registered");
            return Ok(());
        }

        let host = short_hostname().ok_or(AdvertiseError::NoHostName)?;
        let instance = instance_name(&host);
        let host_fqdn = format!("{host}.local.");
        let properties = [("version", env!("CARGO_PKG_VERSION"))];

        let daemon = ServiceDaemon::new().map_err(|e| AdvertiseError::Backend(e.to_string()))?;
        let service =
            ServiceInfo::new(SERVICE_TYPE, &instance, &host_fqdn, "", port, &properties[..])
                .map_err(|e| AdvertiseError::Backend(e.to_string()))?
                .enable_addr_auto();
        let fullname = service.get_fullname().to_string();

        if let Err(e) = daemon.register(service) {
            let _ = daemon.shutdown();
            return Err(AdvertiseError::Backend(e.to_string()));
        }

        info!("mDNS service registered: {fullname} on port {port}");
        *registration = Some(Registration { daemon, fullname });
        Ok(())
    }

    fn unregister(&self) {
        let Some(Registration { daemon, fullname }) = self
            .registration
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .take()
        else {
            return;
        };

        if let Err(e) = daemon.unregister(&fullname) {
            warn!("failed to unregister mDNS service {fullname}: {e}");
        }
        if let Err(e) = daemon.shutdown() {
            debug!("mDNS daemon shutdown: {e}");
        }
        info!("mDNS service unregistered");
    }
}

impl Drop for MdnsAdvertiser {
    fn drop(&mut self) {
        self.unregister();
    }
}

/// The DNS-SD instance name shown in the phone app's server list.
fn instance_name(host: &str) -> String {
    format!("{host} StarButtonBox Server")
}

/// Returns the machine's hostname without any domain suffix.
///
/// Tries `COMPUTERNAME` (Windows) first, then `HOSTNAME` (Unix), then
/// `/etc/hostname`.
fn short_hostname() -> Option<String> {
    let raw = std::env::var("COMPUTERNAME")
        .or_else(|_| std::env::var("HOSTNAME"))
        .ok()
        .or_else(|| std::fs::read_to_string("/etc/hostname").ok())
        .unwrap_or_else(|| "StarButtonBoxPC".to_string());
    sanitize_host(&raw)
}

fn sanitize_host(raw: &str) -> Option<String> {
    let label = raw.trim().split('.').next()?.trim();
    (!label.is_empty()).then(|| label.to_string())
}

//! mDNS discovery for cast receivers.
//!
//! Blocking, bounded lookup of a single device by friendly name; runs
//! once at startup before the session is bound.

use std::time::{Duration, Instant};

use mdns_sd::{ServiceDaemon, ServiceEvent};

use crate::models::CastDeviceDescriptor;

const CAST_SERVICE: &str = "_googlecast._tcp.local.";

/// Look up the receiver advertising `device_name` in its `fn` TXT
/// record. Returns `None` when nothing matching resolves before the
/// deadline; the caller decides what to do without a device.
pub fn find_device(device_name: &str, timeout: Duration) -> Option<CastDeviceDescriptor> {
    let daemon = match ServiceDaemon::new() {
        Ok(daemon) => daemon,
        Err(err) => {
            tracing::warn!(error = %err, "mdns: failed to start daemon");
            return None;
        }
    };
    let receiver = match daemon.browse(CAST_SERVICE) {
        Ok(receiver) => receiver,
        Err(err) => {
            tracing::warn!(error = %err, "mdns: browse failed");
            return None;
        }
    };
    tracing::info!(device = device_name, "mdns: browsing for {CAST_SERVICE}");

    let deadline = Instant::now() + timeout;
    let found = loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break None;
        }
        let event = match receiver.recv_timeout(remaining) {
            Ok(event) => event,
            Err(_) => break None,
        };
        let ServiceEvent::ServiceResolved(info) = event else {
            continue;
        };
        let friendly_name = info
            .get_property("fn")
            .map(|p| p.val_str().to_string())
            .unwrap_or_default();
        tracing::debug!(
            fullname = %info.get_fullname(),
            friendly_name = %friendly_name,
            "mdns: cast device resolved"
        );
        if friendly_name != device_name {
            continue;
        }
        let addr = info.get_addresses().iter().find_map(|ip| match ip {
            mdns_sd::ScopedIp::V4(v4) => Some(*v4.addr()),
            _ => None,
        });
        let Some(ip) = addr else {
            tracing::warn!(fullname = %info.get_fullname(), "mdns: resolved without IPv4");
            continue;
        };
        break Some(CastDeviceDescriptor {
            name: friendly_name,
            host: ip.to_string(),
            port: info.get_port(),
        });
    };
    let _ = daemon.shutdown();

    match &found {
        Some(device) => {
            tracing::info!(device = %device.name, host = %device.host, port = device.port, "mdns: cast device found");
        }
        None => {
            tracing::warn!(device = device_name, "mdns: cast device not found before deadline");
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    // Network-dependent lookups are not exercised here; the bounded
    // deadline is, since a zero timeout must return promptly.
    #[test]
    fn zero_timeout_returns_none() {
        assert_eq!(find_device("No Such Device", Duration::ZERO), None);
    }
}

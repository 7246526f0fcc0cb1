//! Local host resolution.
//!
//! Used for the default bind hostname and for the `use_local_hostname`
//! toggle. Resolution never fails: loopback values are returned when the
//! host cannot be determined.

use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// Host name advertised by the transport layer in place of local resolution.
///
/// Shared by every endpoint started from the same agent context; publishing
/// a new value is visible to running connectors immediately.
#[derive(Debug, Clone)]
pub struct AddressOverride(Arc<ArcSwapOption<String>>);

impl Default for AddressOverride {
    fn default() -> Self {
        Self(Arc::new(ArcSwapOption::empty()))
    }
}

impl AddressOverride {
    pub fn publish(&self, host: &str) {
        self.0.store(Some(Arc::new(host.to_string())));
    }

    pub fn clear(&self) {
        self.0.store(None);
    }

    pub fn get(&self) -> Option<String> {
        self.0.load_full().map(|host| host.as_ref().clone())
    }

    /// Host to advertise: the override when published, else the local address.
    pub fn advertised_host(&self) -> String {
        self.get().unwrap_or_else(|| local_address().to_string())
    }
}

/// Address of the interface carrying the default route, or loopback.
///
/// Connecting a UDP socket sends no packet; it only selects a route.
pub fn local_address() -> IpAddr {
    UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
        .and_then(|socket| {
            socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9))?;
            socket.local_addr()
        })
        .map(|addr| addr.ip())
        .ok()
        .filter(|ip| !ip.is_unspecified())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Name of the local machine, or `localhost`.
pub fn canonical_host_name() -> String {
    system_host_name()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

#[cfg(unix)]
fn system_host_name() -> Option<String> {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .or_else(|_| std::fs::read_to_string("/etc/hostname"))
        .ok()
        .or_else(|| std::env::var("HOSTNAME").ok())
}

#[cfg(not(unix))]
fn system_host_name() -> Option<String> {
    std::env::var("COMPUTERNAME").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn local_address_is_specified() {
        assert!(!local_address().is_unspecified());
    }

    #[test]
    fn override_wins_over_local_address() {
        let address = AddressOverride::default();
        assert_eq!(address.get(), None);
        assert_eq!(address.advertised_host(), local_address().to_string());

        let shared = address.clone();
        address.publish("mgmt.example.net");
        assert_eq!(shared.advertised_host(), "mgmt.example.net");

        shared.clear();
        assert_eq!(address.get(), None);
    }

    #[test]
    fn host_name_not_empty() {
        assert!(!canonical_host_name().is_empty());
    }
}

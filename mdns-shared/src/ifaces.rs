//! Network interface enumeration.
//!
//! Lists every address configured on the host together with the interface
//! it belongs to, so callers can decide which interfaces are eligible for
//! multicast traffic.

use std::net::IpAddr;

use crate::error::Result;

/// One address assigned to a network interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interface {
    name: String,
    index: u32,
    addr: IpAddr,
    up: bool,
    loopback: bool,
    multicast: bool,
}

impl Interface {
    pub fn new(name: impl Into<String>, index: u32, addr: IpAddr) -> Self {
        Self {
            name: name.into(),
            index,
            addr,
            up: true,
            loopback: addr.is_loopback(),
            multicast: true,
        }
    }

    pub fn with_flags(mut self, up: bool, loopback: bool, multicast: bool) -> Self {
        self.up = up;
        self.loopback = loopback;
        self.multicast = multicast;
        self
    }

    /// Interface name, e.g. `eth0`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kernel interface index, as used by `IPV6_MULTICAST_IF` and `IPV6_JOIN_GROUP`.
    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn addr(&self) -> IpAddr {
        self.addr
    }

    pub fn is_up(&self) -> bool {
        self.up
    }

    pub fn is_loopback(&self) -> bool {
        self.loopback
    }

    pub fn supports_multicast(&self) -> bool {
        self.multicast
    }

    /// Up, not loopback and multicast capable.
    pub fn is_multicast_eligible(&self) -> bool {
        self.up && !self.loopback && self.multicast
    }
}

/// Returns every (interface, address) pair configured on the host.
#[cfg(unix)]
pub fn ifaces() -> Result<Vec<Interface>> {
    use nix::ifaddrs::getifaddrs;
    use nix::net::if_::{InterfaceFlags, if_nametoindex};
    use std::net::{SocketAddrV4, SocketAddrV6};

    let mut interfaces = vec![];
    let addrs = getifaddrs().map_err(std::io::Error::from)?;
    for ifaddr in addrs {
        let Some(storage) = ifaddr.address else {
            continue;
        };
        let addr = if let Some(sin) = storage.as_sockaddr_in() {
            IpAddr::V4(*SocketAddrV4::from(*sin).ip())
        } else if let Some(sin6) = storage.as_sockaddr_in6() {
            IpAddr::V6(*SocketAddrV6::from(*sin6).ip())
        } else {
            continue;
        };

        let index = match if_nametoindex(ifaddr.interface_name.as_str()) {
            Ok(index) => index,
            Err(err) => {
                log::debug!("no index for interface {}: {err}", ifaddr.interface_name);
                continue;
            }
        };

        let flags = ifaddr.flags;
        interfaces.push(
            Interface::new(ifaddr.interface_name, index, addr).with_flags(
                flags.contains(InterfaceFlags::IFF_UP),
                flags.contains(InterfaceFlags::IFF_LOOPBACK),
                flags.contains(InterfaceFlags::IFF_MULTICAST),
            ),
        );
    }

    Ok(interfaces)
}

// TODO: enumerate adapters with GetAdaptersAddresses on windows.
#[cfg(not(unix))]
pub fn ifaces() -> Result<Vec<Interface>> {
    Err(crate::error::Error::ErrNoInterface)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[test]
    fn test_loopback_is_not_eligible() {
        let iface = Interface::new("lo", 1, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(iface.is_loopback());
        assert!(!iface.is_multicast_eligible());
    }

    #[test]
    fn test_down_interface_is_not_eligible() {
        let iface = Interface::new("eth0", 2, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 2)))
            .with_flags(false, false, true);
        assert!(!iface.is_multicast_eligible());

        let iface = iface.with_flags(true, false, true);
        assert!(iface.is_multicast_eligible());
    }

    #[cfg(unix)]
    #[test]
    fn test_ifaces_lists_indexed_addresses() {
        let interfaces = ifaces().expect("getifaddrs should succeed");
        for iface in &interfaces {
            assert!(iface.index() > 0, "{} has no index", iface.name());
        }
    }
}

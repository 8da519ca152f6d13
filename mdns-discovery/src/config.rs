//! Configuration for the mDNS discovery engine.
//!
//! ```rust
//! use mdns_discovery::MdnsConfig;
//! use std::time::Duration;
//!
//! let config = MdnsConfig::default()
//!     .with_transaction_timeout(Duration::from_secs(5))
//!     .with_cache_entry_limit(1000);
//! assert_eq!(config.multicast_port, 5353);
//! ```

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

/// The mDNS IPv4 multicast group (224.0.0.251).
pub const MDNS_MULTICAST_IPV4: Ipv4Addr = Ipv4Addr::new(224, 0, 0, 251);

/// The mDNS IPv6 link-local multicast group (ff02::fb).
pub const MDNS_MULTICAST_IPV6: Ipv6Addr = Ipv6Addr::new(0xff02, 0, 0, 0, 0, 0, 0, 0xfb);

/// The standard mDNS port (5353).
pub const MDNS_PORT: u16 = 5353;

/// mDNS IPv4 multicast destination address (224.0.0.251:5353).
///
/// ```rust
/// use mdns_discovery::MDNS_DEST_ADDR;
///
/// assert_eq!(MDNS_DEST_ADDR.to_string(), "224.0.0.251:5353");
/// ```
pub const MDNS_DEST_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(MDNS_MULTICAST_IPV4), MDNS_PORT);

/// Largest datagram mDNS allows (RFC 6762 section 17).
pub const MAX_DATAGRAM_SIZE: usize = 9000;

/// Default lifetime of a transaction that queries the network.
pub(crate) const DEFAULT_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(3);

/// Default maximum number of cached records.
pub(crate) const DEFAULT_CACHE_ENTRY_LIMIT: usize = 500;

/// Points in a record's lifetime, in thousandths of its TTL, at which an
/// actively refreshing listener re-queries the network (85% and 95%).
pub(crate) const REFRESH_PERMILLE: [u64; 2] = [850, 950];

/// Configuration for [`Mdns`](crate::Mdns) and [`MdnsService`](crate::MdnsService).
///
/// # Fields
///
/// - `transaction_timeout`: how long a network transaction waits (default: 3 seconds)
/// - `cache_entry_limit`: records kept before the earliest-expiring are evicted (default: 500)
/// - `multicast_port`: port sockets bind to and queries go to (default: 5353)
/// - `max_datagram_size`: receive buffer size per read (default: 9000)
#[derive(Clone, Debug)]
pub struct MdnsConfig {
    /// How long a transaction with `QUERY_NETWORK` waits for answers before
    /// it reports `Done` or `NoResults`.
    pub transaction_timeout: Duration,

    /// Maximum number of records the cache holds.
    ///
    /// Exceeding it forces an immediate cleanup that evicts the records
    /// closest to expiry.
    pub cache_entry_limit: usize,

    /// UDP port for binding and for the multicast destination.
    ///
    /// Only tests and private deployments change this.
    pub multicast_port: u16,

    /// Size of the buffer each socket reads into.
    pub max_datagram_size: usize,
}

impl Default for MdnsConfig {
    fn default() -> Self {
        Self {
            transaction_timeout: DEFAULT_TRANSACTION_TIMEOUT,
            cache_entry_limit: DEFAULT_CACHE_ENTRY_LIMIT,
            multicast_port: MDNS_PORT,
            max_datagram_size: MAX_DATAGRAM_SIZE,
        }
    }
}

impl MdnsConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_transaction_timeout(mut self, timeout: Duration) -> Self {
        self.transaction_timeout = timeout;
        self
    }

    pub fn with_cache_entry_limit(mut self, limit: usize) -> Self {
        self.cache_entry_limit = limit;
        self
    }

    pub fn with_multicast_port(mut self, port: u16) -> Self {
        self.multicast_port = port;
        self
    }

    pub fn with_max_datagram_size(mut self, size: usize) -> Self {
        self.max_datagram_size = size;
        self
    }

    /// IPv4 multicast destination for the configured port.
    pub fn multicast_dest_v4(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(MDNS_MULTICAST_IPV4), self.multicast_port)
    }

    /// IPv6 multicast destination for the configured port.
    pub fn multicast_dest_v6(&self) -> SocketAddr {
        SocketAddr::new(IpAddr::V6(MDNS_MULTICAST_IPV6), self.multicast_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MdnsConfig::new();
        assert_eq!(config.transaction_timeout, Duration::from_secs(3));
        assert_eq!(config.cache_entry_limit, 500);
        assert_eq!(config.multicast_port, MDNS_PORT);
        assert_eq!(config.max_datagram_size, 9000);
        assert_eq!(config.multicast_dest_v4(), MDNS_DEST_ADDR);
        assert_eq!(config.multicast_dest_v6().to_string(), "[ff02::fb]:5353");
    }

    #[test]
    fn test_builder() {
        let config = MdnsConfig::default()
            .with_transaction_timeout(Duration::from_millis(250))
            .with_cache_entry_limit(8)
            .with_multicast_port(15353)
            .with_max_datagram_size(1500);
        assert_eq!(config.transaction_timeout, Duration::from_millis(250));
        assert_eq!(config.cache_entry_limit, 8);
        assert_eq!(config.multicast_dest_v4().port(), 15353);
        assert_eq!(config.max_datagram_size, 1500);
    }
}

//! Multicast socket setup.
//!
//! A [`SocketFactory`] decides which interfaces mDNS runs on and hands out
//! one unbound socket per interface and address family. [`MulticastSocket`]
//! then configures and binds each of them the way mDNS needs.
//!
//! # Example
//!
//! ```rust,no_run
//! use mdns_discovery::{InterfaceSocketFactory, MulticastSocket, SocketFactory};
//!
//! let factory = InterfaceSocketFactory::new().with_ipv6(false);
//! for unbound in factory.create_sockets() {
//!     let socket = MulticastSocket::new().bind(unbound).expect("bind failed");
//!     println!("listening on {}", socket.local_addr().unwrap());
//! }
//! ```

use std::collections::HashSet;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};

use log::{debug, warn};
use shared::ifaces::{Interface, ifaces};
use socket2::{Domain, Protocol, Socket, Type};

use crate::config::{MDNS_MULTICAST_IPV4, MDNS_MULTICAST_IPV6, MDNS_PORT};

/// Multicast TTL and hop limit for outgoing packets.
const MULTICAST_TTL: u32 = 255;

/// A freshly created UDP socket and the interface it should serve.
#[derive(Debug)]
pub struct UnboundSocket {
    socket: Socket,
    interface: Interface,
}

impl UnboundSocket {
    pub fn new(socket: Socket, interface: Interface) -> Self {
        Self { socket, interface }
    }

    pub fn socket(&self) -> &Socket {
        &self.socket
    }

    pub fn interface(&self) -> &Interface {
        &self.interface
    }

    /// Whether this socket carries IPv6 traffic.
    pub fn is_ipv6(&self) -> bool {
        self.interface.addr().is_ipv6()
    }

    pub fn into_parts(self) -> (Socket, Interface) {
        (self.socket, self.interface)
    }
}

/// Source of the sockets a [`MulticastConnection`](crate::MulticastConnection)
/// binds.
///
/// Implementations may return an empty list, which makes the connection
/// fail with `ErrNoUsableSockets`.
pub trait SocketFactory {
    fn create_sockets(&self) -> Vec<UnboundSocket>;
}

/// Creates one socket per multicast-capable interface and family.
///
/// Interfaces that are down, loopback or without multicast support are
/// skipped. An interface carrying several addresses of the same family gets
/// one socket for that family.
#[derive(Debug, Clone, Copy)]
pub struct InterfaceSocketFactory {
    ipv4: bool,
    ipv6: bool,
}

impl Default for InterfaceSocketFactory {
    fn default() -> Self {
        Self {
            ipv4: true,
            ipv6: true,
        }
    }
}

impl InterfaceSocketFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ipv4(mut self, enabled: bool) -> Self {
        self.ipv4 = enabled;
        self
    }

    pub fn with_ipv6(mut self, enabled: bool) -> Self {
        self.ipv6 = enabled;
        self
    }

    /// Picks the interfaces sockets are created for.
    pub fn select(&self, interfaces: Vec<Interface>) -> Vec<Interface> {
        let mut seen = HashSet::new();
        interfaces
            .into_iter()
            .filter(|iface| iface.is_multicast_eligible())
            .filter(|iface| match iface.addr() {
                IpAddr::V4(_) => self.ipv4,
                IpAddr::V6(_) => self.ipv6,
            })
            .filter(|iface| seen.insert((iface.index(), iface.addr().is_ipv6())))
            .collect()
    }
}

impl SocketFactory for InterfaceSocketFactory {
    fn create_sockets(&self) -> Vec<UnboundSocket> {
        let interfaces = match ifaces() {
            Ok(interfaces) => interfaces,
            Err(err) => {
                warn!("failed to enumerate interfaces: {err}");
                return vec![];
            }
        };

        let mut sockets = vec![];
        for iface in self.select(interfaces) {
            let domain = if iface.addr().is_ipv6() {
                Domain::IPV6
            } else {
                Domain::IPV4
            };
            match Socket::new(domain, Type::DGRAM, Some(Protocol::UDP)) {
                Ok(socket) => {
                    debug!("created socket for {} ({})", iface.name(), iface.addr());
                    sockets.push(UnboundSocket::new(socket, iface));
                }
                Err(err) => warn!("failed to create socket for {}: {err}", iface.name()),
            }
        }
        sockets
    }
}

/// Binds an [`UnboundSocket`] for mDNS.
///
/// The socket gets address (and, where supported, port) reuse, is made
/// non-blocking, binds the wildcard address of its family on the mDNS port,
/// sends multicast out of its interface with TTL 255 and loopback enabled,
/// and joins the mDNS group on that interface.
#[derive(Debug, Clone, Copy)]
pub struct MulticastSocket {
    port: u16,
}

impl Default for MulticastSocket {
    fn default() -> Self {
        Self { port: MDNS_PORT }
    }
}

impl MulticastSocket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn bind(&self, unbound: UnboundSocket) -> io::Result<UdpSocket> {
        let (socket, interface) = unbound.into_parts();

        socket.set_reuse_address(true)?;
        #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
        socket.set_reuse_port(true)?;
        socket.set_nonblocking(true)?;

        match interface.addr() {
            IpAddr::V4(addr) => {
                let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), self.port);
                socket.bind(&bind_addr.into())?;
                socket.set_multicast_if_v4(&addr)?;
                socket.set_multicast_ttl_v4(MULTICAST_TTL)?;
                socket.set_multicast_loop_v4(true)?;
                socket.join_multicast_v4(&MDNS_MULTICAST_IPV4, &addr)?;
            }
            IpAddr::V6(_) => {
                socket.set_only_v6(true)?;
                let bind_addr = SocketAddr::new(IpAddr::V6(Ipv6Addr::UNSPECIFIED), self.port);
                socket.bind(&bind_addr.into())?;
                socket.set_multicast_if_v6(interface.index())?;
                socket.set_multicast_hops_v6(MULTICAST_TTL)?;
                socket.set_multicast_loop_v6(true)?;
                socket.join_multicast_v6(&MDNS_MULTICAST_IPV6, interface.index())?;
            }
        }

        debug!(
            "bound mDNS socket on {} ({}) port {}",
            interface.name(),
            interface.addr(),
            self.port
        );
        Ok(socket.into())
    }
}

//! Tokio multicast transport for the mDNS core.
//!
//! [`MulticastConnection`] binds every socket a [`SocketFactory`] hands out,
//! multicasts each outgoing packet on all of them and reads from all of them
//! at once. A socket that fails to bind is dropped at startup. A socket that
//! fails later is removed and reported as a [`ConnectionError`].

use std::collections::VecDeque;
use std::future;
use std::net::{IpAddr, SocketAddr, SocketAddrV6};
use std::task::{Context, Poll};
use std::time::Instant;

use bytes::BytesMut;
use log::{debug, trace, warn};
use shared::error::{Error, Result};
use shared::{TaggedBytesMut, TransportContext, TransportMessage};
use tokio::io::ReadBuf;
use tokio::net::UdpSocket;

use crate::config::{MDNS_MULTICAST_IPV6, MdnsConfig};
use crate::proto::ConnectionError;
use crate::socket::{MulticastSocket, SocketFactory};

/// What [`MulticastConnection::recv()`] produced.
#[derive(Debug)]
pub enum ConnectionInput {
    /// A non-empty datagram, tagged with the socket it arrived on.
    Datagram(TaggedBytesMut),
    /// A socket failed and was taken out of service.
    Error(ConnectionError),
}

#[derive(Debug)]
struct SocketHandler {
    socket: UdpSocket,
    local_addr: SocketAddr,
    // Multicast group this socket sends to.
    group: SocketAddr,
}

/// Set of bound multicast sockets, one per interface and family.
#[derive(Debug)]
pub struct MulticastConnection {
    handlers: Vec<SocketHandler>,
    pending_errors: VecDeque<ConnectionError>,
    recv_buf: Vec<u8>,
    // Socket polled first on the next read, so a busy one cannot starve the rest.
    next_poll: usize,
}

impl MulticastConnection {
    /// Binds every socket from `factory`.
    ///
    /// Sockets that fail to bind or join are logged and skipped. Fails with
    /// `ErrNoUsableSockets` when none is left. Must be called from within a
    /// tokio runtime.
    pub fn init(factory: &dyn SocketFactory, config: &MdnsConfig) -> Result<Self> {
        let builder = MulticastSocket::new().with_port(config.multicast_port);

        let mut handlers = vec![];
        for unbound in factory.create_sockets() {
            let name = unbound.interface().name().to_owned();
            let index = unbound.interface().index();
            let group = match unbound.interface().addr() {
                IpAddr::V4(_) => config.multicast_dest_v4(),
                IpAddr::V6(_) => SocketAddr::V6(SocketAddrV6::new(
                    MDNS_MULTICAST_IPV6,
                    config.multicast_port,
                    0,
                    index,
                )),
            };

            let socket = match builder
                .bind(unbound)
                .and_then(UdpSocket::from_std)
                .and_then(|socket| socket.local_addr().map(|addr| (socket, addr)))
            {
                Ok(bound) => bound,
                Err(err) => {
                    warn!("dropping mDNS socket on {name}: {err}");
                    continue;
                }
            };

            debug!("mDNS socket on {name} bound to {}", socket.1);
            handlers.push(SocketHandler {
                socket: socket.0,
                local_addr: socket.1,
                group,
            });
        }

        if handlers.is_empty() {
            return Err(Error::ErrNoUsableSockets);
        }

        Ok(Self {
            handlers,
            pending_errors: VecDeque::new(),
            recv_buf: vec![0u8; config.max_datagram_size],
            next_poll: 0,
        })
    }

    /// Number of sockets still in service.
    pub fn socket_count(&self) -> usize {
        self.handlers.len()
    }

    pub fn local_addrs(&self) -> Vec<SocketAddr> {
        self.handlers.iter().map(|h| h.local_addr).collect()
    }

    /// Multicasts `packet` on every socket.
    ///
    /// Succeeds if at least one socket sent it. Sockets that failed are
    /// removed and their errors are returned by later calls to
    /// [`recv()`](Self::recv).
    pub async fn send(&mut self, packet: &[u8]) -> Result<()> {
        let mut sent = 0;
        let mut failed = vec![];
        for (i, handler) in self.handlers.iter().enumerate() {
            match handler.socket.send_to(packet, handler.group).await {
                Ok(n) => {
                    trace!("sent {n} bytes from {} to {}", handler.local_addr, handler.group);
                    sent += 1;
                }
                Err(err) => {
                    warn!("send from {} failed: {err}", handler.local_addr);
                    failed.push(i);
                    self.pending_errors.push_back(ConnectionError {
                        local_addr: handler.local_addr,
                        kind: err.kind(),
                    });
                }
            }
        }

        for i in failed.into_iter().rev() {
            self.handlers.remove(i);
        }
        self.next_poll = 0;

        if sent > 0 {
            Ok(())
        } else {
            Err(Error::ErrSendFailed)
        }
    }

    /// Waits for the next datagram or socket failure.
    ///
    /// Pending send failures are returned first. With no socket left this
    /// never completes.
    pub async fn recv(&mut self) -> ConnectionInput {
        if let Some(err) = self.pending_errors.pop_front() {
            return ConnectionInput::Error(err);
        }
        future::poll_fn(|cx| self.poll_recv(cx)).await
    }

    fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<ConnectionInput> {
        let count = self.handlers.len();
        for step in 0..count {
            let i = (self.next_poll + step) % count;
            loop {
                let mut buf = ReadBuf::new(&mut self.recv_buf);
                match self.handlers[i].socket.poll_recv_from(cx, &mut buf) {
                    Poll::Ready(Ok(peer_addr)) => {
                        if buf.filled().is_empty() {
                            continue;
                        }
                        let handler = &self.handlers[i];
                        trace!(
                            "received {} bytes from {peer_addr} on {}",
                            buf.filled().len(),
                            handler.local_addr
                        );
                        let msg = TransportMessage {
                            now: Instant::now(),
                            transport: TransportContext {
                                local_addr: handler.local_addr,
                                peer_addr,
                            },
                            message: BytesMut::from(buf.filled()),
                        };
                        self.next_poll = (i + 1) % count;
                        return Poll::Ready(ConnectionInput::Datagram(msg));
                    }
                    Poll::Ready(Err(err)) => {
                        let handler = self.handlers.remove(i);
                        warn!("read on {} failed: {err}", handler.local_addr);
                        self.next_poll = 0;
                        return Poll::Ready(ConnectionInput::Error(ConnectionError {
                            local_addr: handler.local_addr,
                            kind: err.kind(),
                        }));
                    }
                    Poll::Pending => break,
                }
            }
        }
        Poll::Pending
    }
}

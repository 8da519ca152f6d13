//! Async driver tying [`Mdns`] to a [`MulticastConnection`].

use std::future;
use std::time::Instant;

use log::{debug, warn};
use sansio::Protocol;
use shared::error::{Error, Result};

use crate::config::MdnsConfig;
use crate::connection::{ConnectionInput, MulticastConnection};
use crate::proto::{Mdns, MdnsEvent};
use crate::socket::SocketFactory;

/// Runs the discovery core over real multicast sockets.
///
/// The service owns the core and, while listening, the connection. Each
/// call to [`drive()`](Self::drive) flushes queued queries and then waits
/// for one datagram, socket failure or timer expiry. Drain
/// [`poll_event()`](Self::poll_event) between calls.
///
/// ```rust,no_run
/// use mdns_discovery::{DnsType, InterfaceSocketFactory, MdnsConfig, MdnsService};
///
/// # async fn run() -> mdns_discovery::Result<()> {
/// let mut service = MdnsService::new(MdnsConfig::default());
/// service.start_listening(&InterfaceSocketFactory::new())?;
///
/// let id = service.mdns_mut().create_listener(DnsType::Ptr, "_http._tcp.local");
/// service.mdns_mut().start_listener(id)?;
/// service.mdns_mut().send_query(DnsType::Ptr, "_http._tcp.local")?;
///
/// loop {
///     service.drive().await?;
///     while let Some(event) = service.poll_event() {
///         println!("{event:?}");
///     }
/// }
/// # }
/// ```
pub struct MdnsService {
    config: MdnsConfig,
    mdns: Mdns,
    connection: Option<MulticastConnection>,
}

impl MdnsService {
    pub fn new(config: MdnsConfig) -> Self {
        Self {
            mdns: Mdns::new(config.clone()),
            config,
            connection: None,
        }
    }

    /// Binds the sockets from `factory` and starts serving.
    ///
    /// A core closed by an earlier [`stop_listening()`](Self::stop_listening)
    /// is replaced by a fresh one.
    pub fn start_listening(&mut self, factory: &dyn SocketFactory) -> Result<()> {
        if self.connection.is_some() {
            return Err(Error::ErrAlreadyListening);
        }

        let connection = MulticastConnection::init(factory, &self.config)?;
        debug!(
            "mDNS listening on {} sockets: {:?}",
            connection.socket_count(),
            connection.local_addrs()
        );

        if self.mdns.is_closed() {
            self.mdns = Mdns::new(self.config.clone());
        }
        self.connection = Some(connection);
        Ok(())
    }

    /// Closes the sockets and discards every listener, transaction and
    /// cached record.
    pub fn stop_listening(&mut self) -> Result<()> {
        if self.connection.take().is_none() {
            return Err(Error::ErrNotListening);
        }
        self.mdns.close()
    }

    pub fn is_listening(&self) -> bool {
        self.connection.is_some()
    }

    pub fn mdns(&self) -> &Mdns {
        &self.mdns
    }

    pub fn mdns_mut(&mut self) -> &mut Mdns {
        &mut self.mdns
    }

    pub fn poll_event(&mut self) -> Option<MdnsEvent> {
        self.mdns.poll_event()
    }

    /// Sends queued packets, then handles one input or timer expiry.
    pub async fn drive(&mut self) -> Result<()> {
        let Some(connection) = self.connection.as_mut() else {
            return Err(Error::ErrNotListening);
        };

        while let Some(packet) = self.mdns.poll_write() {
            if let Err(err) = connection.send(&packet.message).await {
                warn!("failed to send mDNS query: {err}");
            }
        }

        let deadline = self.mdns.poll_timeout();
        let timer = async move {
            match deadline {
                Some(deadline) => {
                    tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await
                }
                None => future::pending::<()>().await,
            }
        };

        tokio::select! {
            input = connection.recv() => match input {
                ConnectionInput::Datagram(msg) => self.mdns.handle_read(msg)?,
                ConnectionInput::Error(err) => self.mdns.handle_event(err)?,
            },
            _ = timer => self.mdns.handle_timeout(Instant::now())?,
        }

        Ok(())
    }
}

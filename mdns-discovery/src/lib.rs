//! # mdns-discovery
//!
//! The resolver side of Multicast DNS (RFC 6762): a record cache fed by
//! every response heard on the link, listeners that follow a (name, type)
//! pair over time, and transactions that answer one-shot lookups from the
//! cache, the network or both.
//!
//! ## Sans-I/O Design
//!
//! [`Mdns`] implements [`sansio::Protocol`] and never touches a socket or a
//! clock of its own. The caller:
//!
//! 1. passes received datagrams to `handle_read()`
//! 2. multicasts every packet returned by `poll_write()`
//! 3. calls `handle_timeout()` when `poll_timeout()` expires
//! 4. drains [`MdnsEvent`]s from `poll_event()`
//!
//! [`MdnsService`] does this over tokio, with one
//! [`MulticastConnection`] socket per interface and address family.
//!
//! ## Quick Start
//!
//! ```rust
//! use bytes::BytesMut;
//! use mdns_discovery::{
//!     DNSCLASS_INET, DnsType, Mdns, MdnsConfig, MdnsEvent, RecordData, RecordUpdate,
//!     ResourceRecord, build_response,
//! };
//! use sansio::Protocol;
//! use shared::{TaggedBytesMut, TransportContext};
//! use std::net::Ipv4Addr;
//! use std::time::Instant;
//!
//! let mut mdns = Mdns::new(MdnsConfig::default());
//! let listener = mdns.create_listener(DnsType::A, "printer.local");
//! mdns.start_listener(listener).unwrap();
//!
//! // A response heard on the network.
//! let now = Instant::now();
//! let answer = ResourceRecord::new(
//!     "printer.local",
//!     DNSCLASS_INET,
//!     120,
//!     now,
//!     RecordData::A(Ipv4Addr::new(192, 168, 1, 20)),
//! );
//! let packet = build_response(0, &[answer], &[]).unwrap();
//! mdns.handle_read(TaggedBytesMut {
//!     now,
//!     transport: TransportContext::default(),
//!     message: BytesMut::from(&packet[..]),
//! })
//! .unwrap();
//!
//! match mdns.poll_event() {
//!     Some(MdnsEvent::RecordUpdate(id, RecordUpdate::Added, record)) => {
//!         assert_eq!(id, listener);
//!         assert_eq!(record.name(), "printer.local");
//!     }
//!     other => panic!("unexpected event: {other:?}"),
//! }
//! ```
//!
//! ## Integration with Tokio
//!
//! ```rust,no_run
//! use mdns_discovery::{
//!     DnsType, InterfaceSocketFactory, MdnsConfig, MdnsEvent, MdnsService, TransactionFlags,
//! };
//!
//! #[tokio::main]
//! async fn main() -> mdns_discovery::Result<()> {
//!     let mut service = MdnsService::new(MdnsConfig::default());
//!     service.start_listening(&InterfaceSocketFactory::new())?;
//!
//!     let mdns = service.mdns_mut();
//!     let id = mdns.create_transaction(
//!         DnsType::A,
//!         "printer.local",
//!         TransactionFlags::QUERY_CACHE | TransactionFlags::QUERY_NETWORK,
//!     );
//!     mdns.start_transaction(id)?;
//!
//!     while service.mdns().is_transaction_active(id) {
//!         service.drive().await?;
//!         while let Some(event) = service.poll_event() {
//!             if let MdnsEvent::TransactionResult(_, result) = event {
//!                 println!("{result:?}");
//!             }
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Protocol Details
//!
//! - Multicast groups: 224.0.0.251 and ff02::fb, port 5353
//! - Queries ask for a multicast response (QU bit clear)
//! - Responses set the cache-flush bit on unique records
//! - A TTL of 0 is a goodbye and removes the record at once
//! - Supported record types: A, AAAA, PTR, CNAME, SRV, TXT and NSEC

#![warn(rust_2018_idioms)]

pub(crate) mod cache;
pub(crate) mod config;
pub(crate) mod connection;
pub(crate) mod message;
pub(crate) mod proto;
pub(crate) mod record;
pub(crate) mod service;
pub(crate) mod socket;

pub use cache::{CacheKey, RecordCache, UpdateType};
pub use config::{
    MAX_DATAGRAM_SIZE, MDNS_DEST_ADDR, MDNS_MULTICAST_IPV4, MDNS_MULTICAST_IPV6, MDNS_PORT,
    MdnsConfig,
};
pub use connection::{ConnectionInput, MulticastConnection};
pub use message::{
    DNSCLASS_ANY, DNSCLASS_CACHE_FLUSH, DNSCLASS_INET, DNSCLASS_MASK, DnsClass, DnsType,
    build_query, build_response, parse_response,
};
pub use proto::{
    ConnectionError, ListenerId, Mdns, MdnsEvent, RecordUpdate, TransactionFlags, TransactionId,
    TransactionResult,
};
pub use record::{NsecData, RecordData, ResourceRecord, SrvData};
pub use service::MdnsService;
pub use socket::{InterfaceSocketFactory, MulticastSocket, SocketFactory, UnboundSocket};

pub use shared::error::{Error, Result};
pub use shared::ifaces;

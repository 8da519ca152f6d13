//! Sans-I/O mDNS discovery core.
//!
//! This module provides [`Mdns`], the dispatcher of the discovery engine. It
//! implements the [`sansio::Protocol`] trait and performs no I/O itself.
//!
//! # Overview
//!
//! [`Mdns`] owns the record cache, the listener registry and every
//! transaction. The caller is responsible for:
//!
//! 1. **Network I/O**: passing received datagrams to `handle_read()` and
//!    multicasting every packet returned by `poll_write()`
//! 2. **Timing**: calling `handle_timeout()` when `poll_timeout()` expires
//! 3. **Event Processing**: draining [`MdnsEvent`]s from `poll_event()`
//!
//! [`MdnsService`](crate::MdnsService) does all three over tokio sockets.
//!
//! # Listeners
//!
//! A listener is a standing subscription to a (type, name) pair. Once
//! started, every cache transition for that pair is reported as
//! [`MdnsEvent::RecordUpdate`], and NSEC proofs of non-existence as
//! [`MdnsEvent::NsecRecord`]. With active refresh enabled the listener
//! re-queries the network at 85% and 95% of the last record's TTL.
//!
//! ```rust
//! use mdns_discovery::{DnsType, Mdns, MdnsConfig};
//! use sansio::Protocol;
//!
//! let mut mdns = Mdns::new(MdnsConfig::default());
//! let listener = mdns.create_listener(DnsType::Ptr, "_http._tcp.local");
//! mdns.start_listener(listener).unwrap();
//! mdns.set_active_refresh(listener, true).unwrap();
//!
//! // Starting a listener sends nothing by itself.
//! assert!(mdns.poll_write().is_none());
//! ```
//!
//! # Transactions
//!
//! A transaction is a one-shot lookup. It can serve records from the cache,
//! query the network for a bounded time, or both, and reports through
//! [`MdnsEvent::TransactionResult`].
//!
//! ```rust
//! use mdns_discovery::{DnsType, Mdns, MdnsConfig, TransactionFlags};
//! use sansio::Protocol;
//!
//! let mut mdns = Mdns::new(MdnsConfig::default());
//! let id = mdns.create_transaction(
//!     DnsType::A,
//!     "printer.local",
//!     TransactionFlags::QUERY_CACHE
//!         | TransactionFlags::QUERY_NETWORK
//!         | TransactionFlags::SINGLE_RESULT,
//! );
//! mdns.start_transaction(id).unwrap();
//!
//! // Nothing cached, so a query went out and the timeout is armed.
//! let packet = mdns.poll_write().expect("query packet should be queued");
//! assert_eq!(packet.transport.peer_addr.to_string(), "224.0.0.251:5353");
//! assert!(mdns.poll_timeout().is_some());
//! ```

#[cfg(test)]
mod mdns_test;

pub(crate) mod listener;
pub(crate) mod transaction;

use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::io;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Instant;

use bytes::BytesMut;
use shared::{TaggedBytesMut, TransportContext, TransportMessage};

use crate::cache::{CacheKey, RecordCache, UpdateType};
use crate::config::MdnsConfig;
use crate::message::{DNSCLASS_INET, DnsType, build_query, parse_response};
use crate::record::{RecordData, ResourceRecord};
use shared::error::{Error, Result};

use listener::{Listener, ListenerKey, ListenerOwner};
use transaction::Transaction;

pub use listener::ListenerId;
pub use transaction::{TransactionFlags, TransactionId, TransactionResult};

/// A socket of the multicast connection failed and was taken out of
/// service.
///
/// The core does not reopen sockets; rebuilding the connection is up to
/// the caller.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ConnectionError {
    /// Address the failed socket was bound to.
    pub local_addr: SocketAddr,
    /// What went wrong.
    pub kind: io::ErrorKind,
}

impl fmt::Display for ConnectionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "socket {} failed: {}", self.local_addr, self.kind)
    }
}

/// How a record seen by a listener changed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RecordUpdate {
    Added,
    Changed,
    Removed,
}

/// Events emitted by the mDNS core.
///
/// Poll for events using [`poll_event()`](sansio::Protocol::poll_event) after
/// calling any method that may produce them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MdnsEvent {
    /// A record for a started listener's (type, name) was added, changed or
    /// removed. Removals caused by a goodbye carry the goodbye record
    /// (`ttl == 0`).
    RecordUpdate(ListenerId, RecordUpdate, ResourceRecord),

    /// An NSEC record proved that the listener's name has no record of the
    /// listener's type. Carries the listener's name and type.
    NsecRecord(ListenerId, String, DnsType),

    /// A transaction delivered a result. After a terminal result the
    /// transaction is gone and its id reports inactive.
    TransactionResult(TransactionId, TransactionResult),

    /// A socket of the connection failed.
    ConnectionError(ConnectionError),
}

/// Sans-I/O mDNS discovery core.
///
/// Parses inbound responses, keeps the record cache, dispatches cache
/// transitions to listeners and drives transactions.
pub struct Mdns {
    config: MdnsConfig,

    cache: RecordCache,

    /// Every live listener, started or not.
    listeners: BTreeMap<ListenerId, Listener>,
    /// Started listeners by key.
    registry: BTreeMap<ListenerKey, Vec<ListenerId>>,
    /// Registry keys whose last listener went away, removed on the next
    /// read or timeout.
    stale_keys: Vec<ListenerKey>,
    next_listener_id: ListenerId,

    transactions: BTreeMap<TransactionId, Transaction>,
    next_transaction_id: TransactionId,

    /// When the cache should next be swept.
    scheduled_cleanup: Option<Instant>,

    /// Outgoing packet queue
    write_outs: VecDeque<TaggedBytesMut>,

    /// Event queue
    event_outs: VecDeque<MdnsEvent>,

    /// Whether the core is closed
    closed: bool,
}

impl Mdns {
    /// Create a new core with the given configuration.
    pub fn new(config: MdnsConfig) -> Self {
        let cache = RecordCache::new(config.cache_entry_limit);
        Self {
            config,
            cache,
            listeners: BTreeMap::new(),
            registry: BTreeMap::new(),
            stale_keys: vec![],
            next_listener_id: 1,
            transactions: BTreeMap::new(),
            next_transaction_id: 1,
            scheduled_cleanup: None,
            write_outs: VecDeque::new(),
            event_outs: VecDeque::new(),
            closed: false,
        }
    }

    pub fn config(&self) -> &MdnsConfig {
        &self.config
    }

    /// Read access to the record cache.
    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Non-expired cached records for `name`; `None` matches every type.
    pub fn lookup(&self, typ: Option<DnsType>, name: &str, now: Instant) -> Vec<ResourceRecord> {
        self.cache.lookup(typ, name, now)
    }

    /// Create a listener for (`typ`, `name`). It receives nothing until
    /// [`start_listener()`](Self::start_listener) is called.
    pub fn create_listener(&mut self, typ: DnsType, name: &str) -> ListenerId {
        self.insert_listener(Listener::new(typ, name, ListenerOwner::Caller))
    }

    /// Register a listener so it receives updates for its key.
    ///
    /// # Errors
    ///
    /// [`Error::ErrListenerAlreadyStarted`] if it was started before,
    /// [`Error::ErrUnknownListener`] if the id is not a live listener.
    pub fn start_listener(&mut self, id: ListenerId) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        let Some(listener) = self.listeners.get_mut(&id) else {
            log::error!("start of unknown listener {id}");
            return Err(Error::ErrUnknownListener(id));
        };
        if listener.started {
            log::error!("listener {id} started twice");
            return Err(Error::ErrListenerAlreadyStarted(id));
        }
        listener.started = true;

        let key = listener.key();
        log::debug!("listener {id} started for {} {}", key.name, key.typ);
        self.registry.entry(key).or_default().push(id);
        Ok(())
    }

    /// Turn refresh queries at 85% and 95% of the record TTL on or off.
    pub fn set_active_refresh(&mut self, id: ListenerId, active_refresh: bool) -> Result<()> {
        match self.listeners.get_mut(&id) {
            Some(listener) if listener.owner == ListenerOwner::Caller => {
                listener.set_active_refresh(active_refresh);
                Ok(())
            }
            _ => {
                log::error!("set_active_refresh on unknown listener {id}");
                Err(Error::ErrUnknownListener(id))
            }
        }
    }

    /// Destroy a listener. Pending refreshes die with it.
    ///
    /// # Errors
    ///
    /// [`Error::ErrUnknownListener`] if the id is not a live listener
    /// created by [`create_listener()`](Self::create_listener).
    pub fn remove_listener(&mut self, id: ListenerId) -> Result<()> {
        match self.listeners.get(&id) {
            Some(listener) if listener.owner == ListenerOwner::Caller => {
                self.destroy_listener(id);
                Ok(())
            }
            _ => {
                log::error!("removal of unknown listener {id}");
                Err(Error::ErrUnknownListener(id))
            }
        }
    }

    pub fn is_listener_started(&self, id: ListenerId) -> bool {
        self.listeners.get(&id).is_some_and(|l| l.started)
    }

    /// Create a transaction. It does nothing until
    /// [`start_transaction()`](Self::start_transaction) is called.
    pub fn create_transaction(
        &mut self,
        typ: DnsType,
        name: &str,
        flags: TransactionFlags,
    ) -> TransactionId {
        let id = self.next_transaction_id;
        self.next_transaction_id += 1;
        self.transactions
            .insert(id, Transaction::new(typ, name, flags));
        id
    }

    /// Run a transaction.
    ///
    /// With `QUERY_CACHE` cached records are delivered first; when there
    /// are none and a cached NSEC record rules the type out,
    /// [`TransactionResult::Nsec`] is delivered. If the transaction is still
    /// active and `QUERY_NETWORK` is set, a query is sent and the timeout
    /// armed. A cache-only transaction ends here with `Done` or `NoResults`.
    pub fn start_transaction(&mut self, id: TransactionId) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        let Some(transaction) = self.transactions.get_mut(&id) else {
            log::error!("start of unknown transaction {id}");
            return Err(Error::ErrUnknownTransaction(id));
        };
        if transaction.started {
            log::error!("transaction {id} started twice");
            return Err(Error::ErrTransactionAlreadyStarted(id));
        }
        transaction.started = true;
        let (typ, name, flags) = (transaction.typ, transaction.name.clone(), transaction.flags);
        log::debug!("transaction {id} started for {name} {typ} {flags:?}");

        let now = Instant::now();
        if flags.contains(TransactionFlags::QUERY_CACHE) {
            self.serve_from_cache(id, typ, &name, now);
            if !self.transactions.contains_key(&id) {
                return Ok(());
            }
        }

        if flags.contains(TransactionFlags::QUERY_NETWORK) {
            return self.query_and_listen(id, typ, &name, now);
        }

        self.signal_transaction_over(id);
        Ok(())
    }

    /// Destroy a transaction, dropping its listener and timeout. Returns
    /// whether it was still active.
    pub fn cancel_transaction(&mut self, id: TransactionId) -> bool {
        self.teardown_transaction(id)
    }

    /// A transaction is active from creation until cancelled or until it
    /// delivers a terminal result.
    pub fn is_transaction_active(&self, id: TransactionId) -> bool {
        self.transactions.contains_key(&id)
    }

    /// Queue a multicast query for (`typ`, `name`), message id 0.
    pub fn send_query(&mut self, typ: DnsType, name: &str) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        self.queue_query(typ, name, Instant::now())
    }

    fn queue_query(&mut self, typ: DnsType, name: &str, now: Instant) -> Result<()> {
        let raw_query = build_query(Some(0), name, typ)?;

        log::trace!("Queuing mDNS query for {name} {typ}");
        self.write_outs.push_back(TransportMessage {
            now,
            transport: TransportContext {
                local_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0),
                peer_addr: self.config.multicast_dest_v4(),
            },
            message: BytesMut::from(&raw_query[..]),
        });
        Ok(())
    }

    fn insert_listener(&mut self, listener: Listener) -> ListenerId {
        let id = self.next_listener_id;
        self.next_listener_id += 1;
        self.listeners.insert(id, listener);
        id
    }

    fn destroy_listener(&mut self, id: ListenerId) {
        let Some(listener) = self.listeners.remove(&id) else {
            return;
        };
        if !listener.started {
            return;
        }
        let key = listener.key();
        if let Some(ids) = self.registry.get_mut(&key) {
            ids.retain(|other| *other != id);
            if ids.is_empty() {
                // Dropped from the registry on the next loop iteration.
                self.stale_keys.push(key);
            }
        }
        log::debug!("listener {id} removed");
    }

    fn purge_stale_keys(&mut self) {
        for key in std::mem::take(&mut self.stale_keys) {
            if self.registry.get(&key).is_some_and(Vec::is_empty) {
                self.registry.remove(&key);
            }
        }
    }

    fn process_message(&mut self, msg: &TaggedBytesMut) {
        let now = msg.now;
        let records = match parse_response(&msg.message, now) {
            Ok(records) => records,
            Err(err) => {
                log::trace!(
                    "dropping mDNS packet from {}: {err}",
                    msg.transport.peer_addr
                );
                return;
            }
        };

        // One notification per key, whatever the packet repeats.
        let mut updates: Vec<(CacheKey, UpdateType, ResourceRecord)> = vec![];
        for record in records {
            if record.class().masked() != DNSCLASS_INET {
                log::trace!("ignoring non-IN record {record}");
                continue;
            }
            let key = CacheKey::from_record(&record);
            let update = self.cache.update(record.clone());
            match updates.iter_mut().find(|(k, _, _)| *k == key) {
                None => updates.push((key, update, record)),
                // A removal, or a re-add after one, replaces the earlier
                // transition so listeners end up in the cache's final state.
                Some(entry)
                    if update == UpdateType::Removed
                        || (entry.1 == UpdateType::Removed && update != UpdateType::NoChange) =>
                {
                    entry.1 = update;
                    entry.2 = record;
                }
                Some(_) => {}
            }
        }

        self.schedule_cleanup(self.cache.next_expiration(), now);

        for (key, update, record) in updates {
            if update == UpdateType::Removed {
                // Goodbyes leave nothing in the cache to look up.
                self.on_record_removed(&record);
                continue;
            }
            let Some(current) = self.cache.lookup_key(&key).cloned() else {
                continue;
            };
            if current.typ() == DnsType::Nsec {
                self.notify_nsec_record(&current, now);
            } else {
                let listener_key = ListenerKey::new(current.name(), current.typ());
                self.alert_listeners(update, &listener_key, &current);
            }
        }
    }

    fn schedule_cleanup(&mut self, deadline: Option<Instant>, now: Instant) {
        // An overfilled cache is cleaned up right away.
        self.scheduled_cleanup = if self.cache.is_overfilled() {
            Some(now)
        } else {
            deadline
        };
    }

    fn do_cleanup(&mut self, now: Instant) {
        let mut removed = self.cache.sweep(now);
        removed.extend(self.cache.evict_overflow());
        log::trace!("cache cleanup removed {} records", removed.len());
        for record in &removed {
            self.on_record_removed(record);
        }
        self.schedule_cleanup(self.cache.next_expiration(), now);
    }

    fn on_record_removed(&mut self, record: &ResourceRecord) {
        let key = ListenerKey::new(record.name(), record.typ());
        self.alert_listeners(UpdateType::Removed, &key, record);
    }

    fn alert_listeners(&mut self, update: UpdateType, key: &ListenerKey, record: &ResourceRecord) {
        // Delivery may tear down transactions and their listeners, so walk a
        // copy of the ids and skip the ones that are gone.
        let Some(ids) = self.registry.get(key).cloned() else {
            return;
        };
        for id in ids {
            let Some(listener) = self.listeners.get_mut(&id) else {
                continue;
            };
            let owner = listener.owner;
            let Some(change) = listener.handle_update(update, record) else {
                continue;
            };
            match owner {
                ListenerOwner::Caller => {
                    self.event_outs
                        .push_back(MdnsEvent::RecordUpdate(id, change, record.clone()));
                }
                ListenerOwner::Transaction(tid) => {
                    if change != RecordUpdate::Removed {
                        self.trigger_transaction(tid, TransactionResult::Record(record.clone()));
                    }
                }
            }
        }
    }

    fn notify_nsec_record(&mut self, record: &ResourceRecord, now: Instant) {
        let RecordData::Nsec(nsec) = record.data() else {
            return;
        };

        // Evict cached records of the types the NSEC record rules out.
        for cached in self.cache.lookup(None, record.name(), now) {
            if cached.typ() == DnsType::Nsec || nsec.has_type(cached.typ()) {
                continue;
            }
            if let Some(removed) = self.cache.remove(&CacheKey::from_record(&cached)) {
                self.on_record_removed(&removed);
            }
        }

        // Tell listeners waiting on those types.
        let start = ListenerKey::new(record.name(), DnsType::Unsupported);
        let keys: Vec<ListenerKey> = self
            .registry
            .range(start.clone()..)
            .take_while(|(key, _)| key.name == start.name)
            .filter(|(key, _)| !nsec.has_type(key.typ))
            .map(|(key, _)| key.clone())
            .collect();

        for key in keys {
            let Some(ids) = self.registry.get(&key).cloned() else {
                continue;
            };
            for id in ids {
                let Some(listener) = self.listeners.get(&id) else {
                    continue;
                };
                let (owner, name, typ) = (listener.owner, listener.name.clone(), listener.typ);
                match owner {
                    ListenerOwner::Caller => {
                        self.event_outs
                            .push_back(MdnsEvent::NsecRecord(id, name, typ));
                    }
                    ListenerOwner::Transaction(tid) => {
                        self.trigger_transaction(tid, TransactionResult::Nsec);
                    }
                }
            }
        }
    }

    fn serve_from_cache(&mut self, id: TransactionId, typ: DnsType, name: &str, now: Instant) {
        let records = self.cache.lookup(Some(typ), name, now);
        if records.is_empty() {
            let nsec = self.cache.lookup(Some(DnsType::Nsec), name, now);
            if let Some(nsec) = nsec.first()
                && let RecordData::Nsec(data) = nsec.data()
                && !data.has_type(typ)
            {
                self.trigger_transaction(id, TransactionResult::Nsec);
            }
            return;
        }

        for record in records {
            if !self.transactions.contains_key(&id) {
                return;
            }
            self.trigger_transaction(id, TransactionResult::Record(record));
        }
    }

    fn query_and_listen(
        &mut self,
        id: TransactionId,
        typ: DnsType,
        name: &str,
        now: Instant,
    ) -> Result<()> {
        let listener_id = self.insert_listener(Listener::new(
            typ,
            name,
            ListenerOwner::Transaction(id),
        ));
        self.start_listener(listener_id)?;
        if let Some(transaction) = self.transactions.get_mut(&id) {
            transaction.listener = Some(listener_id);
            transaction.timeout = Some(now + self.config.transaction_timeout);
        }

        if let Err(err) = self.queue_query(typ, name, now) {
            log::warn!("transaction {id} could not query {name}: {err}");
            self.teardown_transaction(id);
            return Err(err);
        }
        Ok(())
    }

    fn signal_transaction_over(&mut self, id: TransactionId) {
        let Some(transaction) = self.transactions.get(&id) else {
            return;
        };
        let result = transaction.over_signal();
        self.trigger_transaction(id, result);
    }

    fn trigger_transaction(&mut self, id: TransactionId, result: TransactionResult) {
        let Some(transaction) = self.transactions.get(&id) else {
            return;
        };
        // Tear down before the result is queued so a terminal result is the
        // last thing this id ever produces.
        if transaction.is_terminal(&result) {
            self.teardown_transaction(id);
        }
        self.event_outs
            .push_back(MdnsEvent::TransactionResult(id, result));
    }

    fn teardown_transaction(&mut self, id: TransactionId) -> bool {
        let Some(transaction) = self.transactions.remove(&id) else {
            return false;
        };
        if let Some(listener_id) = transaction.listener {
            self.destroy_listener(listener_id);
        }
        log::debug!("transaction {id} finished");
        true
    }

    fn next_timeout(&self) -> Option<Instant> {
        let refreshes = self.listeners.values().filter_map(Listener::next_refresh);
        let timeouts = self.transactions.values().filter_map(|t| t.timeout);
        self.scheduled_cleanup
            .into_iter()
            .chain(refreshes)
            .chain(timeouts)
            .min()
    }
}

impl sansio::Protocol<TaggedBytesMut, (), ConnectionError> for Mdns {
    type Rout = ();
    type Wout = TaggedBytesMut;
    type Eout = MdnsEvent;
    type Error = Error;
    type Time = Instant;

    /// Process an incoming mDNS datagram.
    ///
    /// Queries and undecodable packets are dropped without error. Records
    /// of a response are applied to the cache in order, then one
    /// notification pass runs for the packet.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ErrConnectionClosed`] if the core has been closed.
    fn handle_read(&mut self, msg: TaggedBytesMut) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        self.purge_stale_keys();
        self.process_message(&msg);
        Ok(())
    }

    /// The core produces no read outputs; everything is an event.
    fn poll_read(&mut self) -> Option<Self::Rout> {
        None
    }

    /// Not used. Queries are queued by listeners, transactions and
    /// [`send_query()`](Mdns::send_query).
    fn handle_write(&mut self, _msg: ()) -> Result<()> {
        Ok(())
    }

    /// Get the next packet to multicast.
    ///
    /// The peer address is the IPv4 group; a connection with IPv6 sockets
    /// sends the same payload to the IPv6 group as well.
    fn poll_write(&mut self) -> Option<Self::Wout> {
        self.write_outs.pop_front()
    }

    /// Report a failed socket. Surfaced unchanged as
    /// [`MdnsEvent::ConnectionError`].
    fn handle_event(&mut self, evt: ConnectionError) -> Result<()> {
        log::warn!("mDNS connection error: {evt}");
        self.event_outs.push_back(MdnsEvent::ConnectionError(evt));
        Ok(())
    }

    fn poll_event(&mut self) -> Option<Self::Eout> {
        self.event_outs.pop_front()
    }

    /// Run everything that is due at `now`: cache cleanup, listener
    /// refresh queries and transaction timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ErrConnectionClosed`] if the core has been closed.
    fn handle_timeout(&mut self, now: Self::Time) -> Result<()> {
        if self.closed {
            return Err(Error::ErrConnectionClosed);
        }
        self.purge_stale_keys();

        if self.scheduled_cleanup.is_some_and(|at| at <= now) {
            self.do_cleanup(now);
        }

        // Listeners sharing a (name, type) share one query per refresh point.
        let mut refreshes: BTreeMap<ListenerKey, (DnsType, String, usize)> = BTreeMap::new();
        for listener in self.listeners.values_mut() {
            let due = listener.take_due_refreshes(now);
            if due > 0 {
                let entry = refreshes
                    .entry(ListenerKey::new(&listener.name, listener.typ))
                    .or_insert((listener.typ, listener.name.clone(), 0));
                entry.2 = entry.2.max(due);
            }
        }
        for (typ, name, due) in refreshes.into_values() {
            for _ in 0..due {
                if let Err(err) = self.queue_query(typ, &name, now) {
                    log::warn!("refresh query for {name} failed: {err}");
                }
            }
        }

        let expired: Vec<TransactionId> = self
            .transactions
            .iter()
            .filter(|(_, t)| t.timeout.is_some_and(|at| at <= now))
            .map(|(id, _)| *id)
            .collect();
        for id in expired {
            log::debug!("transaction {id} timed out");
            self.signal_transaction_over(id);
        }

        Ok(())
    }

    /// The earliest pending deadline, or `None` when nothing is scheduled.
    fn poll_timeout(&mut self) -> Option<Self::Time> {
        self.next_timeout()
    }

    /// Close the core, dropping the cache, every listener and transaction
    /// and all queued packets and events.
    fn close(&mut self) -> Result<()> {
        self.closed = true;
        self.cache.clear();
        self.listeners.clear();
        self.registry.clear();
        self.stale_keys.clear();
        self.transactions.clear();
        self.scheduled_cleanup = None;
        self.write_outs.clear();
        self.event_outs.clear();
        Ok(())
    }
}

//! Record cache.
//!
//! Holds the most recent record for every [`CacheKey`] and classifies each
//! insert as an [`UpdateType`]. The cache never reads the clock; callers
//! hand in `now` for expiry decisions.


use std::collections::BTreeMap;
use std::fmt;
use std::time::Instant;

use crate::message::DnsType;
use crate::record::{RecordData, ResourceRecord};

/// Identifies one fact in the cache.
///
/// Two records with the same key describe the same fact, so the newer
/// replaces the older. Names compare case-insensitively. The identity part
/// separates answers that may legitimately coexist under one name and
/// type; only PTR records carry one (their target), every other type is
/// exclusive.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CacheKey {
    name: String,
    typ: DnsType,
    identity: String,
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.identity.is_empty() {
            write!(f, "{} {}", self.name, self.typ)
        } else {
            write!(f, "{} {} {}", self.name, self.typ, self.identity)
        }
    }
}

impl CacheKey {
    pub fn new(typ: DnsType, name: &str, identity: &str) -> Self {
        Self {
            name: name.trim_end_matches('.').to_ascii_lowercase(),
            typ,
            identity: identity.trim_end_matches('.').to_ascii_lowercase(),
        }
    }

    pub fn from_record(record: &ResourceRecord) -> Self {
        let identity = match record.data() {
            RecordData::Ptr(target) => target.as_str(),
            _ => "",
        };
        Self::new(record.typ(), record.name(), identity)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn typ(&self) -> DnsType {
        self.typ
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }
}

/// Outcome of [`RecordCache::update`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UpdateType {
    Added,
    Changed,
    Removed,
    NoChange,
}

impl fmt::Display for UpdateType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            UpdateType::Added => "Added",
            UpdateType::Changed => "Changed",
            UpdateType::Removed => "Removed",
            UpdateType::NoChange => "NoChange",
        };
        write!(f, "{s}")
    }
}

/// TTL-scoped store of discovered records.
#[derive(Debug)]
pub struct RecordCache {
    records: BTreeMap<CacheKey, ResourceRecord>,
    next_expiration: Option<Instant>,
    entry_limit: usize,
}

impl RecordCache {
    pub fn new(entry_limit: usize) -> Self {
        Self {
            records: BTreeMap::new(),
            next_expiration: None,
            entry_limit,
        }
    }

    /// Inserts `record`, replacing any entry with the same key.
    ///
    /// A goodbye (`ttl == 0`) removes the entry and reports
    /// [`UpdateType::Removed`], or [`UpdateType::NoChange`] when nothing was
    /// cached under its key.
    pub fn update(&mut self, record: ResourceRecord) -> UpdateType {
        let key = CacheKey::from_record(&record);
        if record.ttl() == 0 {
            return match self.remove(&key) {
                Some(_) => UpdateType::Removed,
                None => UpdateType::NoChange,
            };
        }

        let update = match self.records.get(&key) {
            None => UpdateType::Added,
            Some(existing) if !existing.is_equal(&record, true) => UpdateType::Changed,
            Some(_) => UpdateType::NoChange,
        };
        // Always keep the newest instance so its ttl and timestamp win.
        let deadline = record.expires_at();
        match self.records.insert(key, record) {
            Some(old) if self.next_expiration == Some(old.expires_at()) => {
                self.refresh_next_expiration();
            }
            _ => {
                self.next_expiration = Some(match self.next_expiration {
                    Some(watermark) => watermark.min(deadline),
                    None => deadline,
                });
            }
        }
        update
    }

    /// Non-expired records for `name`, restricted to `typ` unless it is
    /// `None` or [`DnsType::All`].
    pub fn lookup(&self, typ: Option<DnsType>, name: &str, now: Instant) -> Vec<ResourceRecord> {
        let typ = typ.filter(|t| *t != DnsType::All);
        let start = CacheKey::new(typ.unwrap_or_default(), name, "");
        self.records
            .range(start.clone()..)
            .take_while(|(key, _)| {
                key.name == start.name && typ.is_none_or(|t| key.typ == t)
            })
            .filter(|(_, record)| !record.is_expired(now))
            .map(|(_, record)| record.clone())
            .collect()
    }

    /// The record stored under `key`, expired or not.
    pub fn lookup_key(&self, key: &CacheKey) -> Option<&ResourceRecord> {
        self.records.get(key)
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<ResourceRecord> {
        let removed = self.records.remove(key)?;
        if self.next_expiration == Some(removed.expires_at()) {
            self.refresh_next_expiration();
        }
        Some(removed)
    }

    // The watermark is exact: the earliest deadline of any stored record.
    fn refresh_next_expiration(&mut self) {
        self.next_expiration = self.records.values().map(|r| r.expires_at()).min();
    }

    /// Removes and returns every record whose deadline is at or before
    /// `now`, then moves the watermark to the earliest remaining deadline.
    pub fn sweep(&mut self, now: Instant) -> Vec<ResourceRecord> {
        match self.next_expiration {
            Some(watermark) if watermark <= now => {}
            _ => return vec![],
        }

        let expired: Vec<CacheKey> = self
            .records
            .iter()
            .filter(|(_, record)| record.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();

        let removed = expired
            .iter()
            .filter_map(|key| self.records.remove(key))
            .collect();

        self.refresh_next_expiration();
        removed
    }

    /// Drops the records closest to expiry until the cache is back within
    /// its entry limit.
    pub fn evict_overflow(&mut self) -> Vec<ResourceRecord> {
        if !self.is_overfilled() {
            return vec![];
        }

        let mut by_deadline: Vec<(Instant, CacheKey)> = self
            .records
            .iter()
            .map(|(key, record)| (record.expires_at(), key.clone()))
            .collect();
        by_deadline.sort();

        let excess = self.records.len() - self.entry_limit;
        let evicted = by_deadline
            .into_iter()
            .take(excess)
            .filter_map(|(_, key)| self.records.remove(&key))
            .collect();

        self.refresh_next_expiration();
        evicted
    }

    /// Earliest deadline the cache knows of, `None` when nothing is cached.
    pub fn next_expiration(&self) -> Option<Instant> {
        if self.records.is_empty() {
            None
        } else {
            self.next_expiration
        }
    }

    pub fn is_overfilled(&self) -> bool {
        self.records.len() > self.entry_limit
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.next_expiration = None;
    }
}

//! Resource records as stored in the cache and handed to callers.
//!
//! A [`ResourceRecord`] is immutable once built: a newer observation of the
//! same fact is always a new record instance that replaces the old one in
//! the cache.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::time::{Duration, Instant};

use crate::message::{DNSCLASS_CACHE_FLUSH, DNSCLASS_MASK, DnsClass, DnsType};

/// Target of an SRV record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SrvData {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: String,
}

/// Payload of an NSEC record: the next name in canonical order and the set of
/// record types that exist for the owner name.
///
/// The type set is kept in its wire form, one bitmap per 256-type window.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NsecData {
    pub(crate) next_domain: String,
    pub(crate) windows: Vec<(u8, Vec<u8>)>,
}

impl NsecData {
    /// Builds the bitmap for the given existing types.
    pub fn new(next_domain: &str, types: &[DnsType]) -> Self {
        let mut windows: Vec<(u8, Vec<u8>)> = vec![];
        let mut codes: Vec<u16> = types.iter().map(|t| *t as u16).collect();
        codes.sort_unstable();
        codes.dedup();

        for code in codes {
            let window = (code >> 8) as u8;
            let low = (code & 0xFF) as usize;
            if windows.last().is_none_or(|(w, _)| *w != window) {
                windows.push((window, vec![]));
            }
            if let Some((_, bitmap)) = windows.last_mut() {
                let byte = low / 8;
                if bitmap.len() <= byte {
                    bitmap.resize(byte + 1, 0);
                }
                bitmap[byte] |= 0x80 >> (low % 8);
            }
        }

        Self {
            next_domain: next_domain.trim_end_matches('.').to_owned(),
            windows,
        }
    }

    pub fn next_domain(&self) -> &str {
        &self.next_domain
    }

    /// Reports whether the bitmap asserts that records of `typ` exist.
    pub fn has_type(&self, typ: DnsType) -> bool {
        let code = typ as u16;
        let window = (code >> 8) as u8;
        let low = (code & 0xFF) as usize;
        self.windows
            .iter()
            .find(|(w, _)| *w == window)
            .and_then(|(_, bitmap)| bitmap.get(low / 8))
            .is_some_and(|byte| byte & (0x80 >> (low % 8)) != 0)
    }
}

/// Typed payload of a resource record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RecordData {
    A(Ipv4Addr),
    Aaaa(Ipv6Addr),
    Cname(String),
    Ptr(String),
    Txt(Vec<String>),
    Srv(SrvData),
    Nsec(NsecData),
}

impl RecordData {
    /// The record type this payload is carried by.
    pub fn typ(&self) -> DnsType {
        match self {
            RecordData::A(_) => DnsType::A,
            RecordData::Aaaa(_) => DnsType::Aaaa,
            RecordData::Cname(_) => DnsType::Cname,
            RecordData::Ptr(_) => DnsType::Ptr,
            RecordData::Txt(_) => DnsType::Txt,
            RecordData::Srv(_) => DnsType::Srv,
            RecordData::Nsec(_) => DnsType::Nsec,
        }
    }
}

impl fmt::Display for RecordData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordData::A(ip) => write!(f, "{ip}"),
            RecordData::Aaaa(ip) => write!(f, "{ip}"),
            RecordData::Cname(target) | RecordData::Ptr(target) => write!(f, "{target}"),
            RecordData::Txt(txt) => write!(f, "{}", txt.join(" ")),
            RecordData::Srv(srv) => write!(
                f,
                "{} {} {} {}",
                srv.priority, srv.weight, srv.port, srv.target
            ),
            RecordData::Nsec(nsec) => write!(f, "next={}", nsec.next_domain),
        }
    }
}

/// A single resource record observed on the network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRecord {
    name: String,
    class: DnsClass,
    ttl: u32,
    created_at: Instant,
    data: RecordData,
}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} ttl={} {}",
            self.name,
            self.class,
            self.typ(),
            self.ttl,
            self.data
        )
    }
}

impl ResourceRecord {
    /// Creates a record; the type is implied by `data`.
    pub fn new(
        name: &str,
        class: DnsClass,
        ttl: u32,
        created_at: Instant,
        data: RecordData,
    ) -> Self {
        Self {
            name: name.trim_end_matches('.').to_owned(),
            class,
            ttl,
            created_at,
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn typ(&self) -> DnsType {
        self.data.typ()
    }

    /// Class as received, cache-flush bit included.
    pub fn class(&self) -> DnsClass {
        self.class
    }

    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn data(&self) -> &RecordData {
        &self.data
    }

    /// Whether the sender asked receivers to flush other records of this
    /// name and type.
    pub fn cache_flush(&self) -> bool {
        self.class.0 & DNSCLASS_CACHE_FLUSH != 0
    }

    /// The instant this record stops being valid.
    pub fn expires_at(&self) -> Instant {
        self.created_at + Duration::from_secs(u64::from(self.ttl))
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at()
    }

    /// Compares two records ignoring ttl and creation time. With
    /// `ignore_cache_flush` the top bit of the class is masked off first.
    pub fn is_equal(&self, other: &ResourceRecord, ignore_cache_flush: bool) -> bool {
        let (mut class, mut other_class) = (self.class.0, other.class.0);
        if ignore_cache_flush {
            class &= DNSCLASS_MASK;
            other_class &= DNSCLASS_MASK;
        }
        self.name.eq_ignore_ascii_case(&other.name) && class == other_class && self.data == other.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::DNSCLASS_INET;

    #[test]
    fn test_nsec_bitmap() {
        let nsec = NsecData::new("host.local.", &[DnsType::A, DnsType::Txt, DnsType::Nsec]);
        assert_eq!(nsec.next_domain(), "host.local");
        assert!(nsec.has_type(DnsType::A));
        assert!(nsec.has_type(DnsType::Txt));
        assert!(nsec.has_type(DnsType::Nsec));
        assert!(!nsec.has_type(DnsType::Aaaa));
        assert!(!nsec.has_type(DnsType::Srv));
        // A (1) is bit 1 of the first byte, NSEC (47) the last bit of byte 5.
        assert_eq!(nsec.windows, vec![(0, vec![0x40, 0x00, 0x80, 0x00, 0x00, 0x01])]);
    }

    #[test]
    fn test_record_equality_ignores_ttl_and_time() {
        let now = Instant::now();
        let data = RecordData::A(Ipv4Addr::new(192, 168, 1, 5));
        let a = ResourceRecord::new("host.local", DNSCLASS_INET, 120, now, data.clone());
        let b = ResourceRecord::new(
            "HOST.local",
            DnsClass(DNSCLASS_INET.0 | DNSCLASS_CACHE_FLUSH),
            4500,
            now + Duration::from_secs(3),
            data,
        );
        assert!(b.cache_flush());
        assert!(a.is_equal(&b, true));
        assert!(!a.is_equal(&b, false));

        let c = ResourceRecord::new(
            "host.local",
            DNSCLASS_INET,
            120,
            now,
            RecordData::A(Ipv4Addr::new(192, 168, 1, 6)),
        );
        assert!(!a.is_equal(&c, true));
    }

    #[test]
    fn test_record_expiry() {
        let now = Instant::now();
        let record = ResourceRecord::new(
            "host.local.",
            DNSCLASS_INET,
            10,
            now,
            RecordData::Ptr("svc.local".to_owned()),
        );
        assert_eq!(record.name(), "host.local");
        assert_eq!(record.typ(), DnsType::Ptr);
        assert_eq!(record.expires_at(), now + Duration::from_secs(10));
        assert!(!record.is_expired(now + Duration::from_secs(9)));
        assert!(record.is_expired(now + Duration::from_secs(10)));
    }
}

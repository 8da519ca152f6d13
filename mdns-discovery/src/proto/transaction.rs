use std::fmt;
use std::ops::BitOr;
use std::time::Instant;

use crate::message::DnsType;
use crate::record::ResourceRecord;

use super::ListenerId;

/// Unique identifier of a transaction created with
/// [`Mdns::create_transaction()`](super::Mdns::create_transaction).
pub type TransactionId = u64;

/// Where a transaction looks for answers and how many it wants.
///
/// ```rust
/// use mdns_discovery::TransactionFlags;
///
/// let flags = TransactionFlags::QUERY_CACHE | TransactionFlags::SINGLE_RESULT;
/// assert!(flags.contains(TransactionFlags::QUERY_CACHE));
/// assert!(!flags.contains(TransactionFlags::QUERY_NETWORK));
/// ```
#[derive(Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TransactionFlags(pub u8);

impl TransactionFlags {
    /// Serve matching records already in the cache.
    pub const QUERY_CACHE: TransactionFlags = TransactionFlags(1 << 0);
    /// Send a query and listen for answers until the timeout.
    pub const QUERY_NETWORK: TransactionFlags = TransactionFlags(1 << 1);
    /// Stop after the first record.
    pub const SINGLE_RESULT: TransactionFlags = TransactionFlags(1 << 2);

    pub fn contains(&self, other: TransactionFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TransactionFlags {
    type Output = TransactionFlags;

    fn bitor(self, rhs: TransactionFlags) -> TransactionFlags {
        TransactionFlags(self.0 | rhs.0)
    }
}

impl fmt::Debug for TransactionFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = vec![];
        if self.contains(Self::QUERY_CACHE) {
            names.push("QUERY_CACHE");
        }
        if self.contains(Self::QUERY_NETWORK) {
            names.push("QUERY_NETWORK");
        }
        if self.contains(Self::SINGLE_RESULT) {
            names.push("SINGLE_RESULT");
        }
        write!(f, "TransactionFlags({})", names.join(" | "))
    }
}

/// What a transaction reports through
/// [`MdnsEvent::TransactionResult`](super::MdnsEvent::TransactionResult).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionResult {
    /// A matching record, from the cache or the network. Terminal only with
    /// [`TransactionFlags::SINGLE_RESULT`].
    Record(ResourceRecord),
    /// The timeout passed, or a cache-only lookup finished. Terminal.
    Done,
    /// Like `Done`, for `SINGLE_RESULT` transactions that found nothing.
    NoResults,
    /// An NSEC record proved the name has no record of the requested type.
    /// Terminal.
    Nsec,
}

impl TransactionResult {
    pub fn is_record(&self) -> bool {
        matches!(self, TransactionResult::Record(_))
    }
}

#[derive(Debug)]
pub(crate) struct Transaction {
    pub(crate) typ: DnsType,
    pub(crate) name: String,
    pub(crate) flags: TransactionFlags,
    pub(crate) started: bool,
    // Internal listener while waiting on the network.
    pub(crate) listener: Option<ListenerId>,
    pub(crate) timeout: Option<Instant>,
}

impl Transaction {
    pub(crate) fn new(typ: DnsType, name: &str, flags: TransactionFlags) -> Self {
        Self {
            typ,
            name: name.trim_end_matches('.').to_owned(),
            flags,
            started: false,
            listener: None,
            timeout: None,
        }
    }

    /// Whether delivering `result` ends the transaction.
    pub(crate) fn is_terminal(&self, result: &TransactionResult) -> bool {
        self.flags.contains(TransactionFlags::SINGLE_RESULT) || !result.is_record()
    }

    /// The signal sent when nothing more will arrive.
    pub(crate) fn over_signal(&self) -> TransactionResult {
        if self.flags.contains(TransactionFlags::SINGLE_RESULT) {
            TransactionResult::NoResults
        } else {
            TransactionResult::Done
        }
    }
}

use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, PartialEq)]
#[non_exhaustive]
pub enum Error {
    //DNS message errors
    #[error("insufficient data for base length type")]
    ErrBaseLen,
    #[error("insufficient data for calculated length type")]
    ErrCalcLen,
    #[error("segment length too long")]
    ErrSegTooLong,
    #[error("zero length segment")]
    ErrZeroSegLen,
    #[error("name too long")]
    ErrNameTooLong,
    #[error("too many pointers (>10)")]
    ErrTooManyPtr,
    #[error("invalid pointer")]
    ErrInvalidPtr,
    #[error("reserved label type")]
    ErrReserved,
    #[error("character string exceeds maximum length (255)")]
    ErrStringTooLong,
    #[error("insufficient data for resource body length")]
    ErrResourceLen,
    #[error("resource length too long")]
    ErrResTooLong,
    #[error("unsupported resource record type {0}")]
    ErrUnsupportedRecordType(u16),
    #[error("invalid NSEC type bitmap")]
    ErrInvalidTypeBitmap,
    #[error("parsing/packing of this section has completed")]
    ErrSectionDone,
    #[error("parsing/packing of this type isn't available yet")]
    ErrNotStarted,
    #[error("message is not a response")]
    ErrNotResponse,
    #[error("too many records")]
    ErrTooManyRecords,

    //Multicast connection errors
    #[error("no multicast socket could be bound")]
    ErrNoUsableSockets,
    #[error("multicast send failed on every socket")]
    ErrSendFailed,
    #[error("already listening")]
    ErrAlreadyListening,
    #[error("not listening")]
    ErrNotListening,
    #[error("no interface is available")]
    ErrNoInterface,
    #[error("connection closed")]
    ErrConnectionClosed,

    //Caller misuse
    #[error("listener {0} already started")]
    ErrListenerAlreadyStarted(u64),
    #[error("listener {0} is not registered")]
    ErrUnknownListener(u64),
    #[error("transaction {0} already started")]
    ErrTransactionAlreadyStarted(u64),
    #[error("transaction {0} is not registered")]
    ErrUnknownTransaction(u64),

    #[error("{0}")]
    Io(#[source] IoError),

    #[error("{0}")]
    Other(String),
}

#[derive(Debug, Error)]
#[error("io error: {0}")]
pub struct IoError(#[from] pub io::Error);

// Workaround for wanting PartialEq for io::Error.
impl PartialEq for IoError {
    fn eq(&self, other: &Self) -> bool {
        self.0.kind() == other.0.kind()
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(IoError(e))
    }
}

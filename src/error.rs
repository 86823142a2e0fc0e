use std::io;
use std::sync::PoisonError;

use crate::storage::StorageError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug)]
pub enum Error {
    IoError(io::Error),
    /// Permanent storage failure, not retried.
    Storage {
        op: &'static str,
        source: StorageError,
    },
    RetriesExhausted {
        op: &'static str,
        attempts: usize,
        last: StorageError,
    },
    Truncated {
        context: &'static str,
        expected: u64,
        actual: u64,
    },
    InvalidUtf8(&'static str),
    InvalidEnum {
        field: &'static str,
        value: u32,
    },
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    MalformedDocument(String),
    UnknownDataset(i32),
    UnknownJob(i32),
    DatasetNotFound(String),
    JobNotFound(String),
    IdExhausted(&'static str),
    InvalidState(String),
    LockPoisoned,
}

impl Error {
    /// Whether the failure came from the storage backend rather than from the
    /// bytes it returned.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::IoError(_) | Error::Storage { .. } | Error::RetriesExhausted { .. }
        )
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::IoError(err)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::LockPoisoned
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::MalformedDocument(err.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::IoError(err) => write!(f, "I/O error: {}", err),
            Error::Storage { op, source } => write!(f, "Storage failure in {}: {}", op, source),
            Error::RetriesExhausted { op, attempts, last } => write!(
                f,
                "Storage retries exhausted in {} after {} attempts: {}",
                op, attempts, last
            ),
            Error::Truncated {
                context,
                expected,
                actual,
            } => write!(
                f,
                "Truncated record reading {}: expected {} bytes, got {}",
                context, expected, actual
            ),
            Error::InvalidUtf8(context) => write!(f, "Invalid UTF-8 in {}", context),
            Error::InvalidEnum { field, value } => {
                write!(f, "Invalid value {} for {}", value, field)
            }
            Error::LengthMismatch {
                field,
                expected,
                actual,
            } => write!(
                f,
                "Length mismatch in {}: expected {} entries, found {}",
                field, expected, actual
            ),
            Error::MalformedDocument(msg) => write!(f, "Malformed document: {}", msg),
            Error::UnknownDataset(id) => write!(f, "Unknown dataset id {}", id),
            Error::UnknownJob(id) => write!(f, "Unknown job id {}", id),
            Error::DatasetNotFound(name) => write!(f, "No dataset named {:?}", name),
            Error::JobNotFound(name) => write!(f, "No job named {:?}", name),
            Error::IdExhausted(kind) => write!(f, "{} id space exhausted", kind),
            Error::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            Error::LockPoisoned => write!(f, "Lock was poisoned"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::IoError(err) => Some(err),
            Error::Storage { source, .. } => Some(source),
            Error::RetriesExhausted { last, .. } => Some(last),
            _ => None,
        }
    }
}

/// Logs the failure and aborts the process. Used when the failure policy
/// keeps the fatal contract.
pub fn abort_on(op: &str, err: &Error) -> ! {
    tracing::error!(op = op, error = %err, "unrecoverable metadata failure, aborting");
    eprintln!("scanmeta: fatal error in {}: {}", op, err);
    std::process::abort()
}

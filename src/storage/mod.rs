//! Storage capability contract for metadata records.
//!
//! The catalog never talks to a transport directly. Anything that can append
//! bytes to a stream and read bytes back at an offset can host it:
//!
//! ```text
//! WriteStream::append(bytes)          -> ok | transient | permanent
//! ReadStream::read_at(offset, buf)    -> n  | transient | permanent
//! ReadStream::size()                  -> len | transient | permanent
//! ReadStream::read_all_remaining(off) -> bytes
//! ```
//!
//! A `read_at` that returns fewer bytes than requested has hit the end of the
//! stream. That is not an error at this layer; the resilient reader decides
//! whether the record needed those bytes.

pub mod file;
pub mod memory;
pub mod resilient;

pub use file::{FileReadStream, FileWriteStream};
pub use memory::MemoryStream;
pub use resilient::{ResilientReader, ResilientWriter};

use std::fmt;
use std::io;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorKind {
    /// Expected to clear up if the operation is retried.
    Transient,
    /// Retrying will not help.
    Permanent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageError {
    kind: StorageErrorKind,
    message: String,
}

impl StorageError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            kind: StorageErrorKind::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: StorageErrorKind::Permanent,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> StorageErrorKind {
        self.kind
    }

    pub fn is_transient(&self) -> bool {
        self.kind == StorageErrorKind::Transient
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            StorageErrorKind::Transient => write!(f, "transient: {}", self.message),
            StorageErrorKind::Permanent => write!(f, "permanent: {}", self.message),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<io::Error> for StorageError {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => {
                StorageError::transient(err.to_string())
            }
            _ => StorageError::permanent(err.to_string()),
        }
    }
}

/// Append-only write handle.
pub trait WriteStream {
    fn append(&mut self, bytes: &[u8]) -> StorageResult<()>;
}

/// Positional read handle.
pub trait ReadStream {
    /// Reads up to `buf.len()` bytes starting at `offset`. Returns the number
    /// of bytes read; a short count means the stream ended.
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> StorageResult<usize>;

    /// Total length of the stream in bytes.
    fn size(&mut self) -> StorageResult<u64>;

    /// Everything from `offset` to the end of the stream.
    fn read_all_remaining(&mut self, offset: u64) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        let len = size.saturating_sub(offset) as usize;
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = self.read_at(offset + filled as u64, &mut buf[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }
}

impl<W: WriteStream + ?Sized> WriteStream for &mut W {
    fn append(&mut self, bytes: &[u8]) -> StorageResult<()> {
        (**self).append(bytes)
    }
}

impl<R: ReadStream + ?Sized> ReadStream for &mut R {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> StorageResult<usize> {
        (**self).read_at(offset, buf)
    }

    fn size(&mut self) -> StorageResult<u64> {
        (**self).size()
    }

    fn read_all_remaining(&mut self, offset: u64) -> StorageResult<Vec<u8>> {
        (**self).read_all_remaining(offset)
    }
}

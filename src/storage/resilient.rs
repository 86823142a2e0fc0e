//! Retrying adapters over the storage contract.
//!
//! Transient failures are retried with exponential backoff on the calling
//! thread. Permanent failures and exhausted retries come back as typed
//! errors; whether those errors reach the caller or abort the process is
//! decided once, at the record boundary, by [`settle`].

use std::thread;

use super::{ReadStream, StorageResult, WriteStream};
use crate::config::{FailurePolicy, RetryConfig};
use crate::error::{abort_on, Error, Result};
use crate::retry::RetryPolicy;

fn with_retries<T>(
    policy: &RetryPolicy,
    op: &'static str,
    mut attempt: impl FnMut() -> StorageResult<T>,
) -> Result<T> {
    let mut handle = policy.handle();
    loop {
        match attempt() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => match handle.next_delay() {
                Some(delay) => {
                    tracing::warn!(
                        op = op,
                        attempt = handle.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient storage failure, retrying"
                    );
                    thread::sleep(delay);
                }
                None => {
                    return Err(Error::RetriesExhausted {
                        op,
                        attempts: handle.attempts(),
                        last: e,
                    })
                }
            },
            Err(e) => return Err(Error::Storage { op, source: e }),
        }
    }
}

/// Applies the failure policy to the outcome of a whole record operation.
pub fn settle<T>(policy: FailurePolicy, op: &str, result: Result<T>) -> Result<T> {
    match (result, policy) {
        (Ok(value), _) => Ok(value),
        (Err(e), FailurePolicy::Abort) => abort_on(op, &e),
        (Err(e), FailurePolicy::Propagate) => {
            tracing::error!(op = op, error = %e, "Metadata operation failed");
            Err(e)
        }
    }
}

/// Append side of the adapter.
pub struct ResilientWriter<W> {
    stream: W,
    retry: RetryPolicy,
    failure_policy: FailurePolicy,
}

impl<W: WriteStream> ResilientWriter<W> {
    pub fn new(stream: W, config: &RetryConfig) -> Self {
        Self {
            stream,
            retry: RetryPolicy::from(config),
            failure_policy: config.failure_policy,
        }
    }

    /// Appends `bytes` as one operation. A failed attempt is assumed to have
    /// appended nothing.
    pub fn append(&mut self, bytes: &[u8], op: &'static str) -> Result<()> {
        let stream = &mut self.stream;
        with_retries(&self.retry, op, || stream.append(bytes))
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn get_ref(&self) -> &W {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut W {
        &mut self.stream
    }

    pub fn into_inner(self) -> W {
        self.stream
    }
}

/// Positional read side of the adapter. Tracks the offset of the next
/// unread byte.
pub struct ResilientReader<R> {
    stream: R,
    pos: u64,
    retry: RetryPolicy,
    failure_policy: FailurePolicy,
}

impl<R: ReadStream> ResilientReader<R> {
    pub fn new(stream: R, config: &RetryConfig) -> Self {
        Self::at(stream, 0, config)
    }

    /// Starts reading at `pos` instead of the beginning of the stream.
    pub fn at(stream: R, pos: u64, config: &RetryConfig) -> Self {
        Self {
            stream,
            pos,
            retry: RetryPolicy::from(config),
            failure_policy: config.failure_policy,
        }
    }

    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn seek(&mut self, pos: u64) {
        self.pos = pos;
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// One positional read at `offset`, independent of the tracked position.
    /// A short count means the stream ended.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8], op: &'static str) -> Result<usize> {
        let stream = &mut self.stream;
        with_retries(&self.retry, op, || stream.read_at(offset, buf))
    }

    /// Fills `buf` from the tracked position and advances past it. Running
    /// into the end of the stream first is a truncated record.
    pub fn read_exact(&mut self, buf: &mut [u8], context: &'static str) -> Result<()> {
        let mut filled = 0;
        while filled < buf.len() {
            let offset = self.pos + filled as u64;
            let n = self.read_at(offset, &mut buf[filled..], context)?;
            if n == 0 {
                return Err(Error::Truncated {
                    context,
                    expected: buf.len() as u64,
                    actual: filled as u64,
                });
            }
            filled += n;
        }
        self.pos += buf.len() as u64;
        Ok(())
    }

    /// Bytes between the tracked position and the end of the stream.
    pub fn remaining(&mut self, op: &'static str) -> Result<u64> {
        let stream = &mut self.stream;
        let size = with_retries(&self.retry, op, || stream.size())?;
        Ok(size.saturating_sub(self.pos))
    }

    /// Reads everything from the tracked position to the end of the stream.
    pub fn read_to_end(&mut self, op: &'static str) -> Result<Vec<u8>> {
        let stream = &mut self.stream;
        let pos = self.pos;
        let bytes = with_retries(&self.retry, op, || stream.read_all_remaining(pos))?;
        self.pos += bytes.len() as u64;
        Ok(bytes)
    }

    pub fn get_ref(&self) -> &R {
        &self.stream
    }

    pub fn into_inner(self) -> R {
        self.stream
    }
}

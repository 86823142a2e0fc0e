//! Record persistence.
//!
//! Every persisted type implements [`Record`] and names the [`Format`] it is
//! stored in. Two formats exist:
//!
//! - [`Binary`]: fixed layout of big-endian primitives, decoded field by field
//!   from a positional stream. Used for the catalog snapshot and the
//!   per-item records where volume matters.
//! - [`Document`]: pretty-printed JSON, decoded after slurping the rest of the
//!   stream. Used where a record should stay readable and hand-editable.
//!
//! [`write_record`] and [`read_record`] are the only entry points callers
//! need. They apply the stream's failure policy, so with the default policy a
//! caller sees either a complete record or a process abort.

pub mod binary;
pub mod document;

pub use binary::{Binary, BinaryRecord, Decoder, Encoder};
pub use document::{Document, DocumentRecord};

use crate::error::Result;
use crate::storage::resilient::settle;
use crate::storage::{ReadStream, ResilientReader, ResilientWriter, WriteStream};

/// Storage strategy for a record type.
pub trait Format<T> {
    fn write<W: WriteStream>(value: &T, out: &mut ResilientWriter<W>) -> Result<()>;

    fn read<R: ReadStream>(input: &mut ResilientReader<R>) -> Result<T>;
}

/// A persisted record type and the format it uses.
pub trait Record: Sized {
    /// Name used in logs and failure diagnostics.
    const NAME: &'static str;

    type Format: Format<Self>;
}

/// Appends `value` to the stream.
pub fn write_record<T: Record, W: WriteStream>(
    out: &mut ResilientWriter<W>,
    value: &T,
) -> Result<()> {
    let result = <T::Format as Format<T>>::write(value, out);
    if result.is_ok() {
        tracing::debug!(record = T::NAME, "Wrote record");
    }
    settle(out.failure_policy(), T::NAME, result)
}

/// Reads one record at the reader's position. On failure the position is
/// left where the record started.
pub fn read_record<T: Record, R: ReadStream>(input: &mut ResilientReader<R>) -> Result<T> {
    let start = input.position();
    let result = <T::Format as Format<T>>::read(input);
    match &result {
        Ok(_) => {
            tracing::debug!(
                record = T::NAME,
                offset = start,
                len = input.position() - start,
                "Read record"
            );
        }
        Err(_) => input.seek(start),
    }
    settle(input.failure_policy(), T::NAME, result)
}

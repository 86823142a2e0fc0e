//! Fixed-layout binary format.
//!
//! # Primitives
//!
//! ```text
//! i32 / u32 ........ 4 bytes, big-endian
//! i64 .............. 8 bytes, big-endian
//! length ........... u64, 8 bytes, big-endian
//! string ........... length | raw UTF-8 bytes (no terminator)
//! blob ............. length | raw bytes
//! i64 run .......... n * 8 bytes, count stored elsewhere
//! ```
//!
//! Records carry no magic number, version or padding. Any change to a layout
//! breaks every file written before it.

use byteorder::{BigEndian, ByteOrder};

use super::{Format, Record};
use crate::error::{Error, Result};
use crate::storage::{ReadStream, ResilientReader, ResilientWriter, WriteStream};

/// A record stored in the binary format.
pub trait BinaryRecord: Sized {
    /// Structural checks run before anything is encoded.
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn encode_into(&self, enc: &mut Encoder);

    fn decode_from<R: ReadStream>(dec: &mut Decoder<'_, R>) -> Result<Self>;
}

/// The binary format strategy.
pub struct Binary;

impl<T: BinaryRecord + Record> Format<T> for Binary {
    fn write<W: WriteStream>(value: &T, out: &mut ResilientWriter<W>) -> Result<()> {
        value.validate()?;
        let mut enc = Encoder::new();
        value.encode_into(&mut enc);
        // One append per record so a retried append cannot leave half a record
        out.append(enc.as_bytes(), T::NAME)
    }

    fn read<R: ReadStream>(input: &mut ResilientReader<R>) -> Result<T> {
        let mut dec = Decoder::new(input);
        T::decode_from(&mut dec)
    }
}

/// Builds a record in memory.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    fn extend(&mut self, width: usize) -> &mut [u8] {
        let start = self.buf.len();
        self.buf.resize(start + width, 0);
        &mut self.buf[start..]
    }

    pub fn write_i32(&mut self, value: i32) {
        BigEndian::write_i32(self.extend(4), value);
    }

    pub fn write_u32(&mut self, value: u32) {
        BigEndian::write_u32(self.extend(4), value);
    }

    pub fn write_i64(&mut self, value: i64) {
        BigEndian::write_i64(self.extend(8), value);
    }

    pub fn write_len(&mut self, len: usize) {
        BigEndian::write_u64(self.extend(8), len as u64);
    }

    pub fn write_str(&mut self, value: &str) {
        self.write_bytes(value.as_bytes());
    }

    pub fn write_bytes(&mut self, value: &[u8]) {
        self.write_len(value.len());
        self.buf.extend_from_slice(value);
    }

    /// Writes the values back to back without a length prefix.
    pub fn write_i64_run(&mut self, values: &[i64]) {
        BigEndian::write_i64_into(values, self.extend(values.len() * 8));
    }
}

/// Reads a record field by field from a resilient reader.
pub struct Decoder<'a, R> {
    input: &'a mut ResilientReader<R>,
}

impl<'a, R: ReadStream> Decoder<'a, R> {
    pub fn new(input: &'a mut ResilientReader<R>) -> Self {
        Self { input }
    }

    pub fn position(&self) -> u64 {
        self.input.position()
    }

    fn fill<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let mut buf = [0u8; N];
        self.input.read_exact(&mut buf, context)?;
        Ok(buf)
    }

    pub fn read_i32(&mut self, context: &'static str) -> Result<i32> {
        Ok(BigEndian::read_i32(&self.fill::<4>(context)?))
    }

    pub fn read_u32(&mut self, context: &'static str) -> Result<u32> {
        Ok(BigEndian::read_u32(&self.fill::<4>(context)?))
    }

    pub fn read_i64(&mut self, context: &'static str) -> Result<i64> {
        Ok(BigEndian::read_i64(&self.fill::<8>(context)?))
    }

    /// Reads a length prefix for `len` entries of at least `min_entry_size`
    /// bytes each. A length the rest of the stream cannot possibly hold is
    /// reported as truncation before anything is allocated.
    pub fn read_len(&mut self, context: &'static str, min_entry_size: u64) -> Result<usize> {
        let len = BigEndian::read_u64(&self.fill::<8>(context)?);
        let remaining = self.input.remaining(context)?;
        let needed = len.saturating_mul(min_entry_size);
        if needed > remaining {
            return Err(Error::Truncated {
                context,
                expected: needed,
                actual: remaining,
            });
        }
        usize::try_from(len).map_err(|_| Error::Truncated {
            context,
            expected: needed,
            actual: remaining,
        })
    }

    pub fn read_bytes(&mut self, context: &'static str) -> Result<Vec<u8>> {
        let len = self.read_len(context, 1)?;
        let mut buf = vec![0u8; len];
        self.input.read_exact(&mut buf, context)?;
        Ok(buf)
    }

    pub fn read_string(&mut self, context: &'static str) -> Result<String> {
        let bytes = self.read_bytes(context)?;
        String::from_utf8(bytes).map_err(|_| Error::InvalidUtf8(context))
    }

    /// Reads `count` values written by [`Encoder::write_i64_run`].
    pub fn read_i64_run(&mut self, count: usize, context: &'static str) -> Result<Vec<i64>> {
        let mut buf = vec![0u8; count * 8];
        self.input.read_exact(&mut buf, context)?;
        let mut values = vec![0i64; count];
        BigEndian::read_i64_into(&buf, &mut values);
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryConfig;
    use crate::storage::MemoryStream;

    fn reader(bytes: Vec<u8>) -> ResilientReader<MemoryStream> {
        ResilientReader::new(MemoryStream::from(bytes), &RetryConfig::default().propagate())
    }

    #[test]
    fn test_primitive_layout_is_big_endian() {
        let mut enc = Encoder::new();
        enc.write_i32(1);
        enc.write_len(2);
        enc.write_str("ab");

        assert_eq!(
            enc.as_bytes(),
            &[
                0, 0, 0, 1, // i32
                0, 0, 0, 0, 0, 0, 0, 2, // length
                0, 0, 0, 0, 0, 0, 0, 2, b'a', b'b', // string
            ]
        );
    }

    #[test]
    fn test_primitives_decode_in_order() {
        let mut enc = Encoder::new();
        enc.write_i32(-7);
        enc.write_u32(3);
        enc.write_i64(i64::MIN);
        enc.write_str("");
        enc.write_bytes(&[9, 8]);
        enc.write_len(3);
        enc.write_i64_run(&[1, -2, 3]);

        let mut input = reader(enc.into_bytes());
        let mut dec = Decoder::new(&mut input);
        assert_eq!(dec.read_i32("a").unwrap(), -7);
        assert_eq!(dec.read_u32("b").unwrap(), 3);
        assert_eq!(dec.read_i64("c").unwrap(), i64::MIN);
        assert_eq!(dec.read_string("d").unwrap(), "");
        assert_eq!(dec.read_bytes("e").unwrap(), vec![9, 8]);
        let count = dec.read_len("f", 8).unwrap();
        assert_eq!(dec.read_i64_run(count, "g").unwrap(), vec![1, -2, 3]);
    }

    #[test]
    fn test_oversized_length_is_truncation() {
        let mut enc = Encoder::new();
        enc.write_len(usize::MAX);
        enc.write_bytes(b"tiny");

        let mut input = reader(enc.into_bytes());
        let mut dec = Decoder::new(&mut input);
        let result = dec.read_bytes("metadata packets");
        assert!(matches!(
            result,
            Err(Error::Truncated {
                context: "metadata packets",
                ..
            })
        ));
    }

    #[test]
    fn test_invalid_utf8_rejected() {
        let mut enc = Encoder::new();
        enc.write_bytes(&[0xFF, 0xFE]);

        let mut input = reader(enc.into_bytes());
        let result = Decoder::new(&mut input).read_string("dataset name");
        assert!(matches!(result, Err(Error::InvalidUtf8("dataset name"))));
    }
}

use super::{ReadStream, StorageResult, WriteStream};

/// In-memory stream, readable and appendable. Useful as a scratch buffer and
/// for tests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStream {
    data: Vec<u8>,
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drops everything past `len` bytes.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for MemoryStream {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl WriteStream for MemoryStream {
    fn append(&mut self, bytes: &[u8]) -> StorageResult<()> {
        self.data.extend_from_slice(bytes);
        Ok(())
    }
}

impl ReadStream for MemoryStream {
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> StorageResult<usize> {
        let start = (offset as usize).min(self.data.len());
        let end = start.saturating_add(buf.len()).min(self.data.len());
        let n = end - start;
        buf[..n].copy_from_slice(&self.data[start..end]);
        Ok(n)
    }

    fn size(&mut self) -> StorageResult<u64> {
        Ok(self.data.len() as u64)
    }
}

use std::sync::{Arc, RwLock};

use super::DatabaseMetadata;
use crate::error::Result;

/// A catalog shared between threads.
///
/// Every closure passed to [`write`](Self::write) runs with exclusive access,
/// so multi-map mutations such as `remove_dataset` are never observed half
/// done. Readers run concurrently with each other.
#[derive(Debug, Clone, Default)]
pub struct SharedCatalog {
    inner: Arc<RwLock<DatabaseMetadata>>,
}

impl SharedCatalog {
    pub fn new(catalog: DatabaseMetadata) -> Self {
        Self {
            inner: Arc::new(RwLock::new(catalog)),
        }
    }

    pub fn read<T>(&self, f: impl FnOnce(&DatabaseMetadata) -> T) -> Result<T> {
        let catalog = self.inner.read()?;
        Ok(f(&catalog))
    }

    pub fn write<T>(&self, f: impl FnOnce(&mut DatabaseMetadata) -> T) -> Result<T> {
        let mut catalog = self.inner.write()?;
        Ok(f(&mut catalog))
    }

    /// Copy of the current state, e.g. to serialize without holding the lock.
    pub fn snapshot(&self) -> Result<DatabaseMetadata> {
        self.read(DatabaseMetadata::clone)
    }
}

impl From<DatabaseMetadata> for SharedCatalog {
    fn from(catalog: DatabaseMetadata) -> Self {
        Self::new(catalog)
    }
}

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[cfg(unix)]
use std::os::unix::io::AsRawFd;

/// Exclusive advisory lock held by the process that owns catalog mutation.
///
/// Only one process at a time should write the catalog snapshot. Taking this
/// lock next to the snapshot file fails fast when another process already
/// holds it. The lock file records the holder's process id.
#[derive(Debug)]
pub struct CatalogLock {
    _file: File,
    path: PathBuf,
}

impl CatalogLock {
    /// Takes the lock without blocking.
    pub fn acquire<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();

        // Truncating before the lock is held would wipe the holder's pid
        let mut file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)?;

        Self::try_lock(&file)?;

        file.set_len(0)?;
        writeln!(file, "{}", std::process::id())?;
        file.flush()?;

        tracing::info!(path = %path.display(), "Acquired catalog lock");
        Ok(Self { _file: file, path })
    }

    #[cfg(unix)]
    fn try_lock(file: &File) -> io::Result<()> {
        use libc::{flock, LOCK_EX, LOCK_NB};

        let fd = file.as_raw_fd();
        let result = unsafe { flock(fd, LOCK_EX | LOCK_NB) };
        if result != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn try_lock(_file: &File) -> io::Result<()> {
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for CatalogLock {
    fn drop(&mut self) {
        // Closing the file releases the lock; the file itself stays
        tracing::debug!(path = %self.path.display(), "Released catalog lock");
    }
}

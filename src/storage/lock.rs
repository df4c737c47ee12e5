//! Cross-process store lock
//!
//! Every `ledger` process holds its own in-memory copy of the tables, so the
//! in-process mutex alone cannot keep two overlapping invocations from
//! committing over each other. Transactions therefore also take an exclusive
//! `flock` on `data/.lock`. The lock file holds a commit counter: a process
//! whose last load is behind the counter reloads every table before it reads.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use crate::error::{LedgerError, LedgerResult};

/// Exclusive lock on the store, released on drop
pub(crate) struct StoreLock {
    file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Block until no other process holds the store
    pub(crate) fn acquire(path: &Path) -> LedgerResult<Self> {
        let file = open_lock_file(path)?;
        file.lock_exclusive().map_err(|e| {
            LedgerError::Storage(format!("Failed to lock {}: {}", path.display(), e))
        })?;

        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Number of commits recorded in the lock file
    pub(crate) fn generation(&mut self) -> LedgerResult<u64> {
        let mut contents = String::new();
        self.file
            .seek(SeekFrom::Start(0))
            .and_then(|_| self.file.read_to_string(&mut contents))
            .map_err(|e| self.io_error("read", e))?;
        Ok(parse_generation(&contents))
    }

    pub(crate) fn set_generation(&mut self, generation: u64) -> LedgerResult<()> {
        self.file
            .set_len(0)
            .and_then(|_| self.file.seek(SeekFrom::Start(0)))
            .and_then(|_| write!(self.file, "{}", generation))
            .and_then(|_| self.file.sync_all())
            .map_err(|e| self.io_error("write", e))
    }

    fn io_error(&self, action: &str, e: std::io::Error) -> LedgerError {
        LedgerError::Storage(format!("Failed to {} {}: {}", action, self.path.display(), e))
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %err, "failed to release store lock");
        }
    }
}

/// Commit counter as seen without taking the lock; 0 for a fresh store
pub(crate) fn read_generation(path: &Path) -> u64 {
    std::fs::read_to_string(path)
        .map(|contents| parse_generation(&contents))
        .unwrap_or(0)
}

fn parse_generation(contents: &str) -> u64 {
    contents.trim().parse().unwrap_or(0)
}

fn open_lock_file(path: &Path) -> LedgerResult<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| LedgerError::Storage(format!("Failed to open {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_generation_round_trips_through_lock_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".lock");
        assert_eq!(read_generation(&path), 0);

        {
            let mut lock = StoreLock::acquire(&path).unwrap();
            assert_eq!(lock.generation().unwrap(), 0);
            lock.set_generation(12).unwrap();
            lock.set_generation(3).unwrap();
            assert_eq!(lock.generation().unwrap(), 3);
        }

        assert_eq!(read_generation(&path), 3);
    }

    #[test]
    fn test_lock_is_released_on_drop() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".lock");

        drop(StoreLock::acquire(&path).unwrap());
        let other = open_lock_file(&path).unwrap();
        assert!(other.try_lock_exclusive().is_ok());
    }

    #[test]
    fn test_lock_excludes_second_handle() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(".lock");

        let _held = StoreLock::acquire(&path).unwrap();
        let other = open_lock_file(&path).unwrap();
        assert!(other.try_lock_exclusive().is_err());
    }
}

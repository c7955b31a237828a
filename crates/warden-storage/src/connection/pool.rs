//! Read-only connections for the query side of the learning store.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, TryLockError};

use rusqlite::{Connection, OpenFlags};

use warden_core::errors::StorageError;

use super::pragmas::apply_read_pragmas;
use crate::to_storage_err;

const MAX_READERS: usize = 8;

/// Read connections handed out to the first idle one, starting from a
/// rotating offset. Only when every reader is busy does a caller wait.
pub struct ReadPool {
    readers: Vec<Mutex<Connection>>,
    cursor: AtomicUsize,
}

impl ReadPool {
    /// Open `size` (clamped to 1..=8) read-only connections to `path`.
    pub fn open(path: &Path, size: usize) -> Result<Self, StorageError> {
        let readers = (0..size.clamp(1, MAX_READERS))
            .map(|_| {
                let conn = Connection::open_with_flags(
                    path,
                    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
                apply_read_pragmas(&conn)?;
                Ok(Mutex::new(conn))
            })
            .collect::<Result<Vec<_>, StorageError>>()?;
        Ok(Self {
            readers,
            cursor: AtomicUsize::new(0),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let guard = self.checkout()?;
        f(&guard)
    }

    fn checkout(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        let count = self.readers.len();
        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % count;
        for offset in 0..count {
            match self.readers[(start + offset) % count].try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::WouldBlock) => continue,
                Err(TryLockError::Poisoned(_)) => {
                    return Err(to_storage_err("read connection lock poisoned"))
                }
            }
        }
        self.readers[start]
            .lock()
            .map_err(|_| to_storage_err("read connection lock poisoned"))
    }

    pub fn size(&self) -> usize {
        self.readers.len()
    }
}

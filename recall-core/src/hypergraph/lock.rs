//! Cross-process advisory file lock guarding hypergraph snapshot reads/writes
//!: bounded retry, 100 ms initial backoff doubling toward a caller
//! supplied `lockTimeout`.

use crate::constants::{LOCK_INITIAL_BACKOFF_MS, LOCK_MAX_ATTEMPTS};
use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::Path;
use std::time::Duration;

/// An acquired advisory lock on the hypergraph snapshot file. Released on drop.
pub struct FileLock {
    file: File,
}

impl FileLock {
    /// Touch `path` with an empty JSON object if it doesn't exist yet, then
    /// acquire an exclusive advisory lock with bounded retry.
    pub fn acquire(path: &Path, lock_timeout: Duration) -> Result<Self> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, b"{}")?;
        }
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let mut backoff = Duration::from_millis(LOCK_INITIAL_BACKOFF_MS);
        for attempt in 1..=LOCK_MAX_ATTEMPTS {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file }),
                Err(_) if attempt < LOCK_MAX_ATTEMPTS => {
                    std::thread::sleep(backoff.min(lock_timeout));
                    backoff = (backoff * 2).min(lock_timeout);
                }
                Err(_) => break,
            }
        }
        Err(Error::LockContention {
            attempts: LOCK_MAX_ATTEMPTS,
        })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Advisory cross-process file locks with bounded acquisition.
//!
//! Every shared on-disk file (state snapshot, transition log, decision
//! trace, priors, ledger) is guarded by a sibling `<name>.lock` file.
//! The guard releases on drop, on every exit path.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Pause between acquisition attempts.
const RETRY_INTERVAL: Duration = Duration::from_millis(25);

/// Errors that can occur acquiring a file lock.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("lock timeout after {waited_ms} ms: {path}")]
    Timeout { path: PathBuf, waited_ms: u64 },
}

/// An acquired advisory lock. Unlocks on drop.
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire the lock file guarding `target`, retrying until `timeout`.
    ///
    /// The lock file is `<target>.lock`, created on demand and never
    /// deleted (deleting a locked file defeats advisory locking).
    pub fn acquire(target: &Path, timeout: Duration) -> Result<Self, LockError> {
        let path = lock_path(target);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(Self { file, path }),
                Err(_) if start.elapsed() < timeout => {
                    std::thread::sleep(RETRY_INTERVAL);
                }
                Err(_) => {
                    return Err(LockError::Timeout {
                        path,
                        waited_ms: start.elapsed().as_millis() as u64,
                    })
                }
            }
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.file);
    }
}

/// The lock file guarding `target`.
pub fn lock_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.push_str(".lock");
    target.with_file_name(name)
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only JSONL files with locked writes and tolerant reads.
//!
//! Each record is a single line of JSON. Writers hold the sibling file
//! lock for the duration of one record write so concurrent processes
//! never interleave partial lines. Readers take no lock and stop at the
//! first corrupt line (a torn tail from a crashed writer).

use crate::lock::{FileLock, LockError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Errors that can occur on JSONL operations.
#[derive(Debug, Error)]
pub enum JsonlError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Lock(#[from] LockError),
}

/// Append one record under the file lock, fsynced before release.
pub fn append_locked<T: Serialize>(
    path: &Path,
    record: &T,
    lock_timeout: Duration,
) -> Result<(), JsonlError> {
    let mut line = serde_json::to_vec(record)?;
    line.push(b'\n');

    let _guard = FileLock::acquire(path, lock_timeout)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(&line)?;
    file.sync_all()?;
    Ok(())
}

/// Read every parseable record, stopping at the first corrupt line.
pub fn read_all<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, JsonlError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let mut reader = BufReader::new(file);
    let mut records = Vec::new();
    let mut line = String::new();
    let mut offset = 0u64;

    loop {
        line.clear();
        let bytes_read = match reader.read_line(&mut line) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::InvalidData => break,
            Err(e) => return Err(e.into()),
        };
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            match serde_json::from_str(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!(path = %path.display(), offset, error = %e, "corrupt JSONL line, stopping");
                    break;
                }
            }
        }
        offset += bytes_read as u64;
    }

    Ok(records)
}

/// Read the last parseable record, if any.
pub fn last_valid<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, JsonlError> {
    Ok(read_all(path)?.pop())
}

/// Read at most the trailing `max_bytes` of the file and return the
/// complete raw lines found there, newest last. Used by tail-scan readers
/// that must not walk a large log from the start.
pub fn tail_lines(path: &Path, max_bytes: u64) -> Result<Vec<String>, JsonlError> {
    let mut file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };
    let len = file.metadata()?.len();
    let start = len.saturating_sub(max_bytes);
    file.seek(SeekFrom::Start(start))?;

    let mut buf = String::new();
    file.read_to_string(&mut buf)?;

    let mut lines: Vec<&str> = buf.lines().collect();
    // A mid-line start position leaves a partial first line; drop it.
    if start > 0 && !lines.is_empty() {
        lines.remove(0);
    }
    Ok(lines
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect())
}

#[cfg(test)]
#[path = "jsonl_tests.rs"]
mod tests;

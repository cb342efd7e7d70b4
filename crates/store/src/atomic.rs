// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic file writes via temp-then-rename.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

/// Suffix used for in-flight writes. Startup scans delete leftovers.
const TMP_SUFFIX: &str = "tmp";

/// Write `bytes` to `path` atomically: write a sibling `.tmp`, fsync,
/// then rename over the destination. A crash mid-write never leaves a
/// half-written record; the previous content stays readable.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension(TMP_SUFFIX);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp, path)
}

/// Serialize a value as pretty JSON and write it atomically.
pub fn write_json_atomic<T: serde::Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let bytes = serde_json::to_vec_pretty(value).map_err(io::Error::other)?;
    write_atomic(path, &bytes)
}

/// Delete orphaned `.tmp` files left by crashed writes. Returns how many
/// were removed.
pub fn clean_orphan_tmp(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    if !dir.exists() {
        return Ok(0);
    }
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some(TMP_SUFFIX) {
            fs::remove_file(&path)?;
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;

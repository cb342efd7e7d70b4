// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Failed-report spool: results the worker could not deliver to the core.
//!
//! When the HTTP sync fails the worker persists the payload here; a
//! periodic drainer replays the directory when connectivity returns.

use crate::QueueError;
use sheratan_core::JobResult;
use sheratan_store::write_json_atomic;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const FAILED_SUFFIX: &str = ".failed_notify.txt";

/// Handle to the failed-reports directory.
#[derive(Debug, Clone)]
pub struct FailedReports {
    dir: PathBuf,
}

impl FailedReports {
    pub fn open(dir: &Path) -> Result<Self, QueueError> {
        fs::create_dir_all(dir)?;
        Ok(Self { dir: dir.to_owned() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist an undeliverable result as `<ts>_<job_id>.failed_notify.txt`.
    pub fn persist(&self, result: &JobResult, now_ms: u64) -> Result<PathBuf, QueueError> {
        let path = self
            .dir
            .join(format!("{now_ms}_{}{FAILED_SUFFIX}", result.job_id.as_str()));
        write_json_atomic(&path, result)?;
        Ok(path)
    }

    /// All parseable spooled reports, oldest first. Unparseable files are
    /// skipped with a warning so one bad file never wedges the drain.
    pub fn list(&self) -> Result<Vec<(PathBuf, JobResult)>, QueueError> {
        let mut out = Vec::new();
        let mut paths: Vec<PathBuf> = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path
                .file_name()
                .map(|n| n.to_string_lossy().ends_with(FAILED_SUFFIX))
                .unwrap_or(false)
            {
                paths.push(path);
            }
        }
        paths.sort();
        for path in paths {
            let bytes = fs::read(&path)?;
            match serde_json::from_slice::<JobResult>(&bytes) {
                Ok(result) => out.push((path, result)),
                Err(e) => warn!(path = %path.display(), error = %e, "unreadable failed report"),
            }
        }
        Ok(out)
    }

    /// Remove a successfully replayed report.
    pub fn remove(&self, path: &Path) -> Result<(), QueueError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "failed_reports_tests.rs"]
mod tests;

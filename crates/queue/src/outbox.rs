// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The outbox half of the queue protocol (`data/webrelay_in/`).

use crate::QueueError;
use sheratan_core::{JobId, JobResult};
use sheratan_store::write_json_atomic;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const RESULT_SUFFIX: &str = ".result.json";

/// Handle to the outbox directory the core watches for results.
#[derive(Debug, Clone)]
pub struct Outbox {
    dir: PathBuf,
}

impl Outbox {
    pub fn open(dir: &Path) -> Result<Self, QueueError> {
        fs::create_dir_all(dir)?;
        Ok(Self { dir: dir.to_owned() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn result_path(&self, job_id: &JobId) -> PathBuf {
        self.dir.join(format!("{}{RESULT_SUFFIX}", job_id.as_str()))
    }

    /// Write a result document via temp-then-rename.
    pub fn write_result(&self, result: &JobResult) -> Result<PathBuf, QueueError> {
        let path = self.result_path(&result.job_id);
        write_json_atomic(&path, result)?;
        Ok(path)
    }

    /// Read one result file.
    pub fn read_result(&self, path: &Path) -> Result<JobResult, QueueError> {
        let bytes = fs::read(path)?;
        serde_json::from_slice(&bytes)
            .map_err(|e| QueueError::Malformed { path: path.to_owned(), message: e.to_string() })
    }

    /// Result files currently waiting for the core, oldest name first.
    pub fn list_results(&self) -> Result<Vec<PathBuf>, QueueError> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path
                .file_name()
                .map(|n| n.to_string_lossy().ends_with(RESULT_SUFFIX))
                .unwrap_or(false)
            {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    /// Delete a consumed result file.
    pub fn remove(&self, job_id: &JobId) -> Result<(), QueueError> {
        match fs::remove_file(self.result_path(job_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;

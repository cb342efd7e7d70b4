// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The inbox half of the queue protocol.
//!
//! The core writes `<job_id>.job.json`; a worker claims by atomically
//! renaming it to `<job_id>.job.json.claimed`. The rename is the commit
//! point: on a POSIX filesystem exactly one claimant wins.

use crate::QueueError;
use serde::{Deserialize, Serialize};
use sheratan_core::{Job, JobId, WorkerId};
use sheratan_store::write_json_atomic;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const JOB_SUFFIX: &str = ".job.json";
pub const CLAIMED_SUFFIX: &str = ".job.json.claimed";

/// Claim metadata embedded in a `.claimed` file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub worker_id: WorkerId,
    pub claim_token: String,
    pub lease_until_ms: u64,
}

/// The inbox document: the job plus, once claimed, the claim block.
///
/// A reaped ticket keeps its stale claim block as harmless residue; the
/// file name, not the block, decides whether a ticket is claimable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTicket {
    pub job: Job,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim: Option<Claim>,
}

/// Handle to the inbox directory (`data/webrelay_out/`).
#[derive(Debug, Clone)]
pub struct Inbox {
    dir: PathBuf,
}

impl Inbox {
    pub fn open(dir: &Path) -> Result<Self, QueueError> {
        fs::create_dir_all(dir)?;
        Ok(Self { dir: dir.to_owned() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn job_path(&self, job_id: &JobId) -> PathBuf {
        self.dir.join(format!("{}{JOB_SUFFIX}", job_id.as_str()))
    }

    pub fn claimed_path(&self, job_id: &JobId) -> PathBuf {
        self.dir.join(format!("{}{CLAIMED_SUFFIX}", job_id.as_str()))
    }

    /// Write a job file. Duplicate enqueues (either the plain or the
    /// claimed file already present) are rejected.
    pub fn enqueue(&self, job: &Job) -> Result<PathBuf, QueueError> {
        let path = self.job_path(&job.id);
        if path.exists() || self.claimed_path(&job.id).exists() {
            return Err(QueueError::Duplicate { job_id: job.id.clone() });
        }
        let ticket = JobTicket { job: job.clone(), claim: None };
        write_json_atomic(&path, &ticket)?;
        Ok(path)
    }

    /// Number of queued and claimed job files, for backpressure checks.
    pub fn depth(&self) -> Result<usize, QueueError> {
        let mut n = 0;
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(JOB_SUFFIX) || name.ends_with(CLAIMED_SUFFIX) {
                n += 1;
            }
        }
        Ok(n)
    }

    /// Job ids currently sitting unclaimed in the inbox.
    pub fn pending_ids(&self) -> Result<Vec<JobId>, QueueError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(id) = name.strip_suffix(JOB_SUFFIX) {
                ids.push(JobId::new(id));
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Job ids currently claimed by some worker.
    pub fn claimed_ids(&self) -> Result<Vec<JobId>, QueueError> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            if let Some(id) = name.strip_suffix(CLAIMED_SUFFIX) {
                ids.push(JobId::new(id));
            }
        }
        ids.sort();
        Ok(ids)
    }

    /// Attempt to claim a job. Returns `None` when another worker won the
    /// rename race (or the file is gone).
    ///
    /// On success the claimed file is rewritten with the claim block so the
    /// reaper can see who holds the lease and until when.
    pub fn claim(
        &self,
        job_id: &JobId,
        worker_id: &WorkerId,
        lease_until_ms: u64,
    ) -> Result<Option<JobTicket>, QueueError> {
        let src = self.job_path(job_id);
        let dst = self.claimed_path(job_id);
        match fs::rename(&src, &dst) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let bytes = fs::read(&dst)?;
        let mut ticket: JobTicket = serde_json::from_slice(&bytes)
            .map_err(|e| QueueError::Malformed { path: dst.clone(), message: e.to_string() })?;
        ticket.claim = Some(Claim {
            worker_id: worker_id.clone(),
            claim_token: Uuid::new_v4().to_string(),
            lease_until_ms,
        });
        write_json_atomic(&dst, &ticket)?;
        Ok(Some(ticket))
    }

    /// Read a claimed ticket without touching it.
    pub fn read_claimed(&self, job_id: &JobId) -> Result<Option<JobTicket>, QueueError> {
        let path = self.claimed_path(job_id);
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let ticket = serde_json::from_slice(&bytes)
            .map_err(|e| QueueError::Malformed { path, message: e.to_string() })?;
        Ok(Some(ticket))
    }

    /// Delete the claimed file after its result has been durably written.
    pub fn remove_claimed(&self, job_id: &JobId) -> Result<(), QueueError> {
        match fs::remove_file(self.claimed_path(job_id)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove an unclaimed job file (dispatch rollback, cancellation).
    pub fn remove_pending(&self, job_id: &JobId) -> Result<bool, QueueError> {
        match fs::remove_file(self.job_path(job_id)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
#[path = "inbox_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only audit ledger (`ledger/ledger.jsonl`).
//!
//! One line per job lifecycle edge, with cost attribution when the result
//! reports it. The ledger is advisory: a failed append is logged, never
//! propagated into the control path.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sheratan_core::{JobId, JobStatus, WorkerId};
use sheratan_store::append_locked;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::error;

/// Audit events recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    JobCreated {
        job_id: JobId,
    },
    JobStatusChanged {
        job_id: JobId,
        from: JobStatus,
        to: JobStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<WorkerId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    JobCompleted {
        job_id: JobId,
        worker_id: WorkerId,
        latency_ms: u64,
        cost: f64,
        tokens: u64,
        score: f64,
    },
    JobFailed {
        job_id: JobId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<WorkerId>,
        reason: String,
    },
    LeaseReaped {
        job_id: JobId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        worker_id: Option<WorkerId>,
    },
    /// A result arrived for a job already terminal (late worker, cancel
    /// race) and was discarded.
    ResultDropped {
        job_id: JobId,
        reason: String,
    },
    WorkerCooldown {
        worker_id: WorkerId,
        consecutive_failures: u32,
    },
}

/// One ledger line. `at` is the human-readable twin of `at_ms`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub at_ms: u64,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: LedgerEvent,
}

/// Writer handle for the audit ledger.
#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    lock_timeout: Duration,
}

impl Ledger {
    pub fn new(path: &Path, lock_timeout: Duration) -> Self {
        Self { path: path.to_owned(), lock_timeout }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one audit line under the file lock. Best effort.
    pub fn append(&self, event: LedgerEvent, at_ms: u64) {
        let at = Utc
            .timestamp_millis_opt(at_ms as i64)
            .single()
            .unwrap_or_else(Utc::now);
        let entry = LedgerEntry { at_ms, at, event };
        if let Err(e) = append_locked(&self.path, &entry, self.lock_timeout) {
            error!(path = %self.path.display(), error = %e, "ledger append failed");
        }
    }
}

#[cfg(test)]
#[path = "ledger_tests.rs"]
mod tests;

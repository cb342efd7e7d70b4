// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sheratan-queue: the file-based job queue between core and workers

use sheratan_core::JobId;
use std::path::PathBuf;
use thiserror::Error;

pub mod failed_reports;
pub mod inbox;
pub mod outbox;
pub mod reaper;
pub mod watcher;

pub use failed_reports::{FailedReports, FAILED_SUFFIX};
pub use inbox::{Claim, Inbox, JobTicket, CLAIMED_SUFFIX, JOB_SUFFIX};
pub use outbox::{Outbox, RESULT_SUFFIX};
pub use reaper::{reap_expired, ReapedClaim};

/// Errors that can occur in queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("duplicate enqueue for job {job_id}")]
    Duplicate { job_id: JobId },
    #[error("malformed queue file {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

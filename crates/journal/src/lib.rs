// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sheratan-journal: the schema-checked decision journal, priors,
//! UCB-Light selection, and the Why read-model

use thiserror::Error;

pub mod baseline;
pub mod priors;
pub mod redact;
pub mod schema;
pub mod select;
pub mod why;
pub mod writer;

pub use baseline::BaselineTracker;
pub use priors::{prior_key, Prior, PriorsStore};
pub use redact::{filter_artifacts, is_secret_field, redact_value, REDACTED};
pub use schema::{validate, Violation};
pub use select::{
    select, select_score, Candidate, CandidateRole, ScoredCandidate, Selection, EXPLORATION_C,
};
pub use why::{ActionStat, TraceNode, WhyApi, WhyStats};
pub use writer::{AppendOutcome, BreachRecord, DecisionJournal};

/// Errors that can occur in journal operations.
#[derive(Debug, Error)]
pub enum JournalError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Jsonl(#[from] sheratan_store::JsonlError),
    #[error(transparent)]
    Lock(#[from] sheratan_store::LockError),
}

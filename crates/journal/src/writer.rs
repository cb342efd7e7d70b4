// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The append-only decision stream and its breach log.
//!
//! Every write validates against the v1 shape after redaction. Valid
//! entries land in `decision_trace.jsonl`; invalid ones go to
//! `decision_trace_breaches.jsonl` with their violation paths, so the
//! main log stays consumable no matter what a writer produces.

use crate::redact::{filter_artifacts, redact_value};
use crate::schema::{validate, Violation};
use crate::JournalError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sheratan_core::TraceEntry;
use sheratan_store::append_locked;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Cap on the raw-event excerpt stored with a breach.
const BREACH_RAW_CAP: usize = 2_048;

/// Where an append ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    Written,
    Breached(Vec<Violation>),
}

/// A rejected entry as recorded in the breach log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BreachRecord {
    pub timestamp_ms: u64,
    pub violation_paths: Vec<String>,
    pub error_message: String,
    pub raw_event_truncated: String,
}

/// Writer handle for both journal files.
pub struct DecisionJournal {
    trace_path: PathBuf,
    breach_path: PathBuf,
    project_root: PathBuf,
    artifact_whitelist: Vec<PathBuf>,
    lock_timeout: Duration,
}

impl DecisionJournal {
    pub fn open(
        logs_dir: &Path,
        project_root: &Path,
        lock_timeout: Duration,
    ) -> Result<Self, JournalError> {
        std::fs::create_dir_all(logs_dir)?;
        Ok(Self {
            trace_path: logs_dir.join("decision_trace.jsonl"),
            breach_path: logs_dir.join("decision_trace_breaches.jsonl"),
            project_root: project_root.to_owned(),
            artifact_whitelist: vec![project_root.join("artifacts"), logs_dir.to_owned()],
            lock_timeout,
        })
    }

    pub fn trace_path(&self) -> &Path {
        &self.trace_path
    }

    /// Append a typed entry. Redaction always runs; validation decides
    /// which file receives the record.
    pub fn append(&self, entry: &TraceEntry) -> Result<AppendOutcome, JournalError> {
        let value = serde_json::to_value(entry)?;
        self.append_value(value, entry.timestamp_ms)
    }

    /// Append an untyped entry (external writers).
    pub fn append_value(
        &self,
        mut value: Value,
        timestamp_ms: u64,
    ) -> Result<AppendOutcome, JournalError> {
        // Whitelist first: it matches on the original absolute paths,
        // which redaction then relativizes.
        self.apply_artifact_whitelist(&mut value);
        redact_value(&mut value, &self.project_root);

        let violations = validate(&value);
        if violations.is_empty() {
            append_locked(&self.trace_path, &value, self.lock_timeout)?;
            return Ok(AppendOutcome::Written);
        }

        warn!(
            violations = violations.len(),
            first = %violations[0].path,
            "schema breach, routing entry to breach log"
        );
        let mut raw = value.to_string();
        if raw.len() > BREACH_RAW_CAP {
            let mut cut = BREACH_RAW_CAP;
            while !raw.is_char_boundary(cut) {
                cut -= 1;
            }
            raw.truncate(cut);
        }
        let record = BreachRecord {
            timestamp_ms,
            violation_paths: violations.iter().map(|v| v.path.clone()).collect(),
            error_message: violations
                .iter()
                .map(|v| format!("{}: {}", v.path, v.message))
                .collect::<Vec<_>>()
                .join("; "),
            raw_event_truncated: raw,
        };
        append_locked(&self.breach_path, &record, self.lock_timeout)?;
        Ok(AppendOutcome::Breached(violations))
    }

    fn apply_artifact_whitelist(&self, value: &mut Value) {
        let Some(artifacts) = value
            .get_mut("result")
            .and_then(|r| r.get_mut("artifacts"))
        else {
            return;
        };
        if let Value::Array(items) = artifacts {
            let paths: Vec<String> = items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect();
            let whitelist: Vec<&Path> =
                self.artifact_whitelist.iter().map(PathBuf::as_path).collect();
            let kept = filter_artifacts(paths, &whitelist);
            *items = kept.into_iter().map(Value::String).collect();
        }
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;

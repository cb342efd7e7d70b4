// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LCP result envelope: what a worker reports back for a finished job.

use crate::id::{JobId, WorkerId};
use crate::job::JobKind;
use serde::{Deserialize, Serialize};

/// Closed set of LCP result actions.
///
/// `selfloop_result` carries raw Markdown which only the core parses;
/// everything else is a typed JSON envelope. Which family applies is decided
/// by `response_format` in the job payload, never by sniffing content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ResultAction {
    CreateFollowupJobs {
        new_jobs: Vec<NewJobSpec>,
    },
    SelfloopResult {
        markdown: String,
    },
    ListFilesResult {
        path: String,
        entries: Vec<String>,
    },
    ReadFileResult {
        path: String,
        content: String,
    },
    WriteFile {
        path: String,
        bytes_written: u64,
    },
    AnalysisResult {
        summary: String,
        #[serde(default)]
        data: serde_json::Value,
    },
}

impl ResultAction {
    /// Tool results that invite an automatic `agent_plan` follow-up so the
    /// planner sees the new context.
    pub fn is_tool_result(&self) -> bool {
        matches!(
            self,
            ResultAction::ListFilesResult { .. }
                | ResultAction::ReadFileResult { .. }
                | ResultAction::WriteFile { .. }
                | ResultAction::AnalysisResult { .. }
        )
    }
}

/// Follow-up job requested by a result handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJobSpec {
    pub kind: JobKind,
    #[serde(default)]
    pub params: serde_json::Value,
    /// When set, the new job depends on the job whose result created it.
    #[serde(default)]
    pub depends_on_parent: bool,
    #[serde(default)]
    pub priority: i32,
}

/// Observed execution metrics a worker may report. Missing values default
/// to zero and the core fills latency from its own measurement.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultMetrics {
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default)]
    pub retries: u32,
}

/// The outbox document: one per finished job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResult {
    pub job_id: JobId,
    pub worker_id: WorkerId,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ResultAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub metrics: ResultMetrics,
    /// Claim token the worker held; the core drops results whose token no
    /// longer matches the job record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_token: Option<String>,
}

#[cfg(test)]
#[path = "result_tests.rs"]
mod tests;

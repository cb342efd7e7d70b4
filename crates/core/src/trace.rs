// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Decision-trace entry types (schema v1).
//!
//! One append-only record per dispatcher decision. Entries are immutable;
//! results observed later become child nodes of the decision node, linked
//! by `parent_node_id` within the same `trace_id` tree.

use crate::id::{JobId, TraceId};
use serde::{Deserialize, Serialize};

/// Authoritative schema version for trace entries.
pub const TRACE_SCHEMA_VERSION: u32 = 1;

/// High-level goal of a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    DispatchJob,
    RouteLlmCall,
    RecoverFailure,
}

crate::display_str! {
    Intent {
        DispatchJob => "dispatch_job",
        RouteLlmCall => "route_llm_call",
        RecoverFailure => "recover_failure",
    }
}

/// Closed set of candidate step types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionType {
    Route,
    Execute,
    Retry,
    Rewrite,
    Fallback,
    Quarantine,
    Skip,
    Abort,
}

crate::display_str! {
    ActionType {
        Route => "ROUTE",
        Execute => "EXECUTE",
        Retry => "RETRY",
        Rewrite => "REWRITE",
        Fallback => "FALLBACK",
        Quarantine => "QUARANTINE",
        Skip => "SKIP",
        Abort => "ABORT",
    }
}

/// Whether the decision only evaluated the action or actually took it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionMode {
    Simulate,
    Execute,
}

/// Observed outcome status of a trace node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceResultStatus {
    /// Decision recorded; the side effect has not resolved yet.
    Pending,
    Success,
    Failed,
    Skipped,
    Aborted,
}

crate::display_str! {
    TraceResultStatus {
        Pending => "pending",
        Success => "success",
        Failed => "failed",
        Skipped => "skipped",
        Aborted => "aborted",
    }
}

/// Inputs the decision saw.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TraceState {
    #[serde(default)]
    pub context_refs: Vec<String>,
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// The chosen (or refused) action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceAction {
    /// Stable key identifying the action, e.g. `route:worker-7`.
    pub action_id: String,
    #[serde(rename = "type")]
    pub action_type: ActionType,
    pub mode: ActionMode,
    #[serde(default)]
    pub params: serde_json::Value,
    pub select_score: f64,
    /// `false` means policy refused this action outright.
    pub risk_gate: bool,
}

/// Observed metrics for a resolved action.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TraceMetrics {
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub cost: f64,
    #[serde(default)]
    pub tokens: u64,
    #[serde(default)]
    pub retries: u32,
    #[serde(default)]
    pub risk: f64,
    #[serde(default)]
    pub quality: f64,
}

/// The outcome slot of a trace node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceResult {
    pub status: TraceResultStatus,
    #[serde(default)]
    pub metrics: TraceMetrics,
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub determinism: Option<String>,
}

impl TraceResult {
    pub fn pending() -> Self {
        Self {
            status: TraceResultStatus::Pending,
            metrics: TraceMetrics::default(),
            score: 0.0,
            error: None,
            artifacts: None,
            determinism: None,
        }
    }
}

/// One append-only decision record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub schema_version: u32,
    pub timestamp_ms: u64,
    pub trace_id: TraceId,
    pub node_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_node_id: Option<String>,
    /// Build identifier of the core that produced this entry.
    pub build_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub intent: Intent,
    pub depth: u32,
    #[serde(default)]
    pub state: TraceState,
    pub action: TraceAction,
    pub result: TraceResult,
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;

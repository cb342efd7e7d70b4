// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job: the execution unit, with its status machine.

use crate::id::{JobId, MissionId, TaskId, TraceId, WorkerId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of executable job kinds.
///
/// Unknown kinds are a validation failure at the API boundary; adding a kind
/// requires an explicit change to the worker dispatch map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    LlmCall,
    ListFiles,
    ReadFile,
    WriteFile,
    AgentPlan,
    Selfloop,
}

crate::display_str! {
    JobKind {
        LlmCall => "llm_call",
        ListFiles => "list_files",
        ReadFile => "read_file",
        WriteFile => "write_file",
        AgentPlan => "agent_plan",
        Selfloop => "selfloop",
    }
}

impl JobKind {
    /// Kinds routed through the LLM bridge.
    pub fn is_llm(self) -> bool {
        matches!(self, JobKind::LlmCall | JobKind::AgentPlan | JobKind::Selfloop)
    }

    /// Kinds that mutate the filesystem (gated under a readonly risk policy).
    pub fn mutates_files(self) -> bool {
        matches!(self, JobKind::WriteFile)
    }
}

/// Status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Dispatched,
    Running,
    Completed,
    Failed,
}

crate::display_str! {
    JobStatus {
        Pending => "pending",
        Dispatched => "dispatched",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

impl JobStatus {
    /// Terminal states are never re-entered.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Legal status transitions. `Pending` is re-enterable from the
    /// dispatched/running states via the stale-lease reaper.
    pub fn can_transition(self, to: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, to),
            (Pending, Dispatched)
                | (Pending, Failed)
                | (Dispatched, Running)
                | (Dispatched, Completed)
                | (Dispatched, Failed)
                | (Dispatched, Pending)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Pending)
        )
    }
}

/// Refused job status transition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid job transition: {from} -> {to}")]
pub struct JobTransitionError {
    pub from: JobStatus,
    pub to: JobStatus,
}

/// Wire format the worker expects for an LLM-bound job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    SelfloopMarkdown,
}

/// Short task descriptor embedded in the worker-facing payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDescriptor {
    pub id: TaskId,
    pub name: String,
    pub kind: JobKind,
}

/// The worker-facing instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPayload {
    pub task: TaskDescriptor,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// Configuration for creating a new job.
#[derive(Debug, Clone)]
pub struct JobConfig {
    pub id: JobId,
    pub task_id: TaskId,
    pub mission_id: MissionId,
    pub kind: JobKind,
    pub payload: JobPayload,
    pub depends_on: Vec<JobId>,
    pub priority: i32,
    pub trace_id: TraceId,
    pub depth: u32,
}

impl JobConfig {
    pub fn new(id: JobId, task_id: TaskId, mission_id: MissionId, kind: JobKind) -> Self {
        let payload = JobPayload {
            task: TaskDescriptor { id: task_id.clone(), name: String::new(), kind },
            params: serde_json::Value::Null,
            response_format: None,
        };
        Self {
            id,
            task_id,
            mission_id,
            kind,
            payload,
            depends_on: Vec::new(),
            priority: 0,
            trace_id: TraceId::generate(),
            depth: 0,
        }
    }
}

/// A job instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub task_id: TaskId,
    pub mission_id: MissionId,
    pub kind: JobKind,
    pub status: JobStatus,
    pub payload: JobPayload,
    /// Jobs that must be `completed` before this one may leave `pending`.
    #[serde(default)]
    pub depends_on: Vec<JobId>,
    /// Higher dispatches first; ties break by `created_at_ms`.
    #[serde(default)]
    pub priority: i32,
    pub created_at_ms: u64,
    /// Set when the dispatcher routes the job to a worker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_id: Option<WorkerId>,
    /// Set once a worker claims the queue file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claim_deadline_ms: Option<u64>,
    /// How many times the job has been handed to a worker. Bounded by
    /// the `MAX_RETRIES` policy; exceeding it fails the job.
    #[serde(default)]
    pub dispatch_count: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Root of the decision-trace tree this job participates in.
    pub trace_id: TraceId,
    /// Node id of the latest dispatch decision, so the observed result can
    /// be appended as its child.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision_node_id: Option<String>,
    /// Chain depth: follow-up jobs inherit the root trace and increment this.
    #[serde(default)]
    pub depth: u32,
}

impl Job {
    pub fn new(config: JobConfig, created_at_ms: u64) -> Self {
        Self {
            id: config.id,
            task_id: config.task_id,
            mission_id: config.mission_id,
            kind: config.kind,
            status: JobStatus::Pending,
            payload: config.payload,
            depends_on: config.depends_on,
            priority: config.priority,
            created_at_ms,
            worker_id: None,
            claim_token: None,
            claim_deadline_ms: None,
            dispatch_count: 0,
            result: None,
            error: None,
            trace_id: config.trace_id,
            decision_node_id: None,
            depth: config.depth,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a status transition, refusing anything outside the matrix.
    pub fn transition(&mut self, to: JobStatus) -> Result<(), JobTransitionError> {
        if !self.status.can_transition(to) {
            return Err(JobTransitionError { from: self.status, to });
        }
        self.status = to;
        Ok(())
    }

    /// Clear claim state when a lease is reaped and the job re-enters pending.
    pub fn clear_claim(&mut self) {
        self.worker_id = None;
        self.claim_token = None;
        self.claim_deadline_ms = None;
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        into {
            id: JobId = "job-1",
            task_id: TaskId = "task-1",
            mission_id: MissionId = "mission-1",
            trace_id: TraceId = "trace-1",
        }
        set {
            kind: JobKind = JobKind::ReadFile,
            status: JobStatus = JobStatus::Pending,
            payload: JobPayload = JobPayload {
                task: TaskDescriptor {
                    id: TaskId::new("task-1"),
                    name: "test-task".to_string(),
                    kind: JobKind::ReadFile,
                },
                params: serde_json::Value::Null,
                response_format: None,
            },
            depends_on: Vec<JobId> = Vec::new(),
            priority: i32 = 0,
            created_at_ms: u64 = 1_000_000,
            dispatch_count: u32 = 0,
            depth: u32 = 0,
        }
        option {
            worker_id: WorkerId = None,
            claim_token: String = None,
            claim_deadline_ms: u64 = None,
            result: serde_json::Value = None,
            error: String = None,
            decision_node_id: String = None,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;

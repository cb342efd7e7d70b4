// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task: a unit of work inside a mission.

use crate::id::{MissionId, TaskId};
use crate::job::JobKind;
use serde::{Deserialize, Serialize};

/// Status of a task, derived from its jobs' transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

crate::display_str! {
    TaskStatus {
        Pending => "pending",
        Running => "running",
        Completed => "completed",
        Failed => "failed",
    }
}

/// A unit of work inside a mission. Created by the submitter or by result
/// handlers; mutated only by the core when its jobs transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub mission_id: MissionId,
    pub name: String,
    pub kind: JobKind,
    #[serde(default)]
    pub params: serde_json::Value,
    pub status: TaskStatus,
    pub created_at_ms: u64,
    /// Self-loop bookkeeping: maximum planner iterations for this task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_iterations: Option<u32>,
}

impl Task {
    pub fn new(
        id: TaskId,
        mission_id: MissionId,
        name: impl Into<String>,
        kind: JobKind,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            mission_id,
            name: name.into(),
            kind,
            params: serde_json::Value::Null,
            status: TaskStatus::Pending,
            created_at_ms,
            max_iterations: None,
        }
    }

    crate::setters! {
        set {
            params: serde_json::Value,
            status: TaskStatus,
        }
        option {
            max_iterations: u32,
        }
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: a single read_file task flows end to end.

use super::prelude::*;
use sheratan_core::{ActionMode, ActionType, TraceResultStatus};

#[tokio::test]
async fn read_file_mission_completes_with_decision_trace() {
    let mesh = Mesh::new();
    std::fs::write(mesh.dir.path().join("README.md"), "# hello mesh").unwrap();

    mesh.register_worker("w-1", &[JobKind::ReadFile, JobKind::ListFiles]);
    let job = mesh.seed_job(JobKind::ReadFile, serde_json::json!({"path": "README.md"}));

    // Dispatcher picks the job and writes it into the queue.
    assert_eq!(dispatch_once(&mesh.ctx).await.unwrap(), 1);

    // Worker claims, reads, and drops the result into the outbox.
    mesh.worker_cycle("w-1").await;

    // Core syncs the result.
    assert_eq!(mesh.sync_outbox(), 1);

    let done = mesh.ctx.store.get_job(&job.id).unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    let result = done.result.unwrap();
    assert_eq!(result["action"], "read_file_result");
    assert_eq!(result["content"], "# hello mesh");

    // The decision trace explains the routing, with a positive score.
    let entries = mesh.ctx.why.for_job(&job.id).unwrap();
    let decision = entries
        .iter()
        .find(|e| e.action.action_type == ActionType::Route)
        .unwrap();
    assert_eq!(decision.intent, Intent::DispatchJob);
    assert_eq!(decision.action.mode, ActionMode::Execute);

    let outcome = entries
        .iter()
        .find(|e| e.result.status == TraceResultStatus::Success)
        .unwrap();
    assert!(outcome.result.score > 0.0);
    assert_eq!(outcome.parent_node_id.as_ref(), done.decision_node_id.as_ref());
}

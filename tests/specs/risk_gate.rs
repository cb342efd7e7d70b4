// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: a readonly risk policy gates write_file actions out before
//! scoring, and the refusal is explainable.

use super::prelude::*;
use sheratan_core::{ActionType, RiskPolicy, TraceResultStatus};

#[tokio::test]
async fn readonly_policy_refuses_write_jobs_with_a_skip_decision() {
    let mesh = Mesh::with_config(|c| {
        c.risk_policy = RiskPolicy { readonly: true, budget_remaining: f64::INFINITY };
    });
    mesh.register_worker("w-1", &[JobKind::WriteFile, JobKind::ReadFile]);
    let job = mesh.seed_job(
        JobKind::WriteFile,
        serde_json::json!({"path": "out.txt", "content": "nope"}),
    );

    dispatch_once(&mesh.ctx).await.unwrap();

    // The job failed with a validation reason, without reaching a worker.
    let failed = mesh.ctx.store.get_job(&job.id).unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert!(failed.error.as_deref().unwrap_or("").starts_with("validation:"));
    assert_eq!(mesh.ctx.inbox.depth().unwrap(), 0);

    // The trace shows a gated candidate and a SKIP, not a write execute.
    let entries = mesh.ctx.why.for_job(&job.id).unwrap();
    assert_eq!(entries.len(), 1);
    let decision = &entries[0];
    assert_eq!(decision.action.action_type, ActionType::Skip);
    assert!(!decision.action.risk_gate);
    assert_eq!(decision.result.status, TraceResultStatus::Skipped);
    let gated = decision.action.params["gated_out"].as_array().unwrap();
    assert!(gated.iter().any(|g| g.as_str().unwrap().contains("w-1")));

    // Read jobs still flow under the same policy.
    std::fs::write(mesh.dir.path().join("ok.txt"), "fine").unwrap();
    let read_job = mesh.seed_job(JobKind::ReadFile, serde_json::json!({"path": "ok.txt"}));
    dispatch_once(&mesh.ctx).await.unwrap();
    assert_eq!(
        mesh.ctx.store.get_job(&read_job.id).unwrap().status,
        JobStatus::Dispatched
    );
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: a worker dies mid-claim; the lease reaper requeues and a
//! second worker finishes the job exactly once.

use super::prelude::*;
use std::time::Duration;

#[tokio::test]
async fn crashed_worker_self_heals_via_lease_reap() {
    let mesh = Mesh::new();
    std::fs::write(mesh.dir.path().join("data.txt"), "payload").unwrap();

    mesh.register_worker("w-1", &[JobKind::ReadFile]);
    let job = mesh.seed_job(JobKind::ReadFile, serde_json::json!({"path": "data.txt"}));

    assert_eq!(dispatch_once(&mesh.ctx).await.unwrap(), 1);

    // w-1 claims the job file, then "crashes" before producing a result.
    let lease_until = mesh.now_ms() + 300_000;
    mesh.ctx
        .inbox
        .claim(&job.id, &WorkerId::new("w-1"), lease_until)
        .unwrap()
        .unwrap();

    // Within the lease nothing is requeued; the claim is mirrored into the
    // store instead.
    assert_eq!(reap_once(&mesh.ctx).unwrap(), 0);
    let running = mesh.ctx.store.get_job(&job.id).unwrap();
    assert_eq!(running.status, JobStatus::Running);
    assert_eq!(running.worker_id, Some(WorkerId::new("w-1")));
    assert_eq!(running.claim_deadline_ms, Some(lease_until));
    assert!(running.claim_token.is_some());

    // Past the lease the claim is reaped and the job re-enters pending.
    mesh.clock.advance(Duration::from_secs(301));
    assert_eq!(reap_once(&mesh.ctx).unwrap(), 1);
    let requeued = mesh.ctx.store.get_job(&job.id).unwrap();
    assert_eq!(requeued.status, JobStatus::Pending);
    assert!(requeued.worker_id.is_none());

    // A replacement worker registers (fresh heartbeat) and picks it up.
    mesh.register_worker("w-2", &[JobKind::ReadFile]);
    assert_eq!(dispatch_once(&mesh.ctx).await.unwrap(), 1);
    mesh.worker_cycle("w-2").await;

    // Exactly one result file was produced.
    assert_eq!(mesh.ctx.outbox.list_results().unwrap().len(), 1);
    assert_eq!(mesh.sync_outbox(), 1);

    let done = mesh.ctx.store.get_job(&job.id).unwrap();
    assert_eq!(done.status, JobStatus::Completed);
    assert_eq!(done.dispatch_count, 2);

    // No duplicate chain job: the tool result spawned exactly one planner
    // follow-up.
    let jobs = mesh.ctx.store.list_jobs_by_task(&job.task_id).unwrap();
    let plans: Vec<_> = jobs.iter().filter(|j| j.kind == JobKind::AgentPlan).collect();
    assert_eq!(plans.len(), 1);
}

#[tokio::test]
async fn repeated_reaps_exhaust_the_retry_budget() {
    let mesh = Mesh::new();
    mesh.register_worker("w-1", &[JobKind::ReadFile]);
    let job = mesh.seed_job(JobKind::ReadFile, serde_json::json!({"path": "data.txt"}));

    // Three dispatch/claim/reap cycles burn the default budget.
    for _ in 0..3 {
        mesh.register_worker("w-1", &[JobKind::ReadFile]); // refresh heartbeat
        assert_eq!(dispatch_job(&mesh.ctx, &mesh.ctx.store.get_job(&job.id).unwrap())
            .await
            .unwrap(), DispatchOutcome::Dispatched);
        let lease_until = mesh.now_ms() + 300_000;
        mesh.ctx
            .inbox
            .claim(&job.id, &WorkerId::new("w-1"), lease_until)
            .unwrap()
            .unwrap();
        mesh.clock.advance(Duration::from_secs(301));
        assert_eq!(reap_once(&mesh.ctx).unwrap(), 1);
        // Clear the requeued file so the next dispatch can enqueue cleanly.
        mesh.ctx.inbox.remove_pending(&job.id).unwrap();
    }

    mesh.register_worker("w-1", &[JobKind::ReadFile]);
    let outcome = dispatch_job(&mesh.ctx, &mesh.ctx.store.get_job(&job.id).unwrap())
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::RetriesExhausted);

    let failed = mesh.ctx.store.get_job(&job.id).unwrap();
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(failed.error.as_deref(), Some("max_retries_exceeded"));
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: a three-iteration self-loop driven by simulated worker
//! Markdown responses.

use super::prelude::*;
use sheratan_daemon::chain::initial_selfloop_job;
use sheratan_core::LoopState;

fn markdown(iteration: u32) -> String {
    format!(
        "## A\nSituation after iteration {iteration}.\n\n## B\nKeep digging.\n\n## C\nDid the thing.\n\n## D\nWhat about part {}?\n",
        iteration + 1
    )
}

#[tokio::test]
async fn selfloop_runs_three_iterations_then_completes() {
    let mesh = Mesh::new();
    mesh.register_worker("w-llm", &[JobKind::Selfloop]);

    // Seed the loop task and its first iteration job.
    let mission = Mission::new(MissionId::generate(), "Analyze X", mesh.now_ms());
    mesh.ctx.store.put_mission(&mission).unwrap();
    let task = Task::new(
        TaskId::generate(),
        mission.id.clone(),
        "selfloop: Analyze X",
        JobKind::Selfloop,
        mesh.now_ms(),
    )
    .status(TaskStatus::Running)
    .max_iterations(3u32);
    mesh.ctx.store.put_task(&task).unwrap();
    let first = initial_selfloop_job(
        task.id.clone(),
        mission.id.clone(),
        &task.name,
        "Analyze X",
        3,
        mesh.now_ms(),
    );
    mesh.ctx.store.put_job(&first).unwrap();

    let trace_id = first.trace_id.clone();
    let mut iteration = 1u32;
    loop {
        // Dispatch whatever is pending (exactly one loop job at a time).
        let pending = mesh.ctx.store.list_pending_jobs_sorted().unwrap();
        assert_eq!(pending.len(), 1, "one live loop job per iteration");
        let job = pending.into_iter().next().unwrap();
        let state: LoopState =
            serde_json::from_value(job.payload.params["loop"].clone()).unwrap();
        assert_eq!(state.iteration, iteration);

        assert_eq!(dispatch_job(&mesh.ctx, &job).await.unwrap(), DispatchOutcome::Dispatched);

        // The worker answers with A/B/C/D Markdown, unparsed.
        let result = JobResult {
            job_id: job.id.clone(),
            worker_id: WorkerId::new("w-llm"),
            ok: true,
            action: Some(ResultAction::SelfloopResult { markdown: markdown(iteration) }),
            error: None,
            metrics: ResultMetrics { latency_ms: 900, ..Default::default() },
            claim_token: None,
        };
        assert_eq!(
            handle_result(&mesh.ctx, &result).unwrap(),
            SyncOutcome::Applied(JobStatus::Completed)
        );

        if iteration == 3 {
            break;
        }
        iteration += 1;
    }

    // After iteration 3 the task is complete and nothing else is pending.
    assert_eq!(
        mesh.ctx.store.get_task(&task.id).unwrap().status,
        TaskStatus::Completed
    );
    assert!(mesh.ctx.store.list_pending_jobs_sorted().unwrap().is_empty());

    // History accumulated across iterations 1 and 2 into iteration 3's job.
    let jobs = mesh.ctx.store.list_jobs_by_task(&task.id).unwrap();
    assert_eq!(jobs.len(), 3);
    let last = jobs.iter().max_by_key(|j| j.depth).unwrap();
    let state: LoopState = serde_json::from_value(last.payload.params["loop"].clone()).unwrap();
    assert_eq!(state.history.len(), 2);

    // The decision-trace tree deepens with the chain.
    let forest = mesh.ctx.why.trace_tree(&trace_id).unwrap();
    assert_eq!(forest.len(), 1, "one root for the whole loop");
    assert!(forest[0].depth() >= 3, "tree depth {} too shallow", forest[0].depth());
}

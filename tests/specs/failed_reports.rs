// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scenario: the core is down when a worker finishes; the result is
//! spooled and replayed once the core returns.

use super::prelude::*;
use sheratan_core::TraceResultStatus;
use sheratan_queue::FailedReports;

#[tokio::test]
async fn spooled_result_is_replayed_when_the_core_returns() {
    let mesh = Mesh::new();
    std::fs::write(mesh.dir.path().join("notes.txt"), "offline delivery").unwrap();

    mesh.register_worker("w-1", &[JobKind::ReadFile]);
    let job = mesh.seed_job(JobKind::ReadFile, serde_json::json!({"path": "notes.txt"}));
    assert_eq!(dispatch_once(&mesh.ctx).await.unwrap(), 1);

    // Worker executes while the core HTTP endpoint is unreachable; the
    // result lands in the outbox and the failed-report spool.
    mesh.worker_cycle("w-1").await;
    let spool = FailedReports::open(&mesh.dir.path().join("data/failed_reports")).unwrap();
    assert_eq!(spool.list().unwrap().len(), 1);
    assert_eq!(mesh.ctx.store.get_job(&job.id).unwrap().status, JobStatus::Dispatched);

    // The core comes back: bind its real HTTP API on an ephemeral port.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = sheratan_daemon::http::router(std::sync::Arc::clone(&mesh.ctx));
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    // One drain cycle from a worker pointed at the live core.
    let mut config = sheratan_worker::WorkerConfig::for_root(mesh.dir.path());
    config.worker_id = WorkerId::new("w-1");
    config.core_url = format!("http://{addr}");
    let worker = sheratan_worker::Worker::new(config).unwrap();
    worker.drain_failed_reports().await;

    // The spool is empty, the job is completed, and the journal carries
    // the result event.
    assert!(spool.list().unwrap().is_empty());
    assert_eq!(mesh.ctx.store.get_job(&job.id).unwrap().status, JobStatus::Completed);
    let entries = mesh.ctx.why.for_job(&job.id).unwrap();
    assert!(entries.iter().any(|e| e.result.status == TraceResultStatus::Success));
}

#[tokio::test]
async fn submit_endpoints_backpressure_when_inbox_is_full() {
    let mesh = Mesh::with_config(|c| c.max_inbox_depth = 1);
    // Fill the inbox to the limit.
    let blocker = mesh.seed_job(JobKind::ReadFile, serde_json::json!({"path": "x"}));
    mesh.ctx.inbox.enqueue(&blocker).unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = sheratan_daemon::http::router(std::sync::Arc::clone(&mesh.ctx));
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    let client = reqwest::Client::new();
    let response = client
        .post(format!("http://{addr}/api/missions"))
        .json(&serde_json::json!({"title": "overload"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 503);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["ok"], false);

    // Draining the queue restores acceptance.
    mesh.ctx.inbox.remove_pending(&blocker.id).unwrap();
    let response = client
        .post(format!("http://{addr}/api/missions"))
        .json(&serde_json::json!({"title": "accepted"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 201);
}

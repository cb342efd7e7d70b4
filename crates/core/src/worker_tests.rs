// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn endpoint_serde_uses_file_queue_sentinel() {
    let fq = serde_json::to_string(&WorkerEndpoint::FileQueue).unwrap();
    assert_eq!(fq, "\"file-queue\"");
    let http: WorkerEndpoint = serde_json::from_str("\"http://localhost:9000\"").unwrap();
    assert_eq!(http, WorkerEndpoint::Http("http://localhost:9000".to_string()));
}

#[test]
fn first_observation_seeds_emas() {
    let mut w = WorkerRecord::builder().build();
    w.record_success(400, 2_000_000);
    assert_eq!(w.success_ema, 1.0);
    assert_eq!(w.latency_ema_ms, 400.0);
    assert_eq!(w.observations, 1);
}

#[test]
fn failure_depresses_success_ema_and_counts() {
    let mut w = WorkerRecord::builder().build();
    w.record_success(100, 2_000_000);
    let failures = w.record_failure(100, 2_000_100);
    assert_eq!(failures, 1);
    assert!(w.success_ema < 1.0);

    w.record_success(100, 2_000_200);
    assert_eq!(w.consecutive_failures, 0);
}

#[test]
fn cooldown_window_expires() {
    let mut w = WorkerRecord::builder().build();
    w.start_cooldown(1_000_000, 60_000);
    assert!(w.in_cooldown(1_030_000));
    assert!(!w.in_cooldown(1_060_000));
    assert_eq!(w.consecutive_failures, 0);
}

#[test]
fn online_tracks_heartbeat_freshness() {
    let mut w = WorkerRecord::builder().build();
    assert!(w.is_online(1_020_000, 30_000));
    assert!(!w.is_online(1_040_000, 30_000));
    w.heartbeat(1_040_000);
    assert!(w.is_online(1_060_000, 30_000));
}

#[test]
fn capability_lookup() {
    let w = WorkerRecord::builder()
        .capabilities(vec![Capability { kind: JobKind::LlmCall, cost_hint: 2.5 }])
        .build();
    assert!(w.supports(JobKind::LlmCall));
    assert!(!w.supports(JobKind::WriteFile));
    assert_eq!(w.cost_hint(JobKind::LlmCall), 2.5);
    assert_eq!(w.cost_hint(JobKind::WriteFile), 0.0);
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn registration(id: &str, kinds: &[JobKind]) -> Registration {
    Registration {
        worker_id: WorkerId::new(id),
        capabilities: kinds.iter().map(|&kind| Capability { kind, cost_hint: 0.0 }).collect(),
        endpoint: WorkerEndpoint::FileQueue,
        meta: HashMap::new(),
    }
}

#[test]
fn register_then_eligible() {
    let registry = WorkerRegistry::new(30_000);
    registry.register(registration("w-1", &[JobKind::ReadFile]), 1_000_000);

    let eligible = registry.eligible(JobKind::ReadFile, 1_010_000);
    assert_eq!(eligible.len(), 1);
    assert!(registry.eligible(JobKind::WriteFile, 1_010_000).is_empty());
}

#[test]
fn stale_heartbeat_disqualifies() {
    let registry = WorkerRegistry::new(30_000);
    registry.register(registration("w-1", &[JobKind::ReadFile]), 1_000_000);
    assert!(registry.eligible(JobKind::ReadFile, 1_040_000).is_empty());

    // Re-registration refreshes the heartbeat and keeps stats
    registry.record_success(&WorkerId::new("w-1"), 100, 1_000_500);
    registry.register(registration("w-1", &[JobKind::ReadFile]), 1_040_000);
    let w = registry.get(&WorkerId::new("w-1")).unwrap();
    assert_eq!(w.observations, 1);
    assert_eq!(registry.eligible(JobKind::ReadFile, 1_041_000).len(), 1);
}

#[test]
fn cooldown_after_threshold_failures() {
    let registry = WorkerRegistry::new(300_000);
    registry.register(registration("w-1", &[JobKind::ReadFile]), 1_000_000);

    let id = WorkerId::new("w-1");
    assert!(!registry.record_failure(&id, 50, 1_000_100, 3, 60_000));
    assert!(!registry.record_failure(&id, 50, 1_000_200, 3, 60_000));
    assert!(registry.record_failure(&id, 50, 1_000_300, 3, 60_000));

    assert!(registry.eligible(JobKind::ReadFile, 1_000_400).is_empty());
    // Past the window the worker returns
    assert_eq!(registry.eligible(JobKind::ReadFile, 1_061_000).len(), 1);
}

#[test]
fn success_resets_failure_streak() {
    let registry = WorkerRegistry::new(300_000);
    registry.register(registration("w-1", &[JobKind::ReadFile]), 1_000_000);
    let id = WorkerId::new("w-1");

    registry.record_failure(&id, 50, 1_000_100, 5, 60_000);
    registry.record_success(&id, 50, 1_000_200);
    let w = registry.get(&id).unwrap();
    assert_eq!(w.consecutive_failures, 0);
}

#[test]
fn prune_drops_silent_workers() {
    let registry = WorkerRegistry::new(30_000);
    registry.register(registration("w-old", &[JobKind::ReadFile]), 1_000_000);
    registry.register(registration("w-new", &[JobKind::ReadFile]), 4_000_000);

    let dropped = registry.prune(4_000_100, 3_600_000);
    assert_eq!(dropped, 0);
    let dropped = registry.prune(4_700_000, 3_600_000);
    assert_eq!(dropped, 1);
    assert!(registry.get(&WorkerId::new("w-old")).is_none());
    assert!(registry.get(&WorkerId::new("w-new")).is_some());
}

#[test]
fn deregister_removes_worker() {
    let registry = WorkerRegistry::new(30_000);
    registry.register(registration("w-1", &[JobKind::ReadFile]), 1_000_000);
    assert!(registry.deregister(&WorkerId::new("w-1")));
    assert!(!registry.deregister(&WorkerId::new("w-1")));
    assert!(registry.list().is_empty());
}

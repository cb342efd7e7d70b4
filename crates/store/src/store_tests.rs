// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sheratan_core::{JobBuilder, JobKind};

struct Fixture {
    _dir: tempfile::TempDir,
    store: Store,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&dir.path().join("store"), &dir.path().join("failed_reports")).unwrap();
    Fixture { _dir: dir, store }
}

fn pending_job(id: &str, created_at_ms: u64) -> Job {
    JobBuilder::default().id(id).created_at_ms(created_at_ms).build()
}

#[test]
fn mission_round_trip() {
    let f = fixture();
    let mission = Mission::new(MissionId::new("m-1"), "Chart the caves", 1_000);
    f.store.put_mission(&mission).unwrap();

    let back = f.store.get_mission(&MissionId::new("m-1")).unwrap();
    assert_eq!(back, mission);

    let missing = f.store.get_mission(&MissionId::new("m-2"));
    assert!(matches!(missing, Err(StoreError::NotFound { entity: "mission", .. })));
}

#[test]
fn pending_jobs_sorted_by_priority_then_age() {
    let f = fixture();
    let mut old_low = pending_job("job-a", 100);
    old_low.priority = 0;
    let mut new_high = pending_job("job-b", 200);
    new_high.priority = 5;
    let mut old_high = pending_job("job-c", 100);
    old_high.priority = 5;
    for job in [&old_low, &new_high, &old_high] {
        f.store.put_job(job).unwrap();
    }

    let jobs = f.store.list_pending_jobs_sorted().unwrap();
    let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
    assert_eq!(ids, vec!["job-c", "job-b", "job-a"]);
}

#[test]
fn completed_jobs_are_not_pending_candidates() {
    let f = fixture();
    let mut job = pending_job("job-a", 100);
    f.store.put_job(&job).unwrap();
    job.transition(JobStatus::Dispatched).unwrap();
    f.store.put_job(&job).unwrap();

    assert!(f.store.list_pending_jobs_sorted().unwrap().is_empty());
}

#[test]
fn dependencies_completed_checks_every_dep() {
    let f = fixture();
    let dep_done = JobBuilder::default().id("dep-1").status(JobStatus::Completed).build();
    let dep_open = JobBuilder::default().id("dep-2").status(JobStatus::Running).build();
    f.store.put_job(&dep_done).unwrap();
    f.store.put_job(&dep_open).unwrap();

    let mut job = pending_job("job-a", 100);
    job.depends_on = vec![JobId::new("dep-1")];
    assert!(f.store.dependencies_completed(&job).unwrap());

    job.depends_on = vec![JobId::new("dep-1"), JobId::new("dep-2")];
    assert!(!f.store.dependencies_completed(&job).unwrap());

    // A dangling dependency is unsatisfied, not an error
    job.depends_on = vec![JobId::new("ghost")];
    assert!(!f.store.dependencies_completed(&job).unwrap());
}

#[test]
fn update_job_status_enforces_matrix() {
    let f = fixture();
    f.store.put_job(&pending_job("job-a", 100)).unwrap();

    let job = f
        .store
        .update_job_status(&JobId::new("job-a"), JobStatus::Dispatched, |j| {
            j.worker_id = Some("w-1".into());
        })
        .unwrap();
    assert_eq!(job.status, JobStatus::Dispatched);
    assert_eq!(job.worker_id.as_ref().map(|w| w.as_str()), Some("w-1"));

    // Terminal states are never re-entered
    f.store
        .update_job_status(&JobId::new("job-a"), JobStatus::Completed, |_| {})
        .unwrap();
    let err = f
        .store
        .update_job_status(&JobId::new("job-a"), JobStatus::Running, |_| {})
        .unwrap_err();
    assert!(matches!(err, StoreError::Transition(_)));
}

#[test]
fn corrupt_record_is_quarantined_not_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let quarantine = dir.path().join("failed_reports");
    let store = Store::open(&dir.path().join("store"), &quarantine).unwrap();
    store.put_job(&pending_job("job-a", 100)).unwrap();

    let path = dir.path().join("store/jobs/job-b.json");
    fs::write(&path, "{ not json").unwrap();

    let jobs = store.list_jobs().unwrap();
    assert_eq!(jobs.len(), 1);
    assert!(!path.exists());
    assert!(quarantine.join("corrupt_job-b.json").exists());
}

#[test]
fn open_cleans_orphan_tmp_files() {
    let dir = tempfile::tempdir().unwrap();
    let jobs_dir = dir.path().join("store/jobs");
    fs::create_dir_all(&jobs_dir).unwrap();
    fs::write(jobs_dir.join("job-x.tmp"), "partial").unwrap();

    let _store = Store::open(&dir.path().join("store"), &dir.path().join("fr")).unwrap();
    assert!(!jobs_dir.join("job-x.tmp").exists());
}

#[test]
fn purge_mission_removes_tasks_and_jobs() {
    let f = fixture();
    let mid = MissionId::new("m-1");
    f.store.put_mission(&Mission::new(mid.clone(), "m", 1)).unwrap();
    f.store
        .put_task(&Task::new(TaskId::new("t-1"), mid.clone(), "t", JobKind::ReadFile, 1))
        .unwrap();
    f.store
        .put_job(&JobBuilder::default().id("j-1").mission_id("m-1").created_at_ms(1).build())
        .unwrap();

    f.store.purge_mission(&mid).unwrap();
    assert!(f.store.get_mission(&mid).is_err());
    assert!(f.store.get_task(&TaskId::new("t-1")).is_err());
    assert!(f.store.get_job(&JobId::new("j-1")).is_err());
}

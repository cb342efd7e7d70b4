// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::inbox::JobTicket;
use sheratan_core::JobBuilder;
use sheratan_store::write_json_atomic;

fn inbox() -> (tempfile::TempDir, Inbox) {
    let dir = tempfile::tempdir().unwrap();
    let inbox = Inbox::open(&dir.path().join("webrelay_out")).unwrap();
    (dir, inbox)
}

#[test]
fn expired_claim_is_requeued() {
    let (_dir, inbox) = inbox();
    let job = JobBuilder::default().id("job-1").build();
    inbox.enqueue(&job).unwrap();
    inbox.claim(&JobId::new("job-1"), &WorkerId::new("w-1"), 1_300_000).unwrap();

    let reaped = reap_expired(&inbox, 1_300_001, 300_000).unwrap();
    assert_eq!(reaped.len(), 1);
    assert_eq!(reaped[0].job_id, JobId::new("job-1"));
    assert_eq!(reaped[0].worker_id, Some(WorkerId::new("w-1")));

    // The job file is back and claimable by a second worker
    assert!(inbox.job_path(&JobId::new("job-1")).exists());
    let ticket = inbox
        .claim(&JobId::new("job-1"), &WorkerId::new("w-2"), 2_000_000)
        .unwrap()
        .unwrap();
    assert_eq!(ticket.claim.unwrap().worker_id, WorkerId::new("w-2"));
}

#[test]
fn live_lease_is_left_alone() {
    let (_dir, inbox) = inbox();
    let job = JobBuilder::default().id("job-1").build();
    inbox.enqueue(&job).unwrap();
    inbox.claim(&JobId::new("job-1"), &WorkerId::new("w-1"), 1_300_000).unwrap();

    let reaped = reap_expired(&inbox, 1_299_999, 300_000).unwrap();
    assert!(reaped.is_empty());
    assert!(inbox.claimed_path(&JobId::new("job-1")).exists());
}

#[test]
fn claim_without_metadata_falls_back_to_mtime() {
    let (_dir, inbox) = inbox();
    let job = JobBuilder::default().id("job-1").build();
    // Simulate a crash between rename and metadata write: a claimed file
    // with no claim block.
    let ticket = JobTicket { job, claim: None };
    write_json_atomic(&inbox.claimed_path(&JobId::new("job-1")), &ticket).unwrap();

    // With a zero default lease and a far-future now, the claim is stale.
    let reaped = reap_expired(&inbox, u64::MAX, 0).unwrap();
    assert_eq!(reaped.len(), 1);
    assert_eq!(reaped[0].worker_id, None);
    assert!(inbox.job_path(&JobId::new("job-1")).exists());
}

#[test]
fn empty_inbox_reaps_nothing() {
    let (_dir, inbox) = inbox();
    assert!(reap_expired(&inbox, 1_000_000, 300_000).unwrap().is_empty());
}

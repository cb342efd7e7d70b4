// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sheratan_store::read_all;

#[test]
fn append_and_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::new(&dir.path().join("ledger/ledger.jsonl"), Duration::from_millis(200));

    ledger.append(LedgerEvent::JobCreated { job_id: JobId::new("j-1") }, 100);
    ledger.append(
        LedgerEvent::JobCompleted {
            job_id: JobId::new("j-1"),
            worker_id: WorkerId::new("w-1"),
            latency_ms: 42,
            cost: 0.003,
            tokens: 150,
            score: 4.2,
        },
        200,
    );

    let entries: Vec<LedgerEntry> = read_all(ledger.path()).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].at_ms, 100);
    assert!(matches!(entries[1].event, LedgerEvent::JobCompleted { tokens: 150, .. }));
}

#[test]
fn event_tags_are_snake_case() {
    let entry = LedgerEntry {
        at_ms: 1,
        at: Utc.timestamp_millis_opt(1).single().unwrap(),
        event: LedgerEvent::LeaseReaped { job_id: JobId::new("j-1"), worker_id: None },
    };
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["event"], "lease_reaped");
    assert_eq!(json["at_ms"], 1);
}

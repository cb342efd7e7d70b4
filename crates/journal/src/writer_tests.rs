// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sheratan_core::{
    ActionMode, ActionType, Intent, JobId, TraceAction, TraceId, TraceResult, TraceState,
    TRACE_SCHEMA_VERSION,
};
use sheratan_store::read_all;

const TIMEOUT: Duration = Duration::from_millis(200);

fn journal(dir: &Path) -> DecisionJournal {
    DecisionJournal::open(&dir.join("logs"), dir, TIMEOUT).unwrap()
}

fn entry(node_id: &str) -> TraceEntry {
    TraceEntry {
        schema_version: TRACE_SCHEMA_VERSION,
        timestamp_ms: 1_000_000,
        trace_id: TraceId::new("trace-1"),
        node_id: node_id.to_string(),
        parent_node_id: None,
        build_id: "0.2.0".to_string(),
        job_id: Some(JobId::new("job-1")),
        intent: Intent::DispatchJob,
        depth: 0,
        state: TraceState::default(),
        action: TraceAction {
            action_id: "route:w-1".to_string(),
            action_type: ActionType::Route,
            mode: ActionMode::Execute,
            params: serde_json::json!({"api_key": "sk-secret", "prompt": "hi"}),
            select_score: 1.0,
            risk_gate: true,
        },
        result: TraceResult::pending(),
    }
}

#[test]
fn valid_entry_lands_in_main_log_redacted() {
    let dir = tempfile::tempdir().unwrap();
    let journal = journal(dir.path());

    let outcome = journal.append(&entry("node-1")).unwrap();
    assert_eq!(outcome, AppendOutcome::Written);

    let entries: Vec<TraceEntry> = read_all(journal.trace_path()).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].node_id, "node-1");
    // Secret fields in params are redacted before hitting disk
    assert_eq!(entries[0].action.params["api_key"], "<redacted>");
    assert_eq!(entries[0].action.params["prompt"], "hi");
}

#[test]
fn invalid_entry_goes_to_breach_log_only() {
    let dir = tempfile::tempdir().unwrap();
    let journal = journal(dir.path());

    let bad = serde_json::json!({"schema_version": 1, "intent": "dispatch_job"});
    let outcome = journal.append_value(bad, 42).unwrap();
    assert!(matches!(outcome, AppendOutcome::Breached(_)));

    let main: Vec<TraceEntry> = read_all(journal.trace_path()).unwrap();
    assert!(main.is_empty());

    let breaches: Vec<BreachRecord> =
        read_all(&dir.path().join("logs/decision_trace_breaches.jsonl")).unwrap();
    assert_eq!(breaches.len(), 1);
    assert_eq!(breaches[0].timestamp_ms, 42);
    assert!(breaches[0].violation_paths.iter().any(|p| p == "trace_id"));
    assert!(!breaches[0].raw_event_truncated.is_empty());
}

#[test]
fn artifacts_outside_whitelist_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let journal = journal(dir.path());

    let mut e = entry("node-1");
    e.result.artifacts = Some(vec![
        dir.path().join("artifacts/report.txt").display().to_string(),
        "/etc/shadow".to_string(),
    ]);
    journal.append(&e).unwrap();

    let entries: Vec<TraceEntry> = read_all(journal.trace_path()).unwrap();
    let artifacts = entries[0].result.artifacts.clone().unwrap();
    assert_eq!(artifacts, vec!["artifacts/report.txt".to_string()]);
}

#[test]
fn main_log_stays_consumable_after_breach() {
    let dir = tempfile::tempdir().unwrap();
    let journal = journal(dir.path());

    journal.append(&entry("node-1")).unwrap();
    journal.append_value(serde_json::json!("not an object"), 1).unwrap();
    journal.append(&entry("node-2")).unwrap();

    let entries: Vec<TraceEntry> = read_all(journal.trace_path()).unwrap();
    assert_eq!(entries.len(), 2);
}

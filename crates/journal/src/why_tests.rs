// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::writer::DecisionJournal;
use sheratan_core::{
    ActionMode, ActionType, TraceAction, TraceMetrics, TraceResult, TraceState,
    TRACE_SCHEMA_VERSION,
};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_millis(200);

struct Fixture {
    _dir: tempfile::TempDir,
    journal: DecisionJournal,
    why: WhyApi,
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let journal = DecisionJournal::open(&dir.path().join("logs"), dir.path(), TIMEOUT).unwrap();
    let why = WhyApi::new(journal.trace_path());
    Fixture { _dir: dir, journal, why }
}

fn entry(node_id: &str, ts: u64) -> TraceEntry {
    TraceEntry {
        schema_version: TRACE_SCHEMA_VERSION,
        timestamp_ms: ts,
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
            params: serde_json::Value::Null,
            select_score: 1.0,
            risk_gate: true,
        },
        result: TraceResult::pending(),
    }
}

fn resolved(node_id: &str, ts: u64, success: bool, score: f64) -> TraceEntry {
    let mut e = entry(node_id, ts);
    e.result = TraceResult {
        status: if success { TraceResultStatus::Success } else { TraceResultStatus::Failed },
        metrics: TraceMetrics::default(),
        score,
        error: if success { None } else { Some("timeout".to_string()) },
        artifacts: None,
        determinism: None,
    };
    e
}

#[test]
fn latest_filters_by_intent() {
    let f = fixture();
    f.journal.append(&entry("n-1", 100)).unwrap();
    let mut llm = entry("n-2", 200);
    llm.intent = Intent::RouteLlmCall;
    f.journal.append(&llm).unwrap();

    let any = f.why.latest(None).unwrap().unwrap();
    assert_eq!(any.node_id, "n-2");

    let dispatch = f.why.latest(Some(Intent::DispatchJob)).unwrap().unwrap();
    assert_eq!(dispatch.node_id, "n-1");

    assert!(f.why.latest(Some(Intent::RecoverFailure)).unwrap().is_none());
}

#[test]
fn trace_tree_rebuilds_parent_links() {
    let f = fixture();
    f.journal.append(&entry("root", 100)).unwrap();
    let mut child = entry("child", 200);
    child.parent_node_id = Some("root".to_string());
    child.depth = 1;
    f.journal.append(&child).unwrap();
    let mut grandchild = entry("grandchild", 300);
    grandchild.parent_node_id = Some("child".to_string());
    grandchild.depth = 2;
    f.journal.append(&grandchild).unwrap();

    let forest = f.why.trace_tree(&TraceId::new("trace-1")).unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].entry.node_id, "root");
    assert_eq!(forest[0].children[0].entry.node_id, "child");
    assert_eq!(forest[0].depth(), 3);
}

#[test]
fn dangling_parent_becomes_root() {
    let f = fixture();
    let mut orphan = entry("orphan", 100);
    orphan.parent_node_id = Some("vanished".to_string());
    f.journal.append(&orphan).unwrap();

    let forest = f.why.trace_tree(&TraceId::new("trace-1")).unwrap();
    assert_eq!(forest.len(), 1);
    assert_eq!(forest[0].entry.node_id, "orphan");
}

#[test]
fn for_job_returns_only_matching_entries() {
    let f = fixture();
    f.journal.append(&entry("n-1", 100)).unwrap();
    let mut other = entry("n-2", 200);
    other.job_id = Some(JobId::new("job-2"));
    f.journal.append(&other).unwrap();

    let entries = f.why.for_job(&JobId::new("job-1")).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].node_id, "n-1");
}

#[test]
fn stats_aggregate_resolved_entries() {
    let f = fixture();
    // Pending entries are excluded from the aggregates
    f.journal.append(&entry("pending", 100)).unwrap();
    f.journal.append(&resolved("s-1", 200, true, 4.0)).unwrap();
    f.journal.append(&resolved("s-2", 300, true, 2.0)).unwrap();
    f.journal.append(&resolved("f-1", 400, false, -1.0)).unwrap();

    let stats = f.why.stats(Some(Intent::DispatchJob), 10_000, 1_000).unwrap();
    assert_eq!(stats.count, 3);
    assert!((stats.mean_score - 5.0 / 3.0).abs() < 1e-9);
    assert!((stats.success_rate - 2.0 / 3.0).abs() < 1e-9);
    assert_eq!(stats.top_actions[0].action_id, "route:w-1");
    assert_eq!(stats.failure_codes, vec![("timeout".to_string(), 1)]);
}

#[test]
fn stats_window_excludes_old_entries() {
    let f = fixture();
    f.journal.append(&resolved("old", 100, true, 1.0)).unwrap();
    f.journal.append(&resolved("new", 9_500, true, 3.0)).unwrap();

    let stats = f.why.stats(None, 1_000, 10_000).unwrap();
    assert_eq!(stats.count, 1);
    assert_eq!(stats.mean_score, 3.0);
}

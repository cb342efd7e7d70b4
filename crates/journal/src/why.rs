// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only explain surface over the decision stream.
//!
//! For small volumes a tail scan of the log is enough; `latest` reads the
//! trailing bytes first and falls back to a full scan only when the tail
//! holds no match.

use crate::JournalError;
use serde::Serialize;
use sheratan_core::{Intent, JobId, TraceEntry, TraceId, TraceResultStatus};
use sheratan_store::{read_all, tail_lines};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// How much of the log tail `latest` scans before falling back.
const TAIL_SCAN_BYTES: u64 = 256 * 1024;

/// A reconstructed trace-tree node. The tree exists only at read time;
/// on disk there are just `parent_node_id` references.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TraceNode {
    pub entry: TraceEntry,
    pub children: Vec<TraceNode>,
}

impl TraceNode {
    /// Depth of this subtree (a single node is depth 1).
    pub fn depth(&self) -> u32 {
        1 + self.children.iter().map(TraceNode::depth).max().unwrap_or(0)
    }
}

/// Per-action aggregate in [`WhyStats`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionStat {
    pub action_id: String,
    pub count: u64,
    pub mean_score: f64,
}

/// Aggregates over a time window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WhyStats {
    pub count: u64,
    pub mean_score: f64,
    pub success_rate: f64,
    pub top_actions: Vec<ActionStat>,
    pub failure_codes: Vec<(String, u64)>,
    /// Mean score of the newer half minus the older half of the window;
    /// positive values mean decisions are improving.
    pub baseline_drift: f64,
}

/// Read model over `decision_trace.jsonl`.
pub struct WhyApi {
    trace_path: PathBuf,
}

impl WhyApi {
    pub fn new(trace_path: &Path) -> Self {
        Self { trace_path: trace_path.to_owned() }
    }

    /// Most recent entry, optionally filtered by intent.
    pub fn latest(&self, intent: Option<Intent>) -> Result<Option<TraceEntry>, JournalError> {
        let wanted = |e: &TraceEntry| intent.map(|i| e.intent == i).unwrap_or(true);

        let tail = tail_lines(&self.trace_path, TAIL_SCAN_BYTES)?;
        for line in tail.iter().rev() {
            if let Ok(entry) = serde_json::from_str::<TraceEntry>(line) {
                if wanted(&entry) {
                    return Ok(Some(entry));
                }
            }
        }

        // Tail had no match; the full log might (old intent, huge tail).
        let all: Vec<TraceEntry> = read_all(&self.trace_path)?;
        Ok(all.into_iter().rev().find(wanted))
    }

    /// Every entry of one trace, assembled into root nodes.
    pub fn trace_tree(&self, trace_id: &TraceId) -> Result<Vec<TraceNode>, JournalError> {
        let mut entries: Vec<TraceEntry> = read_all(&self.trace_path)?;
        entries.retain(|e| &e.trace_id == trace_id);
        entries.sort_by_key(|e| e.timestamp_ms);
        Ok(build_forest(entries))
    }

    /// Entries associated with one job, oldest first.
    pub fn for_job(&self, job_id: &JobId) -> Result<Vec<TraceEntry>, JournalError> {
        let mut entries: Vec<TraceEntry> = read_all(&self.trace_path)?;
        entries.retain(|e| e.job_id.as_ref() == Some(job_id));
        entries.sort_by_key(|e| e.timestamp_ms);
        Ok(entries)
    }

    /// Aggregates over `[now - window, now]`.
    pub fn stats(
        &self,
        intent: Option<Intent>,
        window_ms: u64,
        now_ms: u64,
    ) -> Result<WhyStats, JournalError> {
        let cutoff = now_ms.saturating_sub(window_ms);
        let mut entries: Vec<TraceEntry> = read_all(&self.trace_path)?;
        entries.retain(|e| {
            e.timestamp_ms >= cutoff && intent.map(|i| e.intent == i).unwrap_or(true)
        });
        entries.sort_by_key(|e| e.timestamp_ms);

        // Only resolved executions count toward scores and rates.
        let resolved: Vec<&TraceEntry> = entries
            .iter()
            .filter(|e| {
                matches!(
                    e.result.status,
                    TraceResultStatus::Success | TraceResultStatus::Failed
                )
            })
            .collect();

        let count = resolved.len() as u64;
        let mean_score = mean(resolved.iter().map(|e| e.result.score));
        let successes = resolved
            .iter()
            .filter(|e| e.result.status == TraceResultStatus::Success)
            .count();
        let success_rate = if resolved.is_empty() {
            0.0
        } else {
            successes as f64 / resolved.len() as f64
        };

        let mut per_action: HashMap<&str, (u64, f64)> = HashMap::new();
        for e in &resolved {
            let slot = per_action.entry(e.action.action_id.as_str()).or_insert((0, 0.0));
            slot.0 += 1;
            slot.1 += e.result.score;
        }
        let mut top_actions: Vec<ActionStat> = per_action
            .into_iter()
            .map(|(action_id, (n, sum))| ActionStat {
                action_id: action_id.to_string(),
                count: n,
                mean_score: sum / n as f64,
            })
            .collect();
        top_actions.sort_by(|a, b| b.count.cmp(&a.count).then(a.action_id.cmp(&b.action_id)));
        top_actions.truncate(10);

        let mut failures: HashMap<String, u64> = HashMap::new();
        for e in &resolved {
            if e.result.status == TraceResultStatus::Failed {
                let code = e
                    .result
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown".to_string());
                *failures.entry(code).or_insert(0) += 1;
            }
        }
        let mut failure_codes: Vec<(String, u64)> = failures.into_iter().collect();
        failure_codes.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

        let half = resolved.len() / 2;
        let baseline_drift = if half == 0 {
            0.0
        } else {
            mean(resolved[half..].iter().map(|e| e.result.score))
                - mean(resolved[..half].iter().map(|e| e.result.score))
        };

        Ok(WhyStats {
            count,
            mean_score,
            success_rate,
            top_actions,
            failure_codes,
            baseline_drift,
        })
    }
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let mut sum = 0.0;
    let mut n = 0u64;
    for v in values {
        sum += v;
        n += 1;
    }
    if n == 0 {
        0.0
    } else {
        sum / n as f64
    }
}

/// Reconstruct parent/child structure from identifier references.
fn build_forest(entries: Vec<TraceEntry>) -> Vec<TraceNode> {
    let ids: Vec<String> = entries.iter().map(|e| e.node_id.clone()).collect();
    let mut children_of: HashMap<String, Vec<TraceEntry>> = HashMap::new();
    let mut roots: Vec<TraceEntry> = Vec::new();

    for entry in entries {
        match &entry.parent_node_id {
            Some(parent) if ids.contains(parent) => {
                children_of.entry(parent.clone()).or_default().push(entry);
            }
            _ => roots.push(entry),
        }
    }

    fn attach(entry: TraceEntry, children_of: &mut HashMap<String, Vec<TraceEntry>>) -> TraceNode {
        let children = children_of
            .remove(&entry.node_id)
            .unwrap_or_default()
            .into_iter()
            .map(|c| attach(c, children_of))
            .collect();
        TraceNode { entry, children }
    }

    roots
        .into_iter()
        .map(|r| attach(r, &mut children_of))
        .collect()
}

#[cfg(test)]
#[path = "why_tests.rs"]
mod tests;

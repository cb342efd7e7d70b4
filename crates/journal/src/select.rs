// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UCB-Light candidate selection with hard risk gates.

use serde::{Deserialize, Serialize};
use sheratan_core::WorkerId;

/// Exploration constant.
pub const EXPLORATION_C: f64 = 0.5;

/// Why a candidate entered the set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateRole {
    /// Historically most successful action for this intent.
    SafeBaseline,
    /// Highest current mean score with an open risk gate.
    BestPredicted,
    /// Low-visit action included when budget allows.
    Explore,
}

sheratan_core::display_str! {
    CandidateRole {
        SafeBaseline => "safe_baseline",
        BestPredicted => "best_predicted",
        Explore => "explore",
    }
}

/// One scored routing option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    /// Stable action key, e.g. `route:worker-7`.
    pub action_id: String,
    pub worker_id: WorkerId,
    pub role: CandidateRole,
    pub mean_score: f64,
    pub visits: u64,
    pub risk_gate: bool,
    pub risk_penalty: f64,
    /// Tie-break input: the worker's latency EMA.
    pub latency_ema_ms: f64,
}

/// A scored candidate as recorded in the decision trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: Candidate,
    pub select_score: f64,
}

/// Outcome of a selection round.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// A candidate survived the gates and won.
    Chosen {
        winner: ScoredCandidate,
        /// Every gated-out candidate, for the trace's alternatives list.
        alternatives: Vec<ScoredCandidate>,
        gated_out: Vec<Candidate>,
    },
    /// Risk gates emptied the set; the caller must SKIP or ABORT.
    AllGated { gated_out: Vec<Candidate> },
}

/// `select_score = mean + c·√(ln(parent_visits) / (visits + 1)) − risk_penalty`
pub fn select_score(candidate: &Candidate, parent_visits: u64, c: f64) -> f64 {
    let parent = parent_visits.max(1) as f64;
    let exploration = (parent.ln() / (candidate.visits as f64 + 1.0)).sqrt();
    candidate.mean_score + c * exploration - candidate.risk_penalty
}

/// Apply hard gates, score the survivors, and pick the winner.
///
/// Ties break by lower latency EMA, then lexicographic worker id, so the
/// same inputs always select the same candidate.
pub fn select(candidates: Vec<Candidate>, parent_visits: u64) -> Selection {
    let (open, gated_out): (Vec<_>, Vec<_>) =
        candidates.into_iter().partition(|c| c.risk_gate);

    if open.is_empty() {
        return Selection::AllGated { gated_out };
    }

    let mut scored: Vec<ScoredCandidate> = open
        .into_iter()
        .map(|candidate| {
            let select_score = select_score(&candidate, parent_visits, EXPLORATION_C);
            ScoredCandidate { candidate, select_score }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.select_score
            .partial_cmp(&a.select_score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| {
                a.candidate
                    .latency_ema_ms
                    .partial_cmp(&b.candidate.latency_ema_ms)
                    .unwrap_or(std::cmp::Ordering::Equal)
            })
            .then_with(|| a.candidate.worker_id.cmp(&b.candidate.worker_id))
    });

    let winner = scored.remove(0);
    Selection::Chosen { winner, alternatives: scored, gated_out }
}

#[cfg(test)]
#[path = "select_tests.rs"]
mod tests;

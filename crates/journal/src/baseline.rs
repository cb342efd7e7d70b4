// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rolling p50/p95 latency and cost baselines per intent.

use parking_lot::Mutex;
use sheratan_core::{norm, Intent};
use std::collections::{HashMap, VecDeque};

/// Bounded window of recent observations for one intent.
#[derive(Debug, Default)]
struct Window {
    latency_ms: VecDeque<f64>,
    cost: VecDeque<f64>,
}

/// Rolling baselines used to normalize latency and cost into [0,1]
/// before scoring.
pub struct BaselineTracker {
    window_n: usize,
    windows: Mutex<HashMap<Intent, Window>>,
}

impl BaselineTracker {
    pub fn new(window_n: usize) -> Self {
        Self {
            window_n: window_n.max(1),
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Fold an observation into the intent's window.
    pub fn observe(&self, intent: Intent, latency_ms: f64, cost: f64) {
        let mut windows = self.windows.lock();
        let window = windows.entry(intent).or_default();
        push_bounded(&mut window.latency_ms, latency_ms, self.window_n);
        push_bounded(&mut window.cost, cost, self.window_n);
    }

    /// `(L_norm, C_norm)` for an observation against the current baselines.
    /// An empty window normalizes to zero (nothing to compare against yet).
    pub fn normalized(&self, intent: Intent, latency_ms: f64, cost: f64) -> (f64, f64) {
        let windows = self.windows.lock();
        match windows.get(&intent) {
            Some(window) => (
                normalize(&window.latency_ms, latency_ms),
                normalize(&window.cost, cost),
            ),
            None => (0.0, 0.0),
        }
    }

    /// `(p50, p95)` of latency for an intent, for the stats surface.
    pub fn latency_percentiles(&self, intent: Intent) -> Option<(f64, f64)> {
        let windows = self.windows.lock();
        let window = windows.get(&intent)?;
        if window.latency_ms.is_empty() {
            return None;
        }
        Some((percentile(&window.latency_ms, 0.50), percentile(&window.latency_ms, 0.95)))
    }
}

fn push_bounded(buf: &mut VecDeque<f64>, v: f64, cap: usize) {
    buf.push_back(v);
    while buf.len() > cap {
        buf.pop_front();
    }
}

fn normalize(buf: &VecDeque<f64>, v: f64) -> f64 {
    if buf.is_empty() {
        return 0.0;
    }
    norm(v, percentile(buf, 0.50), percentile(buf, 0.95))
}

/// Nearest-rank percentile over an unsorted window.
fn percentile(buf: &VecDeque<f64>, q: f64) -> f64 {
    let mut sorted: Vec<f64> = buf.iter().copied().collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let rank = ((sorted.len() as f64 * q).ceil() as usize).clamp(1, sorted.len());
    sorted[rank - 1]
}

#[cfg(test)]
#[path = "baseline_tests.rs"]
mod tests;

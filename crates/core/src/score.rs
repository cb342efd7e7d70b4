// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sheratan Score v1: the linear ranking of completed actions.

use serde::{Deserialize, Serialize};

/// Weights for the six score terms. Overridable via `SCORE_WEIGHTS`
/// as a comma-separated `wS,wQ,wR,wL,wC,wK` list.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub success: f64,
    pub quality: f64,
    pub reliability: f64,
    pub latency: f64,
    pub cost: f64,
    pub risk: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            success: 3.0,
            quality: 1.5,
            reliability: 1.0,
            latency: 0.8,
            cost: 1.2,
            risk: 2.0,
        }
    }
}

impl ScoreWeights {
    /// Parse a `wS,wQ,wR,wL,wC,wK` override. Returns `None` on any
    /// malformed or missing component.
    pub fn parse(s: &str) -> Option<Self> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>().ok())
            .collect::<Option<Vec<_>>>()?;
        if parts.len() != 6 {
            return None;
        }
        Some(Self {
            success: parts[0],
            quality: parts[1],
            reliability: parts[2],
            latency: parts[3],
            cost: parts[4],
            risk: parts[5],
        })
    }

    /// `score = wS·S + wQ·Q + wR·R − wL·L_norm − wC·C_norm − wK·K`
    ///
    /// `s`, `q`, `r`, `k` are in [0,1]; `l_norm`/`c_norm` are already
    /// baseline-normalized via [`norm`].
    pub fn score(&self, s: f64, q: f64, r: f64, l_norm: f64, c_norm: f64, k: f64) -> f64 {
        self.success * s + self.quality * q + self.reliability * r
            - self.latency * l_norm
            - self.cost * c_norm
            - self.risk * k
    }
}

/// Baseline normalization: `(v − p50) / (p95 − p50)` clamped to [0,1].
///
/// Degenerate baselines (p95 ≤ p50) map values at or below p50 to 0 and
/// everything else to 1.
pub fn norm(v: f64, p50: f64, p95: f64) -> f64 {
    if p95 <= p50 {
        return if v <= p50 { 0.0 } else { 1.0 };
    }
    ((v - p50) / (p95 - p50)).clamp(0.0, 1.0)
}

#[cfg(test)]
#[path = "score_tests.rs"]
mod tests;

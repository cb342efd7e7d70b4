// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Risk policy: non-learnable gates applied before any scoring.

use crate::job::JobKind;
use serde::{Deserialize, Serialize};

/// Policy flags sourced from configuration (`RISK_POLICY`), never learned.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    /// When set, filesystem-mutating kinds are refused.
    #[serde(default)]
    pub readonly: bool,
    /// Remaining spend budget; LLM kinds are refused at or below zero.
    #[serde(default = "default_budget")]
    pub budget_remaining: f64,
}

fn default_budget() -> f64 {
    f64::INFINITY
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self { readonly: false, budget_remaining: f64::INFINITY }
    }
}

impl RiskPolicy {
    /// Parse the `RISK_POLICY` JSON object, e.g.
    /// `{"readonly": true, "budget_remaining": 12.5}`.
    pub fn parse(s: &str) -> Option<Self> {
        serde_json::from_str(s).ok()
    }

    /// Hard gate: may an action of this kind execute at all?
    pub fn allows(&self, kind: JobKind) -> bool {
        if self.readonly && kind.mutates_files() {
            return false;
        }
        if kind.is_llm() && self.budget_remaining <= 0.0 {
            return false;
        }
        true
    }
}

#[cfg(test)]
#[path = "policy_tests.rs"]
mod tests;

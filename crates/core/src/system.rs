// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Global operational state: the five-state model and its transition matrix.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Operational state of the system as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SystemState {
    Operational,
    Degraded,
    Reflective,
    Recovery,
    Paused,
}

crate::display_str! {
    SystemState {
        Operational => "OPERATIONAL",
        Degraded => "DEGRADED",
        Reflective => "REFLECTIVE",
        Recovery => "RECOVERY",
        Paused => "PAUSED",
    }
}

impl SystemState {
    /// States reachable from this one.
    pub fn allowed(self) -> &'static [SystemState] {
        use SystemState::*;
        match self {
            Paused => &[Recovery, Operational],
            Operational => &[Degraded, Reflective, Recovery, Paused],
            Degraded => &[Operational, Reflective, Recovery, Paused],
            Reflective => &[Operational, Degraded, Recovery, Paused],
            Recovery => &[Operational, Degraded, Paused],
        }
    }

    pub fn can_transition(self, to: SystemState) -> bool {
        self.allowed().contains(&to)
    }
}

/// Refused system transition.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("INVALID_TRANSITION: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: SystemState,
    pub to: SystemState,
}

/// One recorded state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Unique event id for this transition.
    pub event_id: String,
    pub from: SystemState,
    pub to: SystemState,
    pub reason: String,
    pub actor: String,
    pub at_ms: u64,
    #[serde(default)]
    pub meta: serde_json::Value,
}

/// Probe verdict for a single service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceStatus {
    Active,
    Down,
}

crate::display_str! {
    ServiceStatus {
        Active => "active",
        Down => "down",
    }
}

/// Health of one probed service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub name: String,
    pub critical: bool,
    pub status: ServiceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// The last computed service map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HealthReport {
    pub services: Vec<ServiceHealth>,
    pub checked_at_ms: u64,
}

impl HealthReport {
    /// Conservative decision rule: any `down` service degrades the system;
    /// criticality affects only the reported severity.
    pub fn decide(&self) -> SystemState {
        if self.services.iter().any(|s| s.status == ServiceStatus::Down) {
            SystemState::Degraded
        } else {
            SystemState::Operational
        }
    }

    pub fn severity(&self) -> &'static str {
        let any_down = self.services.iter().any(|s| s.status == ServiceStatus::Down);
        let critical_down = self
            .services
            .iter()
            .any(|s| s.status == ServiceStatus::Down && s.critical);
        if critical_down {
            "critical"
        } else if any_down {
            "minor"
        } else {
            "none"
        }
    }
}

/// Current snapshot schema version
pub const CURRENT_SNAPSHOT_VERSION: u32 = 1;

/// The persisted singleton: current state plus how it got there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemSnapshot {
    /// Schema version for migrations
    #[serde(rename = "v")]
    pub version: u32,
    pub state: SystemState,
    /// When the current state was entered.
    pub since_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition: Option<Transition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health: Option<HealthReport>,
}

impl SystemSnapshot {
    pub fn initial(now_ms: u64) -> Self {
        Self {
            version: CURRENT_SNAPSHOT_VERSION,
            state: SystemState::Paused,
            since_ms: now_ms,
            last_transition: None,
            health: None,
        }
    }

    /// Apply a transition, refusing anything outside the matrix.
    pub fn apply(&mut self, transition: Transition) -> Result<(), InvalidTransition> {
        if transition.from != self.state || !self.state.can_transition(transition.to) {
            return Err(InvalidTransition { from: self.state, to: transition.to });
        }
        self.state = transition.to;
        self.since_ms = transition.at_ms;
        self.last_transition = Some(transition);
        Ok(())
    }
}

#[cfg(test)]
#[path = "system_tests.rs"]
mod tests;

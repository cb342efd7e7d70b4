// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registered worker records: capabilities, liveness, and health statistics.

use crate::id::WorkerId;
use crate::job::JobKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Smoothing factor for the success-rate and latency EMAs.
const EMA_ALPHA: f64 = 0.2;

/// One executable kind a worker offers, with a relative cost hint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    pub kind: JobKind,
    #[serde(default)]
    pub cost_hint: f64,
}

/// How jobs reach the worker: the shared file queue, or an HTTP push URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum WorkerEndpoint {
    FileQueue,
    Http(String),
}

impl From<WorkerEndpoint> for String {
    fn from(e: WorkerEndpoint) -> Self {
        match e {
            WorkerEndpoint::FileQueue => "file-queue".to_string(),
            WorkerEndpoint::Http(url) => url,
        }
    }
}

impl From<String> for WorkerEndpoint {
    fn from(s: String) -> Self {
        if s == "file-queue" {
            WorkerEndpoint::FileQueue
        } else {
            WorkerEndpoint::Http(s)
        }
    }
}

/// A registered executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerRecord {
    pub id: WorkerId,
    pub capabilities: Vec<Capability>,
    pub endpoint: WorkerEndpoint,
    pub registered_at_ms: u64,
    pub last_seen_ms: u64,
    pub last_heartbeat_ms: u64,
    /// Running success-rate EMA in [0,1].
    pub success_ema: f64,
    /// Running latency EMA in milliseconds.
    pub latency_ema_ms: f64,
    pub consecutive_failures: u32,
    /// Epoch-ms until which the worker sits out dispatch. Zero when clear.
    #[serde(default)]
    pub cooldown_until_ms: u64,
    #[serde(default)]
    pub observations: u64,
    #[serde(default)]
    pub meta: HashMap<String, String>,
}

impl WorkerRecord {
    pub fn new(
        id: WorkerId,
        capabilities: Vec<Capability>,
        endpoint: WorkerEndpoint,
        now_ms: u64,
    ) -> Self {
        Self {
            id,
            capabilities,
            endpoint,
            registered_at_ms: now_ms,
            last_seen_ms: now_ms,
            last_heartbeat_ms: now_ms,
            success_ema: 1.0,
            latency_ema_ms: 0.0,
            consecutive_failures: 0,
            cooldown_until_ms: 0,
            observations: 0,
            meta: HashMap::new(),
        }
    }

    pub fn supports(&self, kind: JobKind) -> bool {
        self.capabilities.iter().any(|c| c.kind == kind)
    }

    pub fn cost_hint(&self, kind: JobKind) -> f64 {
        self.capabilities
            .iter()
            .find(|c| c.kind == kind)
            .map(|c| c.cost_hint)
            .unwrap_or(0.0)
    }

    /// A worker is online while its heartbeat is fresher than the timeout.
    pub fn is_online(&self, now_ms: u64, heartbeat_timeout_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_heartbeat_ms) <= heartbeat_timeout_ms
    }

    pub fn in_cooldown(&self, now_ms: u64) -> bool {
        now_ms < self.cooldown_until_ms
    }

    /// Record a successful execution: refresh liveness, clear the failure
    /// streak, and fold the observation into both EMAs.
    pub fn record_success(&mut self, latency_ms: u64, now_ms: u64) {
        self.last_seen_ms = now_ms;
        self.consecutive_failures = 0;
        self.fold(1.0, latency_ms as f64);
    }

    /// Record a failed execution. Returns the new consecutive-failure count.
    pub fn record_failure(&mut self, latency_ms: u64, now_ms: u64) -> u32 {
        self.last_seen_ms = now_ms;
        self.consecutive_failures += 1;
        self.fold(0.0, latency_ms as f64);
        self.consecutive_failures
    }

    /// Put the worker into cooldown for the given window.
    pub fn start_cooldown(&mut self, now_ms: u64, window_ms: u64) {
        self.cooldown_until_ms = now_ms + window_ms;
        self.consecutive_failures = 0;
    }

    pub fn heartbeat(&mut self, now_ms: u64) {
        self.last_heartbeat_ms = now_ms;
        self.last_seen_ms = now_ms;
    }

    fn fold(&mut self, success: f64, latency_ms: f64) {
        if self.observations == 0 {
            self.success_ema = success;
            self.latency_ema_ms = latency_ms;
        } else {
            self.success_ema = EMA_ALPHA * success + (1.0 - EMA_ALPHA) * self.success_ema;
            self.latency_ema_ms = EMA_ALPHA * latency_ms + (1.0 - EMA_ALPHA) * self.latency_ema_ms;
        }
        self.observations += 1;
    }
}

crate::builder! {
    pub struct WorkerRecordBuilder => WorkerRecord {
        into {
            id: WorkerId = "worker-1",
        }
        set {
            capabilities: Vec<Capability> = vec![
                Capability { kind: JobKind::ReadFile, cost_hint: 0.0 },
                Capability { kind: JobKind::ListFiles, cost_hint: 0.0 },
            ],
            endpoint: WorkerEndpoint = WorkerEndpoint::FileQueue,
            registered_at_ms: u64 = 1_000_000,
            last_seen_ms: u64 = 1_000_000,
            last_heartbeat_ms: u64 = 1_000_000,
            success_ema: f64 = 1.0,
            latency_ema_ms: f64 = 0.0,
            consecutive_failures: u32 = 0,
            cooldown_until_ms: u64 = 0,
            observations: u64 = 0,
            meta: HashMap<String, String> = HashMap::new(),
        }
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;

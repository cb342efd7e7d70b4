// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory worker registry.
//!
//! Rebuilt from re-registrations after a restart; the mesh endpoint is the
//! single write path. Health statistics live here and feed both candidate
//! filtering and UCB tie-breaking.

use parking_lot::Mutex;
use serde::Deserialize;
use sheratan_core::{Capability, JobKind, WorkerEndpoint, WorkerId, WorkerRecord};
use std::collections::HashMap;
use tracing::info;

/// Registration payload accepted by `POST /api/mesh/workers/register`.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub worker_id: WorkerId,
    pub capabilities: Vec<Capability>,
    #[serde(default = "default_endpoint")]
    pub endpoint: WorkerEndpoint,
    #[serde(default)]
    pub meta: HashMap<String, String>,
}

fn default_endpoint() -> WorkerEndpoint {
    WorkerEndpoint::FileQueue
}

/// Registry of live workers.
pub struct WorkerRegistry {
    heartbeat_timeout_ms: u64,
    workers: Mutex<HashMap<WorkerId, WorkerRecord>>,
}

impl WorkerRegistry {
    pub fn new(heartbeat_timeout_ms: u64) -> Self {
        Self {
            heartbeat_timeout_ms,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Register a new worker or refresh an existing one. Re-registration
    /// doubles as a heartbeat and may update capabilities and endpoint;
    /// health statistics survive.
    pub fn register(&self, reg: Registration, now_ms: u64) -> WorkerRecord {
        let mut workers = self.workers.lock();
        let record = workers
            .entry(reg.worker_id.clone())
            .and_modify(|w| {
                w.capabilities = reg.capabilities.clone();
                w.endpoint = reg.endpoint.clone();
                w.meta = reg.meta.clone();
                w.heartbeat(now_ms);
            })
            .or_insert_with(|| {
                info!(worker_id = %reg.worker_id, "worker registered");
                let mut w = WorkerRecord::new(
                    reg.worker_id.clone(),
                    reg.capabilities.clone(),
                    reg.endpoint.clone(),
                    now_ms,
                );
                w.meta = reg.meta.clone();
                w
            });
        record.clone()
    }

    pub fn deregister(&self, id: &WorkerId) -> bool {
        self.workers.lock().remove(id).is_some()
    }

    pub fn get(&self, id: &WorkerId) -> Option<WorkerRecord> {
        self.workers.lock().get(id).cloned()
    }

    pub fn list(&self) -> Vec<WorkerRecord> {
        let mut all: Vec<WorkerRecord> = self.workers.lock().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Workers able to take a job of this kind right now: capability
    /// matches, heartbeat fresh, not cooling down.
    pub fn eligible(&self, kind: JobKind, now_ms: u64) -> Vec<WorkerRecord> {
        let mut out: Vec<WorkerRecord> = self
            .workers
            .lock()
            .values()
            .filter(|w| {
                w.supports(kind)
                    && w.is_online(now_ms, self.heartbeat_timeout_ms)
                    && !w.in_cooldown(now_ms)
            })
            .cloned()
            .collect();
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out
    }

    /// Fold a successful execution into the worker's statistics.
    pub fn record_success(&self, id: &WorkerId, latency_ms: u64, now_ms: u64) {
        if let Some(w) = self.workers.lock().get_mut(id) {
            w.record_success(latency_ms, now_ms);
        }
    }

    /// Fold a failure. Once the consecutive-failure threshold is crossed the
    /// worker enters cooldown for `cooldown_ms`; returns true when that
    /// happened so the caller can log it.
    pub fn record_failure(
        &self,
        id: &WorkerId,
        latency_ms: u64,
        now_ms: u64,
        threshold: u32,
        cooldown_ms: u64,
    ) -> bool {
        let mut workers = self.workers.lock();
        let Some(w) = workers.get_mut(id) else {
            return false;
        };
        let failures = w.record_failure(latency_ms, now_ms);
        if failures >= threshold {
            w.start_cooldown(now_ms, cooldown_ms);
            return true;
        }
        false
    }

    /// Drop workers silent for longer than `silence_ms`.
    pub fn prune(&self, now_ms: u64, silence_ms: u64) -> usize {
        let mut workers = self.workers.lock();
        let before = workers.len();
        workers.retain(|_, w| now_ms.saturating_sub(w.last_seen_ms) <= silence_ms);
        before - workers.len()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The operational state machine: snapshot persistence, transition log,
//! and health-driven transitions.
//!
//! Multiple writers (startup, periodic probe, API) may race; every
//! snapshot write and log append happens under the advisory file lock.
//! Readers take no lock and tolerate a momentarily stale snapshot.

use sheratan_core::{
    HealthReport, InvalidTransition, SystemSnapshot, SystemState, Transition,
};
use sheratan_store::{append_locked, last_valid, write_json_atomic, FileLock, JsonlError, LockError};
use parking_lot::Mutex;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Errors that can occur in state machine operations.
#[derive(Debug, Error)]
pub enum StateMachineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Invalid(#[from] InvalidTransition),
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error(transparent)]
    Jsonl(#[from] JsonlError),
}

/// Singleton tracking the global operational state.
pub struct StateMachine {
    snapshot_path: PathBuf,
    transitions_path: PathBuf,
    breach_path: PathBuf,
    lock_timeout: Duration,
    current: Mutex<SystemSnapshot>,
}

impl StateMachine {
    /// Load state from disk.
    ///
    /// Recovery order: parse the snapshot; on failure rotate it to `.bak`
    /// and rebuild from the last valid transition line; if that also
    /// fails, initialize to `PAUSED`.
    pub fn load(
        snapshot_path: &Path,
        transitions_path: &Path,
        lock_timeout: Duration,
        now_ms: u64,
    ) -> Result<Self, StateMachineError> {
        if let Some(parent) = snapshot_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if let Some(parent) = transitions_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let snapshot = match std::fs::read(snapshot_path) {
            Ok(bytes) => match serde_json::from_slice::<SystemSnapshot>(&bytes) {
                Ok(snapshot) => Some(snapshot),
                Err(e) => {
                    let bak = snapshot_path.with_extension("json.bak");
                    warn!(
                        path = %snapshot_path.display(),
                        bak = %bak.display(),
                        error = %e,
                        "corrupt state snapshot, rotating and rebuilding from transition log"
                    );
                    let _ = std::fs::rename(snapshot_path, &bak);
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let snapshot = match snapshot {
            Some(s) => s,
            None => match last_valid::<Transition>(transitions_path)? {
                Some(t) => {
                    info!(state = %t.to, "rebuilt system state from transition log");
                    SystemSnapshot {
                        version: sheratan_core::CURRENT_SNAPSHOT_VERSION,
                        state: t.to,
                        since_ms: t.at_ms,
                        last_transition: Some(t),
                        health: None,
                    }
                }
                None => SystemSnapshot::initial(now_ms),
            },
        };

        Ok(Self {
            snapshot_path: snapshot_path.to_owned(),
            transitions_path: transitions_path.to_owned(),
            breach_path: transitions_path.with_file_name("state_transitions_breaches.jsonl"),
            lock_timeout,
            current: Mutex::new(snapshot),
        })
    }

    /// Lock-free read of the current state.
    pub fn current(&self) -> SystemSnapshot {
        self.current.lock().clone()
    }

    pub fn state(&self) -> SystemState {
        self.current.lock().state
    }

    /// Apply a transition. Refused (with `INVALID_TRANSITION`) when outside
    /// the matrix; otherwise persisted to the snapshot and appended to the
    /// transition log, both under file locks.
    pub fn transition(
        &self,
        to: SystemState,
        reason: impl Into<String>,
        actor: impl Into<String>,
        meta: serde_json::Value,
        now_ms: u64,
    ) -> Result<Transition, StateMachineError> {
        // The in-memory mutex is held across both writes so a racing
        // transition cannot persist an older snapshot over a newer one.
        let mut current = self.current.lock();
        let transition = Transition {
            event_id: Uuid::new_v4().to_string(),
            from: current.state,
            to,
            reason: reason.into(),
            actor: actor.into(),
            at_ms: now_ms,
            meta,
        };
        current.apply(transition.clone())?;
        let snapshot = current.clone();
        self.persist_snapshot(&snapshot);
        self.append_transition(&transition);
        drop(current);
        info!(from = %transition.from, to = %transition.to, reason = %transition.reason, "state transition");
        Ok(transition)
    }

    /// Record a health report and, in the OPERATIONAL/DEGRADED pair, follow
    /// it. Other states are only ever left by explicit request.
    pub fn observe_health(
        &self,
        report: HealthReport,
        now_ms: u64,
    ) -> Result<Option<Transition>, StateMachineError> {
        let decided = report.decide();
        let severity = report.severity();
        let state = {
            let mut current = self.current.lock();
            current.health = Some(report);
            let snapshot = current.clone();
            self.persist_snapshot(&snapshot);
            snapshot.state
        };

        let should_move = matches!(
            (state, decided),
            (SystemState::Operational, SystemState::Degraded)
                | (SystemState::Degraded, SystemState::Operational)
        );
        if !should_move {
            return Ok(None);
        }
        let transition = self.transition(
            decided,
            format!("health probe: severity {severity}"),
            "health-probe",
            serde_json::Value::Null,
            now_ms,
        )?;
        Ok(Some(transition))
    }

    /// Snapshot write under the file lock, retried once on lock timeout.
    /// A second timeout drops the write and leaves an audit line; the
    /// in-memory state stays authoritative and the next write catches up.
    fn persist_snapshot(&self, snapshot: &SystemSnapshot) {
        for attempt in 0..2 {
            match FileLock::acquire(&self.snapshot_path, self.lock_timeout) {
                Ok(_guard) => {
                    if let Err(e) = write_json_atomic(&self.snapshot_path, snapshot) {
                        error!(error = %e, "snapshot write failed");
                    }
                    return;
                }
                Err(LockError::Timeout { .. }) if attempt == 0 => continue,
                Err(e) => {
                    self.audit_breach("snapshot_write_dropped", &e.to_string());
                    return;
                }
            }
        }
    }

    /// Transition-log append under the file lock with one retry.
    fn append_transition(&self, transition: &Transition) {
        for attempt in 0..2 {
            match append_locked(&self.transitions_path, transition, self.lock_timeout) {
                Ok(()) => return,
                Err(JsonlError::Lock(LockError::Timeout { .. })) if attempt == 0 => continue,
                Err(e) => {
                    self.audit_breach("transition_append_dropped", &e.to_string());
                    return;
                }
            }
        }
    }

    /// Best-effort lock-free audit line for dropped writes.
    fn audit_breach(&self, kind: &str, detail: &str) {
        error!(kind, detail, "state write dropped, auditing to breach log");
        let line = serde_json::json!({"kind": kind, "detail": detail});
        if let Ok(mut file) = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.breach_path)
        {
            let _ = writeln!(file, "{line}");
        }
    }
}

#[cfg(test)]
#[path = "state_machine_tests.rs"]
mod tests;

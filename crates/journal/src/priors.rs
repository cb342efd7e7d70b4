// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Learned priors per `(intent, action)` pair.
//!
//! Visits and mean scores feed UCB-Light selection; the `risk_gate` flag
//! is sourced from policy and never learned. The store is loaded from
//! `policies/priors.json` at startup and flushed in batches under the
//! file lock.

use crate::JournalError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sheratan_core::Intent;
use sheratan_store::{write_json_atomic, FileLock};
use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::warn;

/// Ring-buffer depth for recent scores.
const LAST_SCORES_CAP: usize = 20;

/// Flush after this many updates, or after `FLUSH_INTERVAL`.
const FLUSH_EVERY_UPDATES: u32 = 10;
const FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Statistics for one `(intent, action)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prior {
    pub visits: u64,
    pub mean_score: f64,
    #[serde(default)]
    pub last_scores: VecDeque<f64>,
    /// Non-learnable policy flag. `false` removes the action from every
    /// candidate set before scoring.
    #[serde(default = "default_gate")]
    pub risk_gate: bool,
}

fn default_gate() -> bool {
    true
}

impl Default for Prior {
    fn default() -> Self {
        Self {
            visits: 0,
            mean_score: 0.0,
            last_scores: VecDeque::new(),
            risk_gate: true,
        }
    }
}

/// Persisted document shape.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PriorsDoc {
    #[serde(default)]
    priors: HashMap<String, Prior>,
}

struct Inner {
    map: HashMap<String, Prior>,
    pending_updates: u32,
    last_flush: Instant,
}

/// Thread-safe priors store with batched flushing.
pub struct PriorsStore {
    path: PathBuf,
    lock_timeout: Duration,
    inner: Mutex<Inner>,
}

/// Map key for one `(intent, action)` pair.
pub fn prior_key(intent: Intent, action_id: &str) -> String {
    format!("{intent}|{action_id}")
}

impl PriorsStore {
    /// Load priors from disk; a missing file starts empty, an unreadable
    /// file is logged and starts empty (the journal is the recovery path).
    pub fn load(path: &Path, lock_timeout: Duration) -> Result<Self, JournalError> {
        let map = match fs::read(path) {
            Ok(bytes) => match serde_json::from_slice::<PriorsDoc>(&bytes) {
                Ok(doc) => doc.priors,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "unreadable priors, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: path.to_owned(),
            lock_timeout,
            inner: Mutex::new(Inner {
                map,
                pending_updates: 0,
                last_flush: Instant::now(),
            }),
        })
    }

    /// Snapshot of one prior (defaults when unseen).
    pub fn get(&self, intent: Intent, action_id: &str) -> Prior {
        let inner = self.inner.lock();
        inner
            .map
            .get(&prior_key(intent, action_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Total visits across every action of an intent. Used as
    /// `parent_visits` in UCB-Light (floored at 1).
    pub fn parent_visits(&self, intent: Intent) -> u64 {
        let prefix = format!("{intent}|");
        let inner = self.inner.lock();
        inner
            .map
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(_, p)| p.visits)
            .sum::<u64>()
            .max(1)
    }

    /// Fold an observed score into the prior:
    /// `visits += 1; mean += (score - mean) / visits`, ring-buffered.
    ///
    /// Called only for `mode = execute` observations. Failed executions are
    /// recorded too, so their low scores depress the mean.
    pub fn record(&self, intent: Intent, action_id: &str, score: f64) {
        let mut inner = self.inner.lock();
        let prior = inner.map.entry(prior_key(intent, action_id)).or_default();
        prior.visits += 1;
        prior.mean_score += (score - prior.mean_score) / prior.visits as f64;
        prior.last_scores.push_back(score);
        while prior.last_scores.len() > LAST_SCORES_CAP {
            prior.last_scores.pop_front();
        }
        inner.pending_updates += 1;
    }

    /// Set the policy gate for an action.
    pub fn set_risk_gate(&self, intent: Intent, action_id: &str, gate: bool) {
        let mut inner = self.inner.lock();
        let prior = inner.map.entry(prior_key(intent, action_id)).or_default();
        prior.risk_gate = gate;
        inner.pending_updates += 1;
    }

    /// Flush to disk when the batch threshold or interval is reached.
    pub fn flush_if_due(&self) -> Result<(), JournalError> {
        let due = {
            let inner = self.inner.lock();
            inner.pending_updates >= FLUSH_EVERY_UPDATES
                || (inner.pending_updates > 0 && inner.last_flush.elapsed() >= FLUSH_INTERVAL)
        };
        if due {
            self.flush()?;
        }
        Ok(())
    }

    /// Unconditional flush under the file lock.
    pub fn flush(&self) -> Result<(), JournalError> {
        let doc = {
            let inner = self.inner.lock();
            PriorsDoc { priors: inner.map.clone() }
        };
        let _guard = FileLock::acquire(&self.path, self.lock_timeout)?;
        write_json_atomic(&self.path, &doc)?;
        let mut inner = self.inner.lock();
        inner.pending_updates = 0;
        inner.last_flush = Instant::now();
        Ok(())
    }
}

#[cfg(test)]
#[path = "priors_tests.rs"]
mod tests;

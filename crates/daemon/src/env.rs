// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use sheratan_core::{RiskPolicy, ScoreWeights};
use std::path::PathBuf;
use std::time::Duration;

/// Build identifier stamped into every decision-trace entry.
pub const BUILD_ID: &str = env!("CARGO_PKG_VERSION");

/// Resolved daemon configuration. Every knob comes from an environment
/// variable with a sensible default.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory all relative paths hang off (`SHERATAN_ROOT`).
    pub root: PathBuf,
    /// HTTP port of the core API (`CORE_PORT`).
    pub core_port: u16,
    /// LLM bridge base URL (`LLM_BRIDGE_URL`), required for LLM kinds.
    pub llm_bridge_url: Option<String>,
    /// Queue inbox directory (`QUEUE_INBOX`).
    pub queue_inbox: PathBuf,
    /// Queue outbox directory (`QUEUE_OUTBOX`).
    pub queue_outbox: PathBuf,
    /// Failed-report spool (`FAILED_REPORTS`).
    pub failed_reports: PathBuf,
    /// Claim lease (`LEASE_DURATION_SEC`).
    pub lease_duration: Duration,
    /// Reaper scan interval (`REAPER_INTERVAL_SEC`).
    pub reaper_interval: Duration,
    /// Health probe interval (`HEALTH_POLL_SEC`).
    pub health_poll: Duration,
    /// Dispatcher poll interval (`DISPATCH_POLL_MS`).
    pub dispatch_poll: Duration,
    /// Inbox depth beyond which submitters get 503 (`MAX_INBOX_DEPTH`).
    pub max_inbox_depth: usize,
    /// Re-dispatch bound before `max_retries_exceeded` (`MAX_RETRIES`).
    pub max_retries: u32,
    /// Consecutive failures before cooldown (`WORKER_COOLDOWN_FAILURES`).
    pub cooldown_failures: u32,
    /// Cooldown window (`WORKER_COOLDOWN_SEC`).
    pub cooldown: Duration,
    /// Heartbeat staleness bound (`WORKER_HEARTBEAT_TIMEOUT_SEC`).
    pub heartbeat_timeout: Duration,
    /// Score weight override (`SCORE_WEIGHTS`).
    pub score_weights: ScoreWeights,
    /// Baseline window size (`BASELINE_WINDOW_N`).
    pub baseline_window_n: usize,
    /// Risk policy (`RISK_POLICY`).
    pub risk_policy: RiskPolicy,
    /// File-lock acquisition bound for shared files.
    pub lock_timeout: Duration,
}

impl Config {
    /// Read the full configuration from the environment.
    pub fn from_env() -> Self {
        let root = PathBuf::from(var_or("SHERATAN_ROOT", "."));
        Self::for_root_from_env(root)
    }

    /// Defaults rooted at an explicit directory (tests use a tempdir).
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            core_port: 8001,
            llm_bridge_url: None,
            queue_inbox: root.join("data/webrelay_out"),
            queue_outbox: root.join("data/webrelay_in"),
            failed_reports: root.join("data/failed_reports"),
            lease_duration: Duration::from_secs(300),
            reaper_interval: Duration::from_secs(60),
            health_poll: Duration::from_secs(30),
            dispatch_poll: Duration::from_millis(250),
            max_inbox_depth: 1000,
            max_retries: 3,
            cooldown_failures: 5,
            cooldown: Duration::from_secs(60),
            heartbeat_timeout: Duration::from_secs(90),
            score_weights: ScoreWeights::default(),
            baseline_window_n: 100,
            risk_policy: RiskPolicy::default(),
            lock_timeout: Duration::from_secs(5),
            root,
        }
    }

    fn for_root_from_env(root: PathBuf) -> Self {
        let defaults = Self::for_root(root.clone());
        Self {
            core_port: parse_var("CORE_PORT").unwrap_or(defaults.core_port),
            llm_bridge_url: std::env::var("LLM_BRIDGE_URL").ok().filter(|s| !s.is_empty()),
            queue_inbox: path_var("QUEUE_INBOX", &root).unwrap_or(defaults.queue_inbox),
            queue_outbox: path_var("QUEUE_OUTBOX", &root).unwrap_or(defaults.queue_outbox),
            failed_reports: path_var("FAILED_REPORTS", &root).unwrap_or(defaults.failed_reports),
            lease_duration: secs_var("LEASE_DURATION_SEC").unwrap_or(defaults.lease_duration),
            reaper_interval: secs_var("REAPER_INTERVAL_SEC").unwrap_or(defaults.reaper_interval),
            health_poll: secs_var("HEALTH_POLL_SEC").unwrap_or(defaults.health_poll),
            dispatch_poll: parse_var("DISPATCH_POLL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.dispatch_poll),
            max_inbox_depth: parse_var("MAX_INBOX_DEPTH").unwrap_or(defaults.max_inbox_depth),
            max_retries: parse_var("MAX_RETRIES").unwrap_or(defaults.max_retries),
            cooldown_failures: parse_var("WORKER_COOLDOWN_FAILURES")
                .unwrap_or(defaults.cooldown_failures),
            cooldown: secs_var("WORKER_COOLDOWN_SEC").unwrap_or(defaults.cooldown),
            heartbeat_timeout: secs_var("WORKER_HEARTBEAT_TIMEOUT_SEC")
                .unwrap_or(defaults.heartbeat_timeout),
            score_weights: std::env::var("SCORE_WEIGHTS")
                .ok()
                .and_then(|s| ScoreWeights::parse(&s))
                .unwrap_or(defaults.score_weights),
            baseline_window_n: parse_var("BASELINE_WINDOW_N")
                .unwrap_or(defaults.baseline_window_n),
            risk_policy: std::env::var("RISK_POLICY")
                .ok()
                .and_then(|s| RiskPolicy::parse(&s))
                .unwrap_or(defaults.risk_policy),
            lock_timeout: defaults.lock_timeout,
            root,
        }
    }

    // -- derived on-disk layout --

    pub fn store_dir(&self) -> PathBuf {
        self.root.join("data/store")
    }

    pub fn snapshot_path(&self) -> PathBuf {
        self.root.join("runtime/system_state.json")
    }

    pub fn transitions_path(&self) -> PathBuf {
        self.root.join("logs/state_transitions.jsonl")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn priors_path(&self) -> PathBuf {
        self.root.join("policies/priors.json")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.root.join("ledger/ledger.jsonl")
    }

    pub fn pid_lock_path(&self) -> PathBuf {
        self.root.join("runtime/sheratand.pid")
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).ok().filter(|s| !s.is_empty()).unwrap_or_else(|| default.to_string())
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.parse::<T>().ok())
}

fn secs_var(name: &str) -> Option<Duration> {
    parse_var::<u64>(name).map(Duration::from_secs)
}

fn path_var(name: &str, root: &std::path::Path) -> Option<PathBuf> {
    std::env::var(name).ok().filter(|s| !s.is_empty()).map(|s| {
        let p = PathBuf::from(s);
        if p.is_absolute() {
            p
        } else {
            root.join(p)
        }
    })
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the worker crate.

use sheratan_core::{Capability, JobKind, WorkerId};
use std::path::PathBuf;
use std::time::Duration;

/// Resolved worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Stable identity (`WORKER_ID`).
    pub worker_id: WorkerId,
    /// Declared capabilities (`WORKER_CAPABILITIES`, comma-separated kinds).
    pub capabilities: Vec<Capability>,
    /// Core API base URL (`CORE_URL`).
    pub core_url: String,
    /// LLM bridge base URL (`LLM_BRIDGE_URL`); absent means LLM kinds fail
    /// validation locally.
    pub llm_bridge_url: Option<String>,
    /// Queue inbox to watch (`QUEUE_INBOX`).
    pub queue_inbox: PathBuf,
    /// Outbox for results (`QUEUE_OUTBOX`).
    pub queue_outbox: PathBuf,
    /// Spool for undeliverable reports (`FAILED_REPORTS`).
    pub failed_reports: PathBuf,
    /// Root prefix for file-kind execution (`WORKER_FS_ROOT`).
    pub fs_root: PathBuf,
    /// Claim lease length (`LEASE_DURATION_SEC`).
    pub lease_duration: Duration,
    /// Re-registration cadence, which doubles as the heartbeat.
    pub heartbeat_interval: Duration,
    /// LLM request timeout (`LLM_TIMEOUT_SEC`).
    pub llm_timeout: Duration,
    /// Failed-report drain cadence (`DRAIN_INTERVAL_SEC`).
    pub drain_interval: Duration,
}

/// Kinds a worker offers when `WORKER_CAPABILITIES` is unset.
const DEFAULT_KINDS: &[JobKind] = &[
    JobKind::ListFiles,
    JobKind::ReadFile,
    JobKind::WriteFile,
    JobKind::LlmCall,
    JobKind::AgentPlan,
    JobKind::Selfloop,
];

impl WorkerConfig {
    pub fn from_env() -> Self {
        let root = PathBuf::from(var_or("SHERATAN_ROOT", "."));
        let mut config = Self::for_root(root);
        if let Ok(id) = std::env::var("WORKER_ID") {
            if !id.is_empty() {
                config.worker_id = WorkerId::new(id);
            }
        }
        if let Ok(raw) = std::env::var("WORKER_CAPABILITIES") {
            if let Some(caps) = parse_capabilities(&raw) {
                config.capabilities = caps;
            }
        }
        config.core_url = var_or("CORE_URL", &config.core_url);
        config.llm_bridge_url = std::env::var("LLM_BRIDGE_URL").ok().filter(|s| !s.is_empty());
        let root = config.fs_root.clone();
        if let Some(p) = path_var("QUEUE_INBOX", &root) {
            config.queue_inbox = p;
        }
        if let Some(p) = path_var("QUEUE_OUTBOX", &root) {
            config.queue_outbox = p;
        }
        if let Some(p) = path_var("FAILED_REPORTS", &root) {
            config.failed_reports = p;
        }
        if let Ok(p) = std::env::var("WORKER_FS_ROOT") {
            if !p.is_empty() {
                config.fs_root = PathBuf::from(p);
            }
        }
        if let Some(d) = secs_var("LEASE_DURATION_SEC") {
            config.lease_duration = d;
            config.heartbeat_interval = d / 10;
        }
        if let Some(d) = secs_var("LLM_TIMEOUT_SEC") {
            config.llm_timeout = d;
        }
        if let Some(d) = secs_var("DRAIN_INTERVAL_SEC") {
            config.drain_interval = d;
        }
        config
    }

    /// Defaults rooted at an explicit directory (tests use a tempdir).
    pub fn for_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            worker_id: WorkerId::new(format!("worker-{}", std::process::id())),
            capabilities: DEFAULT_KINDS
                .iter()
                .map(|&kind| Capability { kind, cost_hint: 0.0 })
                .collect(),
            core_url: "http://127.0.0.1:8001".to_string(),
            llm_bridge_url: None,
            queue_inbox: root.join("data/webrelay_out"),
            queue_outbox: root.join("data/webrelay_in"),
            failed_reports: root.join("data/failed_reports"),
            fs_root: root.clone(),
            lease_duration: Duration::from_secs(300),
            heartbeat_interval: Duration::from_secs(30),
            llm_timeout: Duration::from_secs(120),
            drain_interval: Duration::from_secs(30),
        }
    }
}

/// Parse `read_file,list_files,...` into capabilities. Unknown kinds make
/// the whole list invalid so a typo cannot silently shrink a worker.
fn parse_capabilities(raw: &str) -> Option<Vec<Capability>> {
    let mut caps = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let kind: JobKind =
            serde_json::from_value(serde_json::Value::String(part.to_string())).ok()?;
        caps.push(Capability { kind, cost_hint: 0.0 });
    }
    if caps.is_empty() {
        None
    } else {
        Some(caps)
    }
}

fn var_or(name: &str, default: &str) -> String {
    std::env::var(name).ok().filter(|s| !s.is_empty()).unwrap_or_else(|| default.to_string())
}

fn secs_var(name: &str) -> Option<Duration> {
    std::env::var(name).ok().and_then(|s| s.parse::<u64>().ok()).map(Duration::from_secs)
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

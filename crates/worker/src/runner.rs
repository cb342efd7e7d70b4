// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The worker runtime: register, watch the inbox, claim, execute, report.

use crate::env::WorkerConfig;
use crate::executor::{ExecError, Executor};
use serde::Serialize;
use sheratan_core::{JobId, JobResult, ResultMetrics, WorkerId};
use sheratan_queue::{watcher, FailedReports, Inbox, JobTicket, Outbox, QueueError, JOB_SUFFIX};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Backoff cap for registration retries.
const REGISTER_BACKOFF_MAX: Duration = Duration::from_secs(30);

/// Errors that stop the worker from starting.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Registration body posted to the core mesh endpoint.
#[derive(Debug, Serialize)]
struct RegisterBody<'a> {
    worker_id: &'a WorkerId,
    capabilities: &'a [sheratan_core::Capability],
    status: &'a str,
    endpoint: &'a str,
    meta: serde_json::Map<String, serde_json::Value>,
}

/// A running worker process.
pub struct Worker {
    config: WorkerConfig,
    inbox: Inbox,
    outbox: Outbox,
    failed_reports: FailedReports,
    executor: Executor,
    client: reqwest::Client,
}

impl Worker {
    pub fn new(config: WorkerConfig) -> Result<Self, WorkerError> {
        let inbox = Inbox::open(&config.queue_inbox)?;
        let outbox = Outbox::open(&config.queue_outbox)?;
        let failed_reports = FailedReports::open(&config.failed_reports)?;
        let executor = Executor::new(&config);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Ok(Self { config, inbox, outbox, failed_reports, executor, client })
    }

    /// Main loop: register, then serve inbox pickups, heartbeats, and the
    /// failed-report drain until cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        self.register_with_retry(&shutdown).await;

        let mut rx = watcher::spawn(
            self.inbox.dir().to_owned(),
            JOB_SUFFIX,
            watcher::DEFAULT_DEBOUNCE,
            watcher::DEFAULT_POLL_INTERVAL,
        );
        let mut heartbeat = tokio::time::interval(self.config.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut drain = tokio::time::interval(self.config.drain_interval);
        drain.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                Some(path) = rx.recv() => {
                    let Some(job_id) = job_id_from_path(&path) else { continue };
                    if let Err(e) = self.pick_up(&job_id).await {
                        warn!(job_id = %job_id, error = %e, "pickup failed");
                    }
                }
                _ = heartbeat.tick() => {
                    // Re-registration doubles as the heartbeat.
                    if let Err(e) = self.register_once().await {
                        debug!(error = %e, "heartbeat registration failed");
                    }
                }
                _ = drain.tick() => {
                    self.drain_failed_reports().await;
                }
            }
        }
        info!(worker_id = %self.config.worker_id, "worker stopped");
    }

    /// Claim and process one job file. Losing the claim race is normal.
    pub async fn pick_up(&self, job_id: &JobId) -> Result<(), WorkerError> {
        let lease_until = epoch_ms() + self.config.lease_duration.as_millis() as u64;
        let Some(ticket) = self.inbox.claim(job_id, &self.config.worker_id, lease_until)? else {
            debug!(job_id = %job_id, "claim lost, another worker won");
            return Ok(());
        };
        info!(job_id = %job_id, "claimed");
        self.process(ticket).await
    }

    /// Execute a claimed job and report its result: outbox first (durable),
    /// claimed file removed after, HTTP sync best-effort with the
    /// failed-report spool as fallback.
    async fn process(&self, ticket: JobTicket) -> Result<(), WorkerError> {
        let job = &ticket.job;
        let claim_token = ticket.claim.as_ref().map(|c| c.claim_token.clone());
        let started = Instant::now();
        let outcome = self.executor.execute(job).await;
        let latency_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(action) => JobResult {
                job_id: job.id.clone(),
                worker_id: self.config.worker_id.clone(),
                ok: true,
                action: Some(action),
                error: None,
                metrics: ResultMetrics { latency_ms, ..Default::default() },
                claim_token,
            },
            Err(e) => {
                let reason = match &e {
                    ExecError::Validation(message) => format!("validation: {message}"),
                    other => other.to_string(),
                };
                JobResult {
                    job_id: job.id.clone(),
                    worker_id: self.config.worker_id.clone(),
                    ok: false,
                    action: None,
                    error: Some(reason),
                    metrics: ResultMetrics { latency_ms, ..Default::default() },
                    claim_token,
                }
            }
        };

        self.outbox.write_result(&result)?;
        self.inbox.remove_claimed(&job.id)?;

        if let Err(e) = self.post_result(&result).await {
            warn!(job_id = %job.id, error = %e, "result sync failed, spooling");
            self.failed_reports.persist(&result, epoch_ms())?;
        }
        Ok(())
    }

    /// POST the result to the core. The outbox copy already guarantees
    /// delivery; this is the fast path.
    async fn post_result(&self, result: &JobResult) -> Result<(), String> {
        let url = format!(
            "{}/api/jobs/{}/sync",
            self.config.core_url.trim_end_matches('/'),
            result.job_id
        );
        let response = self
            .client
            .post(&url)
            .json(result)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("core answered HTTP {}", response.status().as_u16()))
        }
    }

    /// Replay spooled reports; each delivered file is removed.
    pub async fn drain_failed_reports(&self) {
        let spooled = match self.failed_reports.list() {
            Ok(spooled) => spooled,
            Err(e) => {
                warn!(error = %e, "failed-report scan failed");
                return;
            }
        };
        for (path, result) in spooled {
            match self.post_result(&result).await {
                Ok(()) => {
                    info!(job_id = %result.job_id, "spooled result delivered");
                    if let Err(e) = self.failed_reports.remove(&path) {
                        warn!(path = %path.display(), error = %e, "spool cleanup failed");
                    }
                }
                Err(e) => {
                    debug!(job_id = %result.job_id, error = %e, "core still unreachable");
                    // Leave the file for the next cycle.
                    break;
                }
            }
        }
    }

    /// One registration attempt against the mesh endpoint.
    pub async fn register_once(&self) -> Result<(), String> {
        let url = format!(
            "{}/api/mesh/workers/register",
            self.config.core_url.trim_end_matches('/')
        );
        let body = RegisterBody {
            worker_id: &self.config.worker_id,
            capabilities: &self.config.capabilities,
            status: "online",
            endpoint: "file-queue",
            meta: serde_json::Map::new(),
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(format!("core answered HTTP {}", response.status().as_u16()))
        }
    }

    /// Retry registration with capped exponential backoff until it lands
    /// or shutdown is requested.
    async fn register_with_retry(&self, shutdown: &CancellationToken) {
        let mut backoff = Duration::from_millis(500);
        loop {
            match self.register_once().await {
                Ok(()) => {
                    info!(worker_id = %self.config.worker_id, "registered with core");
                    return;
                }
                Err(e) => {
                    warn!(error = %e, backoff_ms = backoff.as_millis() as u64, "registration failed");
                }
            }
            tokio::select! {
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep(backoff) => {}
            }
            backoff = (backoff * 2).min(REGISTER_BACKOFF_MAX);
        }
    }
}

/// `<job_id>.job.json` → job id.
fn job_id_from_path(path: &std::path::Path) -> Option<JobId> {
    path.file_name()?
        .to_str()?
        .strip_suffix(JOB_SUFFIX)
        .map(JobId::new)
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;

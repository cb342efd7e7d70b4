// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Result sync: fold worker results back into the store, the priors, the
//! worker statistics, and the chain.

use crate::chain::ChainRunner;
use crate::ctx::{CoreCtx, CoreError};
use crate::dispatcher::intent_for;
use crate::ledger::LedgerEvent;
use sheratan_core::{
    ActionMode, ActionType, Clock, JobResult, JobStatus, TaskStatus, TraceAction, TraceEntry,
    TraceMetrics, TraceResult, TraceResultStatus, TraceState,
};
use sheratan_queue::watcher;
use sheratan_store::StoreError;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How a posted result was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The job reached this terminal status.
    Applied(JobStatus),
    /// The job was already terminal; the result was dropped and audited.
    DroppedTerminal,
    /// No such job; the result was dropped and audited.
    DroppedUnknown,
}

/// Watch the outbox and process result files until cancelled.
pub async fn run_result_sync(ctx: Arc<CoreCtx>, shutdown: CancellationToken) {
    let mut rx = watcher::spawn(
        ctx.outbox.dir().to_owned(),
        sheratan_queue::RESULT_SUFFIX,
        watcher::DEFAULT_DEBOUNCE,
        watcher::DEFAULT_POLL_INTERVAL,
    );
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            Some(path) = rx.recv() => {
                if let Err(e) = process_result_file(&ctx, &path) {
                    warn!(path = %path.display(), error = %e, "result processing failed");
                }
            }
        }
    }
    debug!("result sync stopped");
}

/// Read, apply, and consume one outbox file.
pub fn process_result_file(ctx: &CoreCtx, path: &std::path::Path) -> Result<(), CoreError> {
    if !path.exists() {
        return Ok(()); // duplicate watcher emission, already consumed
    }
    let result = match ctx.outbox.read_result(path) {
        Ok(result) => result,
        Err(e) => {
            // An unreadable result file would wedge the watcher forever;
            // get it out of the way and let the lease reaper requeue.
            warn!(path = %path.display(), error = %e, "malformed result file, discarding");
            let _ = std::fs::remove_file(path);
            return Ok(());
        }
    };
    handle_result(ctx, &result)?;
    ctx.outbox.remove(&result.job_id)?;
    ctx.inbox.remove_claimed(&result.job_id)?;
    Ok(())
}

/// Apply one worker result. Shared by the outbox watcher and the
/// `POST /api/jobs/{jid}/sync` endpoint. Idempotent: results for
/// terminal jobs are dropped with an audit line.
pub fn handle_result(ctx: &CoreCtx, result: &JobResult) -> Result<SyncOutcome, CoreError> {
    let now_ms = ctx.clock.epoch_ms();

    let job = match ctx.store.get_job(&result.job_id) {
        Ok(job) => job,
        Err(StoreError::NotFound { .. }) => {
            warn!(job_id = %result.job_id, "result for unknown job dropped");
            ctx.ledger.append(
                LedgerEvent::ResultDropped {
                    job_id: result.job_id.clone(),
                    reason: "unknown job".to_string(),
                },
                now_ms,
            );
            return Ok(SyncOutcome::DroppedUnknown);
        }
        Err(e) => return Err(e.into()),
    };

    if job.is_terminal() {
        debug!(job_id = %job.id, status = %job.status, "late result dropped");
        ctx.ledger.append(
            LedgerEvent::ResultDropped {
                job_id: job.id.clone(),
                reason: format!("job already {}", job.status),
            },
            now_ms,
        );
        return Ok(SyncOutcome::DroppedTerminal);
    }

    let intent = intent_for(job.kind);

    // Observed metrics: the worker's measured latency when reported,
    // wall-clock since creation otherwise.
    let latency_ms = if result.metrics.latency_ms > 0 {
        result.metrics.latency_ms
    } else {
        now_ms.saturating_sub(job.created_at_ms)
    };
    let cost = result.metrics.cost;
    let tokens = result.metrics.tokens;

    let (l_norm, c_norm) = ctx.baselines.normalized(intent, latency_ms as f64, cost);
    ctx.baselines.observe(intent, latency_ms as f64, cost);

    // Score v1 inputs.
    let s = if result.ok { 1.0 } else { 0.0 };
    let q = match (&result.action, result.ok) {
        (Some(_), true) => 1.0,
        (None, true) => 0.6,
        _ => 0.0,
    };
    let r = ctx
        .registry
        .get(&result.worker_id)
        .map(|w| w.success_ema)
        .unwrap_or(0.5);
    let k = if job.kind.mutates_files() { 0.2 } else { 0.0 };
    let score = ctx.config.score_weights.score(s, q, r, l_norm, c_norm, k);

    // Priors learn from every executed action, failures included, so the
    // low scores depress that action's mean.
    let action_id = job
        .worker_id
        .as_ref()
        .map(|w| format!("route:{w}"))
        .unwrap_or_else(|| format!("route:{}", result.worker_id));
    ctx.priors.record(intent, &action_id, score);
    if let Err(e) = ctx.priors.flush_if_due() {
        warn!(error = %e, "priors flush failed");
    }

    // Worker health bookkeeping.
    if result.ok {
        ctx.registry.record_success(&result.worker_id, latency_ms, now_ms);
    } else {
        let cooled = ctx.registry.record_failure(
            &result.worker_id,
            latency_ms,
            now_ms,
            ctx.config.cooldown_failures,
            ctx.config.cooldown.as_millis() as u64,
        );
        if cooled {
            let failures = ctx.config.cooldown_failures;
            ctx.ledger.append(
                LedgerEvent::WorkerCooldown {
                    worker_id: result.worker_id.clone(),
                    consecutive_failures: failures,
                },
                now_ms,
            );
        }
    }

    // Result node, child of the dispatch decision.
    let entry = TraceEntry {
        schema_version: sheratan_core::TRACE_SCHEMA_VERSION,
        timestamp_ms: now_ms,
        trace_id: job.trace_id.clone(),
        node_id: Uuid::new_v4().to_string(),
        parent_node_id: job.decision_node_id.clone(),
        build_id: crate::env::BUILD_ID.to_string(),
        job_id: Some(job.id.clone()),
        intent,
        depth: job.depth,
        state: TraceState::default(),
        action: TraceAction {
            action_id: action_id.clone(),
            action_type: ActionType::Execute,
            mode: ActionMode::Execute,
            params: serde_json::Value::Null,
            select_score: 0.0,
            risk_gate: true,
        },
        result: TraceResult {
            status: if result.ok {
                TraceResultStatus::Success
            } else {
                TraceResultStatus::Failed
            },
            metrics: TraceMetrics {
                latency_ms,
                cost,
                tokens,
                retries: result.metrics.retries,
                risk: k,
                quality: q,
            },
            score,
            error: result.error.clone(),
            artifacts: None,
            determinism: None,
        },
    };
    ctx.journal.append(&entry)?;

    if result.ok {
        let completed = match ctx.store.update_job_status(&job.id, JobStatus::Completed, |j| {
            j.result = result.action.as_ref().and_then(|a| serde_json::to_value(a).ok());
            j.claim_token = result.claim_token.clone();
        }) {
            Ok(job) => job,
            Err(StoreError::Transition(e)) => {
                // A concurrent sync won; treat like a late duplicate.
                debug!(job_id = %job.id, error = %e, "completion raced, dropping");
                return Ok(SyncOutcome::DroppedTerminal);
            }
            Err(e) => return Err(e.into()),
        };
        ctx.ledger.append(
            LedgerEvent::JobCompleted {
                job_id: completed.id.clone(),
                worker_id: result.worker_id.clone(),
                latency_ms,
                cost,
                tokens,
                score,
            },
            now_ms,
        );
        info!(job_id = %completed.id, score, "job completed");

        // Chain hook: only after the result is fully persisted.
        let runner = ChainRunner::new(&ctx.store);
        let outcome = runner.on_job_completed(&completed, result.action.as_ref(), now_ms)?;
        for created in &outcome.created {
            ctx.ledger.append(LedgerEvent::JobCreated { job_id: created.id.clone() }, now_ms);
        }
        Ok(SyncOutcome::Applied(JobStatus::Completed))
    } else {
        let reason = result
            .error
            .clone()
            .unwrap_or_else(|| "worker reported failure".to_string());
        match ctx.store.update_job_status(&job.id, JobStatus::Failed, |j| {
            j.error = Some(reason.clone());
        }) {
            Ok(_) => {}
            Err(StoreError::Transition(_)) => return Ok(SyncOutcome::DroppedTerminal),
            Err(e) => return Err(e.into()),
        }
        let _ = ctx.store.update_task_status(&job.task_id, TaskStatus::Failed);
        ctx.ledger.append(
            LedgerEvent::JobFailed {
                job_id: job.id.clone(),
                worker_id: Some(result.worker_id.clone()),
                reason,
            },
            now_ms,
        );
        Ok(SyncOutcome::Applied(JobStatus::Failed))
    }
}

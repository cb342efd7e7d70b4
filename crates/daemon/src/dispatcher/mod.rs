// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The dispatch loop: pick eligible jobs, choose a worker, record the
//! decision, then write the job into the queue (or push it over HTTP).
//!
//! The decision-trace append happens before any side effect, so every
//! dispatched job is explainable even if the process dies mid-flight.

mod sync;

pub use sync::{handle_result, process_result_file, run_result_sync, SyncOutcome};

use crate::ctx::{CoreCtx, CoreError};
use crate::ledger::LedgerEvent;
use sheratan_core::{
    ActionMode, ActionType, Clock, Intent, Job, JobKind, JobStatus, SystemState, TraceAction,
    TraceEntry, TraceResult, TraceResultStatus, TraceState, WorkerEndpoint, WorkerRecord,
};
use sheratan_journal::{select, Candidate, CandidateRole, Selection};
use sheratan_queue::QueueError;
use sheratan_store::StoreError;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// What happened to one candidate job this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Routed to a worker and delivered.
    Dispatched,
    /// No capable online worker right now; the job stays pending.
    NoWorker,
    /// Risk gates emptied the candidate set; the job failed validation.
    Refused,
    /// Retry budget exhausted; the job failed terminally.
    RetriesExhausted,
    /// Lost a race (another dispatch already moved the job).
    Raced,
}

/// The decision intent for a job kind.
pub fn intent_for(kind: JobKind) -> Intent {
    if kind.is_llm() {
        Intent::RouteLlmCall
    } else {
        Intent::DispatchJob
    }
}

/// Run the dispatcher until cancelled. Wakes on a short poll.
pub async fn run_dispatcher(ctx: Arc<CoreCtx>, shutdown: CancellationToken) {
    let mut tick = tokio::time::interval(ctx.config.dispatch_poll);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tick.tick() => {
                if let Err(e) = dispatch_once(&ctx).await {
                    warn!(error = %e, "dispatch tick failed");
                }
            }
        }
    }
    debug!("dispatcher stopped");
}

/// Run the stale-lease reaper until cancelled.
pub async fn run_reaper(ctx: Arc<CoreCtx>, shutdown: CancellationToken) {
    let mut tick = tokio::time::interval(ctx.config.reaper_interval);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tick.tick() => {
                if let Err(e) = reap_once(&ctx) {
                    warn!(error = %e, "reaper tick failed");
                }
            }
        }
    }
    debug!("reaper stopped");
}

/// One reaper pass: observe live claims, then requeue expired ones.
pub fn reap_once(ctx: &CoreCtx) -> Result<usize, CoreError> {
    let now_ms = ctx.clock.epoch_ms();
    let lease_ms = ctx.config.lease_duration.as_millis() as u64;
    observe_claims(ctx, now_ms)?;
    let reaped = sheratan_queue::reap_expired(&ctx.inbox, now_ms, lease_ms)?;
    let count = reaped.len();
    for claim in reaped {
        ctx.ledger.append(
            LedgerEvent::LeaseReaped {
                job_id: claim.job_id.clone(),
                worker_id: claim.worker_id.clone(),
            },
            now_ms,
        );
        match ctx.store.update_job_status(&claim.job_id, JobStatus::Pending, |j| j.clear_claim()) {
            Ok(_) => {}
            // Result landed between lease expiry and this pass; fine.
            Err(StoreError::Transition(_)) | Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(count)
}

/// Mirror live claims into the store: the job moves to `running` and the
/// record learns who holds which lease until when.
pub fn observe_claims(ctx: &CoreCtx, now_ms: u64) -> Result<(), CoreError> {
    for job_id in ctx.inbox.claimed_ids()? {
        let Some(ticket) = ctx.inbox.read_claimed(&job_id).ok().flatten() else {
            continue;
        };
        let Some(claim) = ticket.claim else {
            continue;
        };
        if now_ms > claim.lease_until_ms {
            continue; // expired; the reap pass will requeue it
        }
        match ctx.store.update_job_status(&job_id, JobStatus::Running, |j| {
            j.worker_id = Some(claim.worker_id.clone());
            j.claim_token = Some(claim.claim_token.clone());
            j.claim_deadline_ms = Some(claim.lease_until_ms);
        }) {
            Ok(_) => {}
            // Already running or already terminal; both fine.
            Err(StoreError::Transition(_)) | Err(StoreError::NotFound { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Evaluate routing for a job without taking it: same candidate set, same
/// gates, same scoring, but the journal entry carries `mode = simulate`
/// and nothing else moves. The job record, the queue, the priors, and the
/// worker statistics are all untouched.
pub fn simulate_dispatch(ctx: &CoreCtx, job: &Job) -> Result<Selection, CoreError> {
    let now_ms = ctx.clock.epoch_ms();
    let intent = intent_for(job.kind);
    let policy_allows = ctx.config.risk_policy.allows(job.kind);
    let eligible = ctx.registry.eligible(job.kind, now_ms);
    let candidates = build_candidates(ctx, &eligible, intent, job.kind, policy_allows);
    let selection = select(candidates, ctx.priors.parent_visits(intent));

    let (action, result) = match &selection {
        Selection::AllGated { gated_out } => (
            TraceAction {
                action_id: format!("skip:{}", job.kind),
                action_type: ActionType::Skip,
                mode: ActionMode::Simulate,
                params: serde_json::json!({
                    "gated_out": gated_out.iter().map(|c| c.action_id.clone()).collect::<Vec<_>>(),
                }),
                select_score: 0.0,
                risk_gate: false,
            },
            TraceResult {
                status: TraceResultStatus::Skipped,
                ..TraceResult::pending()
            },
        ),
        Selection::Chosen { winner, alternatives, gated_out } => (
            TraceAction {
                action_id: winner.candidate.action_id.clone(),
                action_type: ActionType::Route,
                mode: ActionMode::Simulate,
                params: serde_json::json!({
                    "worker_id": winner.candidate.worker_id.clone(),
                    "role": winner.candidate.role.as_str(),
                    "alternatives": alternatives
                        .iter()
                        .map(|a| serde_json::json!({
                            "action_id": a.candidate.action_id.clone(),
                            "select_score": a.select_score,
                        }))
                        .collect::<Vec<_>>(),
                    "gated_out": gated_out.iter().map(|c| c.action_id.clone()).collect::<Vec<_>>(),
                }),
                select_score: winner.select_score,
                risk_gate: true,
            },
            TraceResult {
                status: TraceResultStatus::Skipped,
                ..TraceResult::pending()
            },
        ),
    };
    write_decision(ctx, job, intent, action, result, None, now_ms)?;
    Ok(selection)
}

/// One dispatcher pass over the pending queue.
pub async fn dispatch_once(ctx: &Arc<CoreCtx>) -> Result<usize, CoreError> {
    // A paused core does not emit work.
    if ctx.state_machine.state() == SystemState::Paused {
        return Ok(0);
    }
    // Backpressure: a deep inbox stops emission entirely.
    if ctx.inbox.depth()? >= ctx.config.max_inbox_depth {
        debug!("inbox at capacity, pausing emission");
        return Ok(0);
    }

    let mut dispatched = 0;
    for job in ctx.store.list_pending_jobs_sorted()? {
        if !ctx.store.dependencies_completed(&job)? {
            continue;
        }
        if matches!(dispatch_job(ctx, &job).await?, DispatchOutcome::Dispatched) {
            dispatched += 1;
        }
    }
    Ok(dispatched)
}

/// Route one pending job.
pub async fn dispatch_job(ctx: &Arc<CoreCtx>, job: &Job) -> Result<DispatchOutcome, CoreError> {
    let now_ms = ctx.clock.epoch_ms();
    let intent = intent_for(job.kind);

    if job.dispatch_count >= ctx.config.max_retries {
        return fail_with_decision(
            ctx,
            job,
            intent,
            ActionType::Abort,
            "max_retries_exceeded",
            now_ms,
        );
    }

    let policy_allows = ctx.config.risk_policy.allows(job.kind);
    let eligible = ctx.registry.eligible(job.kind, now_ms);
    if eligible.is_empty() && policy_allows {
        return Ok(DispatchOutcome::NoWorker);
    }

    let candidates = build_candidates(ctx, &eligible, intent, job.kind, policy_allows);
    let parent_visits = ctx.priors.parent_visits(intent);

    match select(candidates, parent_visits) {
        Selection::AllGated { gated_out } => {
            let reason = if policy_allows {
                "all candidate actions risk-gated"
            } else {
                "risk policy refuses this job kind"
            };
            let params = serde_json::json!({
                "reason": reason,
                "gated_out": gated_out.iter().map(|c| c.action_id.clone()).collect::<Vec<_>>(),
            });
            write_decision(
                ctx,
                job,
                intent,
                TraceAction {
                    action_id: format!("skip:{}", job.kind),
                    action_type: ActionType::Skip,
                    mode: ActionMode::Execute,
                    params,
                    select_score: 0.0,
                    risk_gate: false,
                },
                TraceResult {
                    status: TraceResultStatus::Skipped,
                    error: Some(reason.to_string()),
                    ..TraceResult::pending()
                },
                None,
                now_ms,
            )?;
            match ctx.store.update_job_status(&job.id, JobStatus::Failed, |j| {
                j.error = Some(format!("validation: {reason}"));
            }) {
                Ok(_) => {}
                Err(StoreError::Transition(_)) => return Ok(DispatchOutcome::Raced),
                Err(e) => return Err(e.into()),
            }
            ctx.ledger.append(
                LedgerEvent::JobFailed {
                    job_id: job.id.clone(),
                    worker_id: None,
                    reason: format!("validation: {reason}"),
                },
                now_ms,
            );
            Ok(DispatchOutcome::Refused)
        }
        Selection::Chosen { winner, alternatives, gated_out } => {
            let node_id = Uuid::new_v4().to_string();
            let params = serde_json::json!({
                "worker_id": winner.candidate.worker_id.clone(),
                "role": winner.candidate.role.as_str(),
                "alternatives": alternatives
                    .iter()
                    .map(|a| serde_json::json!({
                        "action_id": a.candidate.action_id.clone(),
                        "select_score": a.select_score,
                    }))
                    .collect::<Vec<_>>(),
                "gated_out": gated_out.iter().map(|c| c.action_id.clone()).collect::<Vec<_>>(),
            });

            // Decision first, side effects after.
            write_decision(
                ctx,
                job,
                intent,
                TraceAction {
                    action_id: winner.candidate.action_id.clone(),
                    action_type: ActionType::Route,
                    mode: ActionMode::Execute,
                    params,
                    select_score: winner.select_score,
                    risk_gate: true,
                },
                TraceResult::pending(),
                Some(node_id.clone()),
                now_ms,
            )?;

            let worker = winner.candidate.worker_id.clone();
            let updated = match ctx.store.update_job_status(&job.id, JobStatus::Dispatched, |j| {
                j.worker_id = Some(worker.clone());
                j.dispatch_count += 1;
                j.decision_node_id = Some(node_id.clone());
            }) {
                Ok(updated) => updated,
                // An API dispatch raced the loop; exactly one wins.
                Err(StoreError::Transition(_)) => return Ok(DispatchOutcome::Raced),
                Err(e) => return Err(e.into()),
            };

            let endpoint = eligible
                .iter()
                .find(|w| w.id == worker)
                .map(|w| w.endpoint.clone())
                .unwrap_or(WorkerEndpoint::FileQueue);
            match deliver(ctx, &updated, &endpoint).await {
                Ok(()) => {
                    ctx.ledger.append(
                        LedgerEvent::JobStatusChanged {
                            job_id: job.id.clone(),
                            from: JobStatus::Pending,
                            to: JobStatus::Dispatched,
                            worker_id: Some(worker.clone()),
                            reason: None,
                        },
                        now_ms,
                    );
                    info!(job_id = %job.id, worker_id = %worker, "job dispatched");
                    Ok(DispatchOutcome::Dispatched)
                }
                Err(e) => {
                    warn!(job_id = %job.id, worker_id = %worker, error = %e, "delivery failed, requeueing");
                    ctx.registry.record_failure(
                        &worker,
                        0,
                        now_ms,
                        ctx.config.cooldown_failures,
                        ctx.config.cooldown.as_millis() as u64,
                    );
                    ctx.store
                        .update_job_status(&job.id, JobStatus::Pending, |j| j.clear_claim())?;
                    Ok(DispatchOutcome::NoWorker)
                }
            }
        }
    }
}

/// Deliver a dispatched job: a queue write for pull workers, an HTTP POST
/// (bounded timeout, one retry on 5xx) for push workers.
async fn deliver(
    ctx: &CoreCtx,
    job: &Job,
    endpoint: &WorkerEndpoint,
) -> Result<(), CoreError> {
    match endpoint {
        WorkerEndpoint::FileQueue => match ctx.inbox.enqueue(job) {
            Ok(_) => Ok(()),
            // Idempotency backstop: the file is already there.
            Err(QueueError::Duplicate { .. }) => {
                debug!(job_id = %job.id, "job file already enqueued");
                Ok(())
            }
            Err(e) => Err(e.into()),
        },
        WorkerEndpoint::Http(url) => {
            let target = format!("{}/api/job", url.trim_end_matches('/'));
            for attempt in 0..2 {
                let response = ctx
                    .http
                    .post(&target)
                    .timeout(Duration::from_secs(10))
                    .json(job)
                    .send()
                    .await;
                match response {
                    Ok(r) if r.status().is_success() => return Ok(()),
                    Ok(r) if r.status().is_server_error() && attempt == 0 => {
                        tokio::time::sleep(Duration::from_millis(200)).await;
                    }
                    Ok(r) => {
                        return Err(CoreError::Io(std::io::Error::other(format!(
                            "push dispatch got HTTP {}",
                            r.status().as_u16()
                        ))))
                    }
                    Err(e) if attempt == 0 => {
                        debug!(error = %e, "push dispatch failed, retrying");
                        tokio::time::sleep(Duration::from_millis(200)).await;
                    }
                    Err(e) => return Err(CoreError::Io(std::io::Error::other(e.to_string()))),
                }
            }
            Err(CoreError::Io(std::io::Error::other("push dispatch retries exhausted")))
        }
    }
}

/// Build the candidate set for a job from the eligible workers, labelling
/// the safe baseline, the best predicted action, and an exploration pick.
fn build_candidates(
    ctx: &CoreCtx,
    eligible: &[WorkerRecord],
    intent: Intent,
    kind: JobKind,
    policy_allows: bool,
) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = eligible
        .iter()
        .map(|w| {
            let action_id = format!("route:{}", w.id);
            let prior = ctx.priors.get(intent, &action_id);
            Candidate {
                action_id,
                worker_id: w.id.clone(),
                role: CandidateRole::BestPredicted,
                mean_score: prior.mean_score,
                visits: prior.visits,
                risk_gate: prior.risk_gate && policy_allows,
                risk_penalty: w.cost_hint(kind) * 0.1,
                latency_ema_ms: w.latency_ema_ms,
            }
        })
        .collect();

    // Safe baseline: the worker with the best observed success rate.
    if let Some(idx) = max_by(eligible, |w| w.success_ema) {
        candidates[idx].role = CandidateRole::SafeBaseline;
    }
    // Exploration pick: the least-visited action, when budget allows.
    if ctx.config.risk_policy.budget_remaining > 0.0 && candidates.len() > 1 {
        if let Some(idx) = min_by(&candidates, |c| c.visits as f64) {
            if candidates[idx].role == CandidateRole::BestPredicted {
                candidates[idx].role = CandidateRole::Explore;
            }
        }
    }

    candidates
}

fn max_by<T>(items: &[T], key: impl Fn(&T) -> f64) -> Option<usize> {
    items
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| {
            key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
}

fn min_by<T>(items: &[T], key: impl Fn(&T) -> f64) -> Option<usize> {
    items
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            key(a).partial_cmp(&key(b)).unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
}

/// Terminal failure decided at dispatch time, with its trace entry.
fn fail_with_decision(
    ctx: &CoreCtx,
    job: &Job,
    intent: Intent,
    action_type: ActionType,
    reason: &str,
    now_ms: u64,
) -> Result<DispatchOutcome, CoreError> {
    write_decision(
        ctx,
        job,
        intent,
        TraceAction {
            action_id: format!("abort:{}", job.kind),
            action_type,
            mode: ActionMode::Execute,
            params: serde_json::json!({"reason": reason}),
            select_score: 0.0,
            risk_gate: true,
        },
        TraceResult {
            status: TraceResultStatus::Aborted,
            error: Some(reason.to_string()),
            ..TraceResult::pending()
        },
        None,
        now_ms,
    )?;
    match ctx.store.update_job_status(&job.id, JobStatus::Failed, |j| {
        j.error = Some(reason.to_string());
    }) {
        Ok(_) => {}
        Err(StoreError::Transition(_)) => return Ok(DispatchOutcome::Raced),
        Err(e) => return Err(e.into()),
    }
    ctx.ledger.append(
        LedgerEvent::JobFailed {
            job_id: job.id.clone(),
            worker_id: job.worker_id.clone(),
            reason: reason.to_string(),
        },
        now_ms,
    );
    Ok(DispatchOutcome::RetriesExhausted)
}

/// Append one decision entry; breaches are logged but never block dispatch
/// bookkeeping (the breach log keeps the evidence).
fn write_decision(
    ctx: &CoreCtx,
    job: &Job,
    intent: Intent,
    action: TraceAction,
    result: TraceResult,
    node_id: Option<String>,
    now_ms: u64,
) -> Result<(), CoreError> {
    let entry = TraceEntry {
        schema_version: sheratan_core::TRACE_SCHEMA_VERSION,
        timestamp_ms: now_ms,
        trace_id: job.trace_id.clone(),
        node_id: node_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
        parent_node_id: job.decision_node_id.clone(),
        build_id: crate::env::BUILD_ID.to_string(),
        job_id: Some(job.id.clone()),
        intent,
        depth: job.depth,
        state: TraceState {
            context_refs: vec![format!("task:{}", job.task_id), format!("mission:{}", job.mission_id)],
            constraints: if ctx.config.risk_policy.readonly {
                vec!["readonly".to_string()]
            } else {
                Vec::new()
            },
        },
        action,
        result,
    };
    ctx.journal.append(&entry)?;
    Ok(())
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;

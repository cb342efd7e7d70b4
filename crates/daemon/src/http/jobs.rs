// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job endpoints: creation, inspection, dispatch, sync, and cancellation.

use super::error::{ApiError, ApiResult};
use super::{ensure_capacity, AppState};
use crate::dispatcher::{
    dispatch_job, handle_result, simulate_dispatch, DispatchOutcome, SyncOutcome,
};
use crate::ledger::LedgerEvent;
use sheratan_journal::Selection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sheratan_core::{
    Clock, Job, JobConfig, JobId, JobKind, JobResult, JobStatus, TaskDescriptor, TaskId,
    TaskStatus,
};

#[derive(Debug, Deserialize)]
pub struct CreateJob {
    #[serde(default)]
    pub kind: Option<JobKind>,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub depends_on: Vec<JobId>,
    #[serde(default)]
    pub priority: i32,
}

pub async fn create_job(
    State(ctx): State<AppState>,
    Path(tid): Path<String>,
    Json(body): Json<CreateJob>,
) -> ApiResult<(StatusCode, Json<Job>)> {
    ensure_capacity(&ctx)?;
    let task = ctx.store.get_task(&TaskId::new(tid))?;
    let kind = body.kind.unwrap_or(task.kind);
    let now_ms = ctx.clock.epoch_ms();

    let mut config = JobConfig::new(JobId::generate(), task.id.clone(), task.mission_id.clone(), kind);
    config.payload.task = TaskDescriptor { id: task.id.clone(), name: task.name.clone(), kind };
    config.payload.params = if body.params.is_null() { task.params.clone() } else { body.params };
    config.depends_on = body.depends_on;
    config.priority = body.priority;

    let job = Job::new(config, now_ms);
    ctx.store.put_job(&job)?;
    ctx.ledger.append(LedgerEvent::JobCreated { job_id: job.id.clone() }, now_ms);
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn get_job(
    State(ctx): State<AppState>,
    Path(jid): Path<String>,
) -> ApiResult<Json<Job>> {
    Ok(Json(ctx.store.get_job(&JobId::new(jid))?))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsQuery {
    #[serde(default)]
    pub status: Option<JobStatus>,
}

pub async fn list_jobs(
    State(ctx): State<AppState>,
    Query(query): Query<ListJobsQuery>,
) -> ApiResult<Json<Vec<Job>>> {
    let mut jobs = ctx.store.list_jobs()?;
    if let Some(status) = query.status {
        jobs.retain(|j| j.status == status);
    }
    jobs.sort_by(|a, b| a.created_at_ms.cmp(&b.created_at_ms).then(a.id.cmp(&b.id)));
    Ok(Json(jobs))
}

#[derive(Debug, Deserialize)]
pub struct DispatchQuery {
    /// Preview routing without dispatching; journaled with `mode=simulate`.
    #[serde(default)]
    pub simulate: bool,
}

/// Request immediate dispatch, outside the poll cadence. With
/// `?simulate=true` the selection runs and is journaled but nothing moves.
pub async fn dispatch_now(
    State(ctx): State<AppState>,
    Path(jid): Path<String>,
    Query(query): Query<DispatchQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let job = ctx.store.get_job(&JobId::new(jid))?;
    if job.status != JobStatus::Pending {
        return Err(ApiError::conflict(format!("job is {}, not pending", job.status)));
    }
    if !ctx.store.dependencies_completed(&job)? {
        return Err(ApiError::conflict("dependencies not completed"));
    }

    if query.simulate {
        let body = match simulate_dispatch(&ctx, &job)? {
            Selection::Chosen { winner, alternatives, gated_out } => serde_json::json!({
                "ok": true,
                "outcome": "simulated",
                "would_route_to": winner.candidate.worker_id,
                "select_score": winner.select_score,
                "alternatives": alternatives
                    .iter()
                    .map(|a| a.candidate.action_id.clone())
                    .collect::<Vec<_>>(),
                "gated_out": gated_out.iter().map(|c| c.action_id.clone()).collect::<Vec<_>>(),
            }),
            Selection::AllGated { gated_out } if gated_out.is_empty() => serde_json::json!({
                "ok": true,
                "outcome": "simulated",
                "would_route_to": null,
                "reason": "no eligible worker",
            }),
            Selection::AllGated { gated_out } => serde_json::json!({
                "ok": true,
                "outcome": "simulated",
                "would_route_to": null,
                "reason": "all candidate actions risk-gated",
                "gated_out": gated_out.iter().map(|c| c.action_id.clone()).collect::<Vec<_>>(),
            }),
        };
        return Ok(Json(body));
    }

    let outcome = dispatch_job(&ctx, &job).await?;
    let label = match outcome {
        DispatchOutcome::Dispatched => "dispatched",
        DispatchOutcome::NoWorker => "no_worker",
        DispatchOutcome::Refused => "refused",
        DispatchOutcome::RetriesExhausted => "max_retries_exceeded",
        DispatchOutcome::Raced => "already_dispatched",
    };
    Ok(Json(serde_json::json!({"ok": true, "outcome": label})))
}

/// Worker-facing result delivery, the HTTP alternative to the outbox.
pub async fn sync_result(
    State(ctx): State<AppState>,
    Path(jid): Path<String>,
    Json(result): Json<JobResult>,
) -> ApiResult<Json<serde_json::Value>> {
    if result.job_id.as_str() != jid {
        return Err(ApiError::bad_request(format!(
            "result job_id {} does not match path {jid}",
            result.job_id
        )));
    }
    let outcome = handle_result(&ctx, &result)?;
    // Results may also sit in the outbox; consume the duplicates.
    ctx.outbox.remove(&result.job_id)?;
    ctx.inbox.remove_claimed(&result.job_id)?;
    let body = match outcome {
        SyncOutcome::Applied(status) => {
            serde_json::json!({"ok": true, "status": status})
        }
        SyncOutcome::DroppedTerminal => serde_json::json!({
            "ok": true,
            "dropped": true,
            "note": "job already terminal; result discarded",
        }),
        SyncOutcome::DroppedUnknown => serde_json::json!({
            "ok": true,
            "dropped": true,
            "note": "unknown job; result discarded",
        }),
    };
    Ok(Json(body))
}

#[derive(Debug, Deserialize)]
pub struct CancelJob {
    #[serde(default)]
    pub reason: Option<String>,
}

/// Manual cancellation. In-flight results arriving later are dropped with
/// an audit entry by the sync path.
pub async fn cancel_job(
    State(ctx): State<AppState>,
    Path(jid): Path<String>,
    Json(body): Json<CancelJob>,
) -> ApiResult<Json<serde_json::Value>> {
    let job_id = JobId::new(jid);
    let now_ms = ctx.clock.epoch_ms();
    let reason = body.reason.unwrap_or_else(|| "cancelled".to_string());

    let job = ctx.store.get_job(&job_id)?;
    if job.is_terminal() {
        return Err(ApiError::conflict(format!("job is already {}", job.status)));
    }
    let cancelled = ctx.store.update_job_status(&job_id, JobStatus::Failed, |j| {
        j.error = Some(format!("cancelled: {reason}"));
    })?;
    let _ = ctx.store.update_task_status(&cancelled.task_id, TaskStatus::Failed);
    // Pull the job file back out of the queue if nobody claimed it yet.
    let _ = ctx.inbox.remove_pending(&job_id);
    ctx.ledger.append(
        LedgerEvent::JobFailed {
            job_id: job_id.clone(),
            worker_id: cancelled.worker_id.clone(),
            reason: format!("cancelled: {reason}"),
        },
        now_ms,
    );
    Ok(Json(serde_json::json!({"ok": true, "status": "failed", "reason": reason})))
}

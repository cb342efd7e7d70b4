// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mission and task submission endpoints.

use super::error::{ApiError, ApiResult};
use super::{ensure_capacity, AppState};
use crate::chain::initial_selfloop_job;
use crate::ledger::LedgerEvent;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use sheratan_core::{
    Clock, Job, JobConfig, JobId, JobKind, Mission, MissionId, Task, TaskDescriptor, TaskId,
    TaskStatus,
};
use std::collections::HashMap;

/// Default planner iteration bound for self-loop tasks.
const DEFAULT_MAX_ITERATIONS: u32 = 3;

#[derive(Debug, Deserialize)]
pub struct CreateMission {
    #[serde(default)]
    pub id: Option<MissionId>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

pub async fn create_mission(
    State(ctx): State<AppState>,
    Json(body): Json<CreateMission>,
) -> ApiResult<(StatusCode, Json<Mission>)> {
    ensure_capacity(&ctx)?;
    if body.title.trim().is_empty() {
        return Err(ApiError::bad_request("title must not be empty"));
    }
    let mission = Mission {
        id: body.id.unwrap_or_else(MissionId::generate),
        title: body.title,
        description: body.description,
        created_at_ms: ctx.clock.epoch_ms(),
        metadata: body.metadata,
    };
    ctx.store.put_mission(&mission)?;
    Ok((StatusCode::CREATED, Json(mission)))
}

pub async fn list_missions(State(ctx): State<AppState>) -> ApiResult<Json<Vec<Mission>>> {
    Ok(Json(ctx.store.list_missions()?))
}

pub async fn get_mission(
    State(ctx): State<AppState>,
    Path(mid): Path<String>,
) -> ApiResult<Json<Mission>> {
    Ok(Json(ctx.store.get_mission(&MissionId::new(mid))?))
}

#[derive(Debug, Deserialize)]
pub struct CreateTask {
    pub name: String,
    pub kind: JobKind,
    #[serde(default)]
    pub params: serde_json::Value,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub max_iterations: Option<u32>,
}

/// Create a task and its first job in one step.
pub async fn create_task(
    State(ctx): State<AppState>,
    Path(mid): Path<String>,
    Json(body): Json<CreateTask>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    ensure_capacity(&ctx)?;
    let mission_id = MissionId::new(mid);
    let mission = ctx.store.get_mission(&mission_id)?;
    let now_ms = ctx.clock.epoch_ms();

    let task = Task::new(TaskId::generate(), mission.id.clone(), body.name.clone(), body.kind, now_ms)
        .params(body.params.clone())
        .status(TaskStatus::Running)
        .max_iterations(body.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS));
    ctx.store.put_task(&task)?;

    let job = if body.kind == JobKind::Selfloop {
        let goal = body
            .params
            .get("goal")
            .and_then(|g| g.as_str())
            .unwrap_or(&body.name)
            .to_string();
        initial_selfloop_job(
            task.id.clone(),
            mission.id.clone(),
            &body.name,
            &goal,
            body.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS),
            now_ms,
        )
    } else {
        let mut config = JobConfig::new(JobId::generate(), task.id.clone(), mission.id.clone(), body.kind);
        config.payload.task = TaskDescriptor {
            id: task.id.clone(),
            name: body.name.clone(),
            kind: body.kind,
        };
        config.payload.params = body.params.clone();
        config.priority = body.priority;
        Job::new(config, now_ms)
    };
    ctx.store.put_job(&job)?;
    ctx.ledger.append(LedgerEvent::JobCreated { job_id: job.id.clone() }, now_ms);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"ok": true, "task": task, "job": job})),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CreateSelfloop {
    pub goal: String,
    #[serde(default)]
    pub max_iterations: Option<u32>,
}

/// Convenience endpoint: mission + selfloop task + first iteration job.
pub async fn create_selfloop(
    State(ctx): State<AppState>,
    Json(body): Json<CreateSelfloop>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    ensure_capacity(&ctx)?;
    if body.goal.trim().is_empty() {
        return Err(ApiError::bad_request("goal must not be empty"));
    }
    let now_ms = ctx.clock.epoch_ms();
    let max_iterations = body.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS).max(1);

    let mission = Mission::new(MissionId::generate(), body.goal.clone(), now_ms);
    ctx.store.put_mission(&mission)?;

    let task = Task::new(
        TaskId::generate(),
        mission.id.clone(),
        format!("selfloop: {}", sheratan_core::short(&body.goal, 48)),
        JobKind::Selfloop,
        now_ms,
    )
    .status(TaskStatus::Running)
    .max_iterations(max_iterations);
    ctx.store.put_task(&task)?;

    let job = initial_selfloop_job(
        task.id.clone(),
        mission.id.clone(),
        &task.name,
        &body.goal,
        max_iterations,
        now_ms,
    );
    ctx.store.put_job(&job)?;
    ctx.ledger.append(LedgerEvent::JobCreated { job_id: job.id.clone() }, now_ms);

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({
            "ok": true,
            "mission_id": mission.id,
            "task_id": task.id,
            "job_id": job.id,
            "max_iterations": max_iterations,
        })),
    ))
}

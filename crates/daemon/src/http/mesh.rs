// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Mesh endpoints: worker registration and registry inspection.

use super::error::ApiResult;
use super::AppState;
use crate::registry::Registration;
use axum::extract::State;
use axum::Json;
use serde::Serialize;
use sheratan_core::{Clock, WorkerRecord};

/// Registry row with derived liveness flags.
#[derive(Debug, Serialize)]
pub struct WorkerView {
    #[serde(flatten)]
    pub record: WorkerRecord,
    pub online: bool,
    pub cooldown: bool,
}

pub async fn register_worker(
    State(ctx): State<AppState>,
    Json(registration): Json<Registration>,
) -> ApiResult<Json<serde_json::Value>> {
    let now_ms = ctx.clock.epoch_ms();
    let record = ctx.registry.register(registration, now_ms);
    Ok(Json(serde_json::json!({"ok": true, "worker": record})))
}

pub async fn list_workers(State(ctx): State<AppState>) -> ApiResult<Json<Vec<WorkerView>>> {
    let now_ms = ctx.clock.epoch_ms();
    let heartbeat_timeout_ms = ctx.config.heartbeat_timeout.as_millis() as u64;
    let views = ctx
        .registry
        .list()
        .into_iter()
        .map(|record| WorkerView {
            online: record.is_online(now_ms, heartbeat_timeout_ms),
            cooldown: record.in_cooldown(now_ms),
            record,
        })
        .collect();
    Ok(Json(views))
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System state endpoints.

use super::error::ApiResult;
use super::AppState;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use sheratan_core::{Clock, SystemState, Transition};
use sheratan_store::read_all;

pub async fn get_state(State(ctx): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let snapshot = ctx.state_machine.current();
    let now_ms = ctx.clock.epoch_ms();
    Ok(Json(serde_json::json!({
        "state": snapshot.state,
        "since": snapshot.since_ms,
        "duration_ms": now_ms.saturating_sub(snapshot.since_ms),
        "health": snapshot.health,
        "last_transition": snapshot.last_transition,
    })))
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub state: SystemState,
    pub reason: String,
    #[serde(default = "default_actor")]
    pub actor: String,
    #[serde(default)]
    pub meta: serde_json::Value,
}

fn default_actor() -> String {
    "api".to_string()
}

/// Privileged manual transition; refused outside the matrix with 409.
pub async fn request_transition(
    State(ctx): State<AppState>,
    Json(body): Json<TransitionRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let transition = ctx.state_machine.transition(
        body.state,
        body.reason,
        body.actor,
        body.meta,
        ctx.clock.epoch_ms(),
    )?;
    Ok(Json(serde_json::json!({"ok": true, "transition": transition})))
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

pub async fn history(
    State(ctx): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<Transition>>> {
    let mut transitions: Vec<Transition> = read_all(&ctx.config.transitions_path())
        .map_err(|e| super::error::ApiError::internal(e.to_string()))?;
    let skip = transitions.len().saturating_sub(query.limit);
    transitions.drain(..skip);
    transitions.reverse(); // newest first
    Ok(Json(transitions))
}

pub async fn health(State(ctx): State<AppState>) -> ApiResult<Json<serde_json::Value>> {
    let snapshot = ctx.state_machine.current();
    Ok(Json(serde_json::json!({
        "state": snapshot.state,
        "health": snapshot.health,
    })))
}

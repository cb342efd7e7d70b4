// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The read-only Why-API: decision traces and aggregated stats.

use super::error::{ApiError, ApiResult};
use super::AppState;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use sheratan_core::{Clock, Intent, JobId, TraceId};
use std::time::Duration;

#[derive(Debug, Deserialize)]
pub struct IntentQuery {
    #[serde(default)]
    pub intent: Option<String>,
}

fn parse_intent(raw: &Option<String>) -> ApiResult<Option<Intent>> {
    match raw {
        None => Ok(None),
        Some(s) => serde_json::from_value::<Intent>(serde_json::Value::String(s.clone()))
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("unknown intent '{s}'"))),
    }
}

/// Parse a stats window like `7d`, `24h`, `30m`, or `90s`.
fn parse_window(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = raw.split_at(raw.len().checked_sub(1)?);
    let n: u64 = digits.parse().ok()?;
    match unit {
        "d" => Some(Duration::from_secs(n * 86_400)),
        "h" => Some(Duration::from_secs(n * 3_600)),
        "m" => Some(Duration::from_secs(n * 60)),
        "s" => Some(Duration::from_secs(n)),
        _ => None,
    }
}

pub async fn latest(
    State(ctx): State<AppState>,
    Query(query): Query<IntentQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let intent = parse_intent(&query.intent)?;
    match ctx.why.latest(intent)? {
        Some(entry) => Ok(Json(serde_json::json!({"ok": true, "decision": entry}))),
        None => Err(ApiError::not_found("no matching decision recorded")),
    }
}

pub async fn trace(
    State(ctx): State<AppState>,
    Path(trace_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let forest = ctx.why.trace_tree(&TraceId::new(trace_id.clone()))?;
    if forest.is_empty() {
        return Err(ApiError::not_found(format!("no trace entries for {trace_id}")));
    }
    Ok(Json(serde_json::json!({"ok": true, "trace_id": trace_id, "roots": forest})))
}

pub async fn job(
    State(ctx): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    let entries = ctx.why.for_job(&JobId::new(job_id.clone()))?;
    if entries.is_empty() {
        return Err(ApiError::not_found(format!("no trace entries for job {job_id}")));
    }
    Ok(Json(serde_json::json!({"ok": true, "job_id": job_id, "entries": entries})))
}

#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    #[serde(default)]
    pub intent: Option<String>,
    #[serde(default = "default_window")]
    pub window: String,
}

fn default_window() -> String {
    "7d".to_string()
}

pub async fn stats(
    State(ctx): State<AppState>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let intent = parse_intent(&query.intent)?;
    let window = parse_window(&query.window)
        .ok_or_else(|| ApiError::bad_request(format!("unparseable window '{}'", query.window)))?;
    let stats = ctx
        .why
        .stats(intent, window.as_millis() as u64, ctx.clock.epoch_ms())?;
    Ok(Json(serde_json::json!({
        "ok": true,
        "window": query.window,
        "intent": query.intent,
        "stats": stats,
    })))
}

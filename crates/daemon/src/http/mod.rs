// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The core HTTP API.

pub mod error;
mod jobs;
mod mesh;
mod missions;
mod system;
mod why;

use crate::ctx::CoreCtx;
use axum::routing::{get, post};
use axum::Router;
use error::{ApiError, ApiResult};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub type AppState = Arc<CoreCtx>;

/// Backpressure guard for submit endpoints: a full inbox answers 503.
pub(crate) fn ensure_capacity(ctx: &CoreCtx) -> ApiResult<()> {
    let depth = ctx.inbox.depth().map_err(ApiError::from)?;
    if depth >= ctx.config.max_inbox_depth {
        return Err(ApiError::unavailable(format!(
            "queue at capacity ({depth}/{})",
            ctx.config.max_inbox_depth
        )));
    }
    Ok(())
}

/// Assemble the full router.
pub fn router(ctx: AppState) -> Router {
    Router::new()
        // missions and tasks
        .route("/api/missions", post(missions::create_mission).get(missions::list_missions))
        .route("/api/missions/:mid", get(missions::get_mission))
        .route("/api/missions/:mid/tasks", post(missions::create_task))
        .route("/api/selfloop/create", post(missions::create_selfloop))
        // jobs
        .route("/api/tasks/:tid/jobs", post(jobs::create_job))
        .route("/api/jobs", get(jobs::list_jobs))
        .route("/api/jobs/:jid", get(jobs::get_job))
        .route("/api/jobs/:jid/dispatch", post(jobs::dispatch_now))
        .route("/api/jobs/:jid/sync", post(jobs::sync_result))
        .route("/api/jobs/:jid/cancel", post(jobs::cancel_job))
        // mesh
        .route("/api/mesh/workers/register", post(mesh::register_worker))
        .route("/api/mesh/workers", get(mesh::list_workers))
        // system state
        .route("/api/system/state", get(system::get_state))
        .route("/api/system/state/transition", post(system::request_transition))
        .route("/api/system/state/history", get(system::history))
        .route("/api/system/health", get(system::health))
        // why
        .route("/api/why/latest", get(why::latest))
        .route("/api/why/trace/:trace_id", get(why::trace))
        .route("/api/why/job/:job_id", get(why::job))
        .route("/api/why/stats", get(why::stats))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(ctx)
}

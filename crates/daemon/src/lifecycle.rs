// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and shutdown.
//!
//! Startup order matters: the PID lock is taken first so two cores never
//! share the queue directories, recovery runs before any loop starts, and
//! the state machine leaves `PAUSED` only after the initial health check.

use crate::ctx::{CoreCtx, CoreError, SharedClock};
use crate::dispatcher;
use crate::env::Config;
use crate::health::HealthProbe;
use crate::http;
use fs2::FileExt;
use sheratan_core::{Clock, SystemClock, SystemState};
use std::fs::File;
use std::io::Write;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Registry entries silent for longer than this are swept.
const WORKER_SWEEP_SILENCE_MS: u64 = 3_600_000;

/// Errors that can occur during daemon lifecycle.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("another core holds the lock: {0}")]
    LockFailed(std::io::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// A running daemon: context, background loops, and the shutdown token.
pub struct Daemon {
    pub ctx: Arc<CoreCtx>,
    pub shutdown: CancellationToken,
    tasks: JoinSet<()>,
    // Held for the life of the process; dropping releases the PID lock.
    _lock_file: File,
}

/// Start the core: lock, recover, probe, spawn loops.
pub async fn startup(config: Config) -> Result<Daemon, LifecycleError> {
    std::fs::create_dir_all(&config.root)?;

    // PID lock first: prevents two cores racing over the same queue.
    // OpenOptions avoids truncating before the lock is held, which would
    // wipe the running core's PID.
    let pid_path = config.pid_lock_path();
    if let Some(parent) = pid_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&pid_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    let ctx = CoreCtx::assemble(config, SharedClock::System(SystemClock))?;
    info!(state = %ctx.state_machine.state(), "state recovered");

    // Initial health decides how we leave PAUSED.
    let probe = HealthProbe::from_config(&ctx.config);
    let initial = if probe.is_empty() {
        SystemState::Operational
    } else {
        let report = probe.probe().await;
        let decided = report.decide();
        if let Err(e) = ctx.state_machine.observe_health(report, ctx.now_ms()) {
            warn!(error = %e, "initial health observation failed");
        }
        decided
    };
    let current = ctx.state_machine.state();
    if current != initial && current.can_transition(initial) {
        ctx.state_machine
            .transition(
                initial,
                "startup health check",
                "lifecycle",
                serde_json::Value::Null,
                ctx.now_ms(),
            )
            .map_err(CoreError::from)?;
    }

    let shutdown = CancellationToken::new();
    let mut tasks = JoinSet::new();
    tasks.spawn(dispatcher::run_dispatcher(Arc::clone(&ctx), shutdown.clone()));
    tasks.spawn(dispatcher::run_reaper(Arc::clone(&ctx), shutdown.clone()));
    tasks.spawn(dispatcher::run_result_sync(Arc::clone(&ctx), shutdown.clone()));
    tasks.spawn(run_health_loop(Arc::clone(&ctx), probe, shutdown.clone()));

    info!(port = ctx.config.core_port, "core started");
    Ok(Daemon { ctx, shutdown, tasks, _lock_file: lock_file })
}

/// Periodic health evaluation plus registry sweeping.
async fn run_health_loop(ctx: Arc<CoreCtx>, probe: HealthProbe, shutdown: CancellationToken) {
    let mut tick = tokio::time::interval(ctx.config.health_poll);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tick.tick() => {
                let now_ms = ctx.clock.epoch_ms();
                if !probe.is_empty() {
                    let report = probe.probe().await;
                    if let Err(e) = ctx.state_machine.observe_health(report, now_ms) {
                        warn!(error = %e, "health observation failed");
                    }
                }
                let swept = ctx.registry.prune(now_ms, WORKER_SWEEP_SILENCE_MS);
                if swept > 0 {
                    info!(swept, "swept silent workers from the registry");
                }
            }
        }
    }
}

/// Serve the HTTP API until the shutdown token fires.
pub async fn serve_http(ctx: Arc<CoreCtx>, shutdown: CancellationToken) -> Result<(), std::io::Error> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], ctx.config.core_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "http api listening");
    axum::serve(listener, http::router(ctx))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}

impl Daemon {
    /// Graceful shutdown: stop the loops, flush the priors, park in
    /// `PAUSED`.
    pub async fn stop(mut self) {
        self.shutdown.cancel();
        while self.tasks.join_next().await.is_some() {}

        if let Err(e) = self.ctx.priors.flush() {
            warn!(error = %e, "priors flush on shutdown failed");
        }
        let state = self.ctx.state_machine.state();
        if state != SystemState::Paused && state.can_transition(SystemState::Paused) {
            if let Err(e) = self.ctx.state_machine.transition(
                SystemState::Paused,
                "shutdown",
                "lifecycle",
                serde_json::Value::Null,
                self.ctx.now_ms(),
            ) {
                warn!(error = %e, "shutdown transition failed");
            }
        }
        info!("core stopped");
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sheratand: the Sheratan orchestration core.

use sheratan_daemon::{lifecycle, Config};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    info!(root = %config.root.display(), port = config.core_port, "starting sheratand");

    let daemon = match lifecycle::startup(config).await {
        Ok(daemon) => daemon,
        Err(e) => {
            error!(error = %e, "startup failed");
            std::process::exit(1);
        }
    };

    let ctx = Arc::clone(&daemon.ctx);
    let shutdown = daemon.shutdown.clone();
    let server = tokio::spawn(lifecycle::serve_http(ctx, shutdown.clone()));

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "signal handler failed");
    }
    info!("shutdown requested");
    daemon.stop().await;

    match server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => error!(error = %e, "http server error"),
        Err(e) => error!(error = %e, "http server panicked"),
    }
}

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sheratan-worker: claims jobs from the queue inbox and executes them.

use sheratan_worker::{Worker, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = WorkerConfig::from_env();
    info!(
        worker_id = %config.worker_id,
        inbox = %config.queue_inbox.display(),
        "starting sheratan-worker"
    );

    let worker = match Worker::new(config) {
        Ok(worker) => worker,
        Err(e) => {
            error!(error = %e, "worker startup failed");
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown requested");
            signal_token.cancel();
        }
    });

    worker.run(shutdown).await;
}

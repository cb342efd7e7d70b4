// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event-driven directory pickup with a polling fallback.
//!
//! Emits paths of matching files once they have been stable for the
//! debounce window, so a consumer never reads a partial write. Consumers
//! must tolerate duplicate emissions; claim-by-rename and terminal-state
//! checks make redelivery harmless.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc as std_mpsc;
use std::time::Duration;

use notify::{RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Default stability window before a file is handed to the consumer.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);
/// Default scan interval when the native watcher is unavailable.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Watch `dir` for files whose name ends in `suffix`.
///
/// Prefers a native `notify` watcher; falls back to interval polling when
/// the watcher cannot be created. An initial scan covers files that
/// existed before the watch started.
pub fn spawn(
    dir: PathBuf,
    suffix: &'static str,
    debounce: Duration,
    poll_interval: Duration,
) -> mpsc::Receiver<PathBuf> {
    let (tx, rx) = mpsc::channel(256);

    let (raw_tx, raw_rx) = std_mpsc::channel::<PathBuf>();
    let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            for path in event.paths {
                let _ = raw_tx.send(path);
            }
        }
    })
    .and_then(|mut w| w.watch(&dir, RecursiveMode::NonRecursive).map(|()| w));

    match watcher {
        Ok(watcher) => {
            std::thread::spawn(move || {
                // Keep the watcher alive for the lifetime of the bridge.
                let _watcher = watcher;
                scan_once(&dir, suffix, debounce, &tx);
                while let Ok(path) = raw_rx.recv() {
                    if !matches(&path, suffix) {
                        continue;
                    }
                    if wait_stable(&path, debounce) && tx.blocking_send(path).is_err() {
                        break;
                    }
                }
                debug!(dir = %dir.display(), "watcher bridge stopped");
            });
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "native watcher unavailable, polling");
            std::thread::spawn(move || loop {
                scan_once(&dir, suffix, debounce, &tx);
                if tx.is_closed() {
                    break;
                }
                std::thread::sleep(poll_interval);
            });
        }
    }

    rx
}

fn matches(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().ends_with(suffix))
        .unwrap_or(false)
}

fn scan_once(dir: &Path, suffix: &str, debounce: Duration, tx: &mpsc::Sender<PathBuf>) {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "watch scan failed");
            return;
        }
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if matches(&path, suffix) && wait_stable(&path, debounce) {
            let _ = tx.blocking_send(path);
        }
    }
}

/// Wait until the file size stops changing across the debounce window.
/// Returns false when the file disappeared (someone else claimed it).
fn wait_stable(path: &Path, debounce: Duration) -> bool {
    const MAX_ROUNDS: u32 = 20;
    let Ok(meta) = fs::metadata(path) else {
        return false;
    };
    let mut last_len = meta.len();
    for _ in 0..MAX_ROUNDS {
        std::thread::sleep(debounce);
        match fs::metadata(path) {
            Ok(meta) if meta.len() == last_len => return true,
            Ok(meta) => last_len = meta.len(),
            Err(_) => return false,
        }
    }
    false
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stale-lease recovery: requeue claimed jobs whose worker went silent.

use crate::inbox::{Inbox, CLAIMED_SUFFIX};
use crate::QueueError;
use sheratan_core::{JobId, WorkerId};
use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// One requeued claim.
#[derive(Debug, Clone, PartialEq)]
pub struct ReapedClaim {
    pub job_id: JobId,
    pub worker_id: Option<WorkerId>,
    pub lease_until_ms: u64,
}

/// Scan the inbox for `.claimed` files with expired leases and rename them
/// back to `.job.json`. A crashed worker therefore self-heals: the job
/// becomes claimable again after at most `lease + reaper interval`.
///
/// Claimed files without a readable claim block (crash between rename and
/// metadata write) fall back to file mtime plus `default_lease_ms`.
pub fn reap_expired(
    inbox: &Inbox,
    now_ms: u64,
    default_lease_ms: u64,
) -> Result<Vec<ReapedClaim>, QueueError> {
    let mut reaped = Vec::new();

    for entry in fs::read_dir(inbox.dir())? {
        let entry = entry?;
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let Some(id) = name.strip_suffix(CLAIMED_SUFFIX) else {
            continue;
        };
        let job_id = JobId::new(id);

        let (worker_id, lease_until_ms) = match inbox.read_claimed(&job_id) {
            Ok(Some(ticket)) => match ticket.claim {
                Some(claim) => (Some(claim.worker_id), claim.lease_until_ms),
                None => (None, mtime_ms(&entry)? + default_lease_ms),
            },
            Ok(None) => continue,
            Err(QueueError::Malformed { path, message }) => {
                warn!(path = %path.display(), message, "unreadable claim, using mtime lease");
                (None, mtime_ms(&entry)? + default_lease_ms)
            }
            Err(e) => return Err(e),
        };

        if now_ms <= lease_until_ms {
            continue;
        }

        let src = inbox.claimed_path(&job_id);
        let dst = inbox.job_path(&job_id);
        if dst.exists() {
            // A fresh enqueue already replaced this job; the stale claim
            // file is garbage.
            let _ = fs::remove_file(&src);
            continue;
        }
        match fs::rename(&src, &dst) {
            Ok(()) => {
                info!(
                    job_id = %job_id,
                    worker_id = worker_id.as_ref().map(|w| w.as_str()).unwrap_or("unknown"),
                    lease_until_ms,
                    "LEASE_REAP: requeued expired claim"
                );
                reaped.push(ReapedClaim { job_id, worker_id, lease_until_ms });
            }
            // The worker finished (deleted the file) between scan and rename
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(reaped)
}

fn mtime_ms(entry: &fs::DirEntry) -> Result<u64, QueueError> {
    let modified = entry.metadata()?.modified()?;
    Ok(modified
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64)
}

#[cfg(test)]
#[path = "reaper_tests.rs"]
mod tests;

// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job execution, dispatched by kind.
//!
//! The dispatch map is a closed match: unknown kinds cannot reach a
//! worker (the core validates at the API boundary), and a kind the worker
//! cannot serve locally fails validation instead of succeeding silently.

mod files;
mod llm;

pub use files::FileExecutor;
pub use llm::BridgeClient;

use crate::env::WorkerConfig;
use sheratan_core::{Job, JobKind, ResultAction};
use thiserror::Error;

/// Errors from executing one job.
#[derive(Debug, Error)]
pub enum ExecError {
    /// Bad job input; never retried.
    #[error("validation: {0}")]
    Validation(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Bridge unreachable or misbehaving after retries.
    #[error("bridge: {0}")]
    Bridge(String),
}

/// Executes jobs by kind.
pub struct Executor {
    files: FileExecutor,
    bridge: Option<BridgeClient>,
}

impl Executor {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            files: FileExecutor::new(&config.fs_root),
            bridge: config
                .llm_bridge_url
                .as_deref()
                .map(|url| BridgeClient::new(url, config.llm_timeout)),
        }
    }

    /// Run one claimed job to an LCP result action.
    pub async fn execute(&self, job: &Job) -> Result<ResultAction, ExecError> {
        match job.kind {
            JobKind::ListFiles => {
                let path = str_param(job, "path").unwrap_or(".");
                self.files.list_files(path)
            }
            JobKind::ReadFile => {
                let path = required_param(job, "path")?;
                self.files.read_file(path)
            }
            JobKind::WriteFile => {
                let path = required_param(job, "path")?;
                let content = required_param(job, "content")?;
                self.files.write_file(path, content)
            }
            JobKind::LlmCall | JobKind::AgentPlan | JobKind::Selfloop => {
                let bridge = self.bridge.as_ref().ok_or_else(|| {
                    ExecError::Validation("LLM_BRIDGE_URL not configured".to_string())
                })?;
                bridge.submit(job).await
            }
        }
    }
}

fn str_param<'a>(job: &'a Job, key: &str) -> Option<&'a str> {
    job.payload.params.get(key).and_then(|v| v.as_str())
}

fn required_param<'a>(job: &'a Job, key: &str) -> Result<&'a str, ExecError> {
    str_param(job, key)
        .ok_or_else(|| ExecError::Validation(format!("missing '{key}' parameter")))
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;

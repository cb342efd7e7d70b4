// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client for the LLM bridge (`POST /api/job/submit`).
//!
//! The bridge speaks the UnifiedJob/UnifiedResult contract. For
//! `selfloop_markdown` the answer is raw Markdown, forwarded to the core
//! unparsed; for other LLM kinds a structured LCP action in the reply is
//! preferred and a plain answer degrades to an `analysis_result`.

use crate::executor::ExecError;
use serde::{Deserialize, Serialize};
use sheratan_core::{Job, ResponseFormat, ResultAction};
use std::time::Duration;
use tracing::{debug, warn};

/// Retry bound for bridge calls.
const MAX_ATTEMPTS: u32 = 3;
/// First backoff step; doubles per attempt.
const BACKOFF_BASE: Duration = Duration::from_millis(250);

/// Wire request for the bridge.
#[derive(Debug, Serialize)]
struct UnifiedJob<'a> {
    job_id: &'a str,
    kind: &'a str,
    payload: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    llm_backend: Option<&'a str>,
}

/// Wire response from the bridge.
#[derive(Debug, Deserialize)]
struct UnifiedResult {
    #[allow(dead_code)]
    job_id: String,
    ok: bool,
    #[serde(default)]
    execution_time_ms: u64,
    #[serde(default)]
    llm_backend: Option<String>,
    /// Raw model answer (always present for selfloop_markdown).
    #[serde(default)]
    answer: Option<String>,
    /// Structured LCP action, when the bridge already parsed one.
    #[serde(default)]
    action: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// HTTP client for one bridge endpoint.
#[derive(Debug, Clone)]
pub struct BridgeClient {
    client: reqwest::Client,
    base_url: String,
}

impl BridgeClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self { client, base_url: base_url.trim_end_matches('/').to_string() }
    }

    /// Submit a job to the bridge, retrying with exponential backoff on
    /// transport errors and 5xx.
    pub async fn submit(&self, job: &Job) -> Result<ResultAction, ExecError> {
        let url = format!("{}/api/job/submit", self.base_url);
        let payload = serde_json::to_value(&job.payload)
            .map_err(|e| ExecError::Validation(e.to_string()))?;
        let request = UnifiedJob {
            job_id: job.id.as_str(),
            kind: job.kind.as_str(),
            payload: &payload,
            session_id: None,
            llm_backend: None,
        };

        let mut last_error = String::new();
        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                let backoff = BACKOFF_BASE * 2u32.saturating_pow(attempt - 1);
                debug!(attempt, backoff_ms = backoff.as_millis() as u64, "bridge retry");
                tokio::time::sleep(backoff).await;
            }
            match self.client.post(&url).json(&request).send().await {
                Ok(response) if response.status().is_server_error() => {
                    last_error = format!("bridge HTTP {}", response.status().as_u16());
                }
                Ok(response) if !response.status().is_success() => {
                    // 4xx is not retryable; the job itself is bad.
                    return Err(ExecError::Validation(format!(
                        "bridge refused job: HTTP {}",
                        response.status().as_u16()
                    )));
                }
                Ok(response) => {
                    let unified: UnifiedResult = response
                        .json()
                        .await
                        .map_err(|e| ExecError::Bridge(format!("unreadable bridge reply: {e}")))?;
                    return self.map_result(job, unified);
                }
                Err(e) if e.is_timeout() => {
                    last_error = "bridge request timed out".to_string();
                }
                Err(e) => {
                    last_error = e.to_string();
                }
            }
            warn!(attempt, error = %last_error, "bridge call failed");
        }
        Err(ExecError::Bridge(last_error))
    }

    fn map_result(&self, job: &Job, unified: UnifiedResult) -> Result<ResultAction, ExecError> {
        if !unified.ok {
            return Err(ExecError::Bridge(
                unified.error.unwrap_or_else(|| "bridge reported failure".to_string()),
            ));
        }

        // Which validator family applies is decided by response_format,
        // never by sniffing the content.
        if job.payload.response_format == Some(ResponseFormat::SelfloopMarkdown) {
            let markdown = unified.answer.unwrap_or_default();
            return Ok(ResultAction::SelfloopResult { markdown });
        }

        if let Some(raw) = unified.action {
            return serde_json::from_value::<ResultAction>(raw)
                .map_err(|e| ExecError::Bridge(format!("invalid LCP action from bridge: {e}")));
        }

        let summary = unified
            .answer
            .ok_or_else(|| ExecError::Bridge("bridge reply carried no answer".to_string()))?;
        Ok(ResultAction::AnalysisResult {
            summary,
            data: serde_json::json!({
                "llm_backend": unified.llm_backend,
                "execution_time_ms": unified.execution_time_ms,
            }),
        })
    }
}

#[cfg(test)]
#[path = "llm_tests.rs"]
mod tests;

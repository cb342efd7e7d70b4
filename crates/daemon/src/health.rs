// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded-timeout HTTP health probes over the configured service set.

use crate::env::Config;
use serde::Deserialize;
use sheratan_core::{Clock, HealthReport, ServiceHealth, ServiceStatus, SystemClock};
use std::time::Duration;
use tracing::debug;

/// Per-service probe timeout.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// One probed service.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSpec {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub critical: bool,
}

/// Probe runner over a fixed service set.
pub struct HealthProbe {
    client: reqwest::Client,
    services: Vec<ServiceSpec>,
}

impl HealthProbe {
    pub fn new(services: Vec<ServiceSpec>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PROBE_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, services }
    }

    /// Build the service set from configuration: the LLM bridge (critical)
    /// plus any extras from `HEALTH_SERVICES` (a JSON array of
    /// `{name, url, critical}` objects).
    pub fn from_config(config: &Config) -> Self {
        let mut services = Vec::new();
        if let Some(url) = &config.llm_bridge_url {
            services.push(ServiceSpec {
                name: "llm_bridge".to_string(),
                url: url.clone(),
                critical: true,
            });
        }
        if let Ok(raw) = std::env::var("HEALTH_SERVICES") {
            match serde_json::from_str::<Vec<ServiceSpec>>(&raw) {
                Ok(extra) => services.extend(extra),
                Err(e) => debug!(error = %e, "ignoring malformed HEALTH_SERVICES"),
            }
        }
        Self::new(services)
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Probe every service once. A service is `active` when it answers any
    /// HTTP status within the timeout; transport errors mark it `down`.
    pub async fn probe(&self) -> HealthReport {
        let clock = SystemClock;
        let mut services = Vec::with_capacity(self.services.len());
        for spec in &self.services {
            let started = std::time::Instant::now();
            let outcome = self.client.get(&spec.url).send().await;
            let latency_ms = started.elapsed().as_millis() as u64;
            let (status, detail) = match outcome {
                Ok(response) if response.status().is_server_error() => (
                    ServiceStatus::Down,
                    Some(format!("HTTP {}", response.status().as_u16())),
                ),
                Ok(_) => (ServiceStatus::Active, None),
                Err(e) => (ServiceStatus::Down, Some(e.to_string())),
            };
            debug!(service = %spec.name, status = %status, latency_ms, "health probe");
            services.push(ServiceHealth {
                name: spec.name.clone(),
                critical: spec.critical,
                status,
                latency_ms: Some(latency_ms),
                detail,
            });
        }
        HealthReport { services, checked_at_ms: clock.epoch_ms() }
    }
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Metric sinks
//!
//! A sink receives every decoded [`MetricPoint`]. The HTTP sink posts each
//! point as a JSON document to a time-series store; delivery is best effort
//! and failed points are not retried.

use std::fmt::Debug;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;

use super::MetricPoint;
use crate::config::TelemetryConfig;
use crate::error::GatewayError;

/// Destination of decoded telemetry.
#[async_trait]
pub trait MetricSink: Send + Sync + Debug {
    async fn publish(&self, point: &MetricPoint) -> Result<(), GatewayError>;

    fn sink_type(&self) -> &str;
}

/// Posts metric points to an HTTP endpoint (KairosDB `/api/v1/datapoints`).
#[derive(Debug, Clone)]
pub struct HttpMetricSink {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpMetricSink {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    /// Set the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &TelemetryConfig) -> Self {
        Self::new(config.endpoint.clone())
            .with_timeout(Duration::from_secs(config.timeout_seconds))
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl MetricSink for HttpMetricSink {
    async fn publish(&self, point: &MetricPoint) -> Result<(), GatewayError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header(
                "User-Agent",
                concat!("mote-gateway/", env!("CARGO_PKG_VERSION")),
            )
            .json(point)
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Sink(format!(
                "{} answered HTTP {}: {}",
                self.endpoint, status, body
            )));
        }

        debug!("Posted {} to {}", point.name, self.endpoint);
        Ok(())
    }

    fn sink_type(&self) -> &str {
        "http"
    }
}

/// Keeps published points in memory, for tests and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    points: Arc<Mutex<Vec<MetricPoint>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn points(&self) -> Vec<MetricPoint> {
        self.points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl MetricSink for MemorySink {
    async fn publish(&self, point: &MetricPoint) -> Result<(), GatewayError> {
        self.points
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(point.clone());
        Ok(())
    }

    fn sink_type(&self) -> &str {
        "memory"
    }
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Telemetry forwarding configuration

use serde::{Deserialize, Serialize};

/// Where and how decoded telemetry is forwarded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TelemetryConfig {
    /// Run the serial read loop and forward metric points.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Datapoint ingestion URL of the time-series store (KairosDB REST API).
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Timeout of a single POST to the store, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_endpoint() -> String {
    "http://localhost:8080/api/v1/datapoints".to_string()
}

fn default_timeout_seconds() -> u64 {
    10
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            endpoint: default_endpoint(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

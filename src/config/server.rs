// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP server configuration
//!
//! Settings of the Rocket server receiving actuator commands from the
//! supervisory client.

use serde::{Deserialize, Serialize};

/// Configuration for the command HTTP server.
///
/// # Example
///
/// ```
/// use mote_gateway::config::ServerConfig;
///
/// let server = ServerConfig {
///     port: 5001,
///     ..ServerConfig::default()
/// };
/// assert_eq!(server.address, "0.0.0.0");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ServerConfig {
    /// Start the HTTP server. Without it the gateway only forwards telemetry.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Address the server binds to.
    #[serde(default = "default_address")]
    pub address: String,

    /// TCP port, 1-65534. Default is 5000.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Identifier sent in the `Server` header.
    #[serde(default = "default_name")]
    pub name: String,

    /// TLS certificate in PEM format, Base64 encoded. Requires `key`.
    #[serde(default)]
    pub cert: Option<String>,

    /// TLS private key in PEM format, Base64 encoded. Requires `cert`.
    #[serde(default)]
    pub key: Option<String>,
}

fn default_enabled() -> bool {
    true
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_name() -> String {
    format!("MoteGateway/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            address: default_address(),
            port: default_port(),
            name: default_name(),
            cert: None,
            key: None,
        }
    }
}

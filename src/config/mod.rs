// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the mote gateway
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings for the gateway. The configuration is backed by a
//! YAML file and validated against a JSON schema before being deserialized.
//!
//! ## Configuration Structure
//!
//! - `server`: HTTP server receiving actuator commands
//! - `serial`: serial link to the mote network and its timing constraints
//! - `telemetry`: time-series endpoint receiving decoded telemetry
//!
//! ## Usage
//!
//! ```no_run
//! use mote_gateway::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_args(
//!     Some(5001),                        // HTTP port
//!     Some("127.0.0.1".to_string()),     // HTTP address
//!     Some("/dev/ttyUSB0".to_string()),  // Serial port
//!     None,                              // Baud rate
//!     None,                              // Sink endpoint
//!     None,                              // Telemetry enabled
//! );
//!
//! println!("Serial port: {}", config.serial.port);
//! ```

pub mod serial;
pub mod server;
pub mod telemetry;
pub mod utils;

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use serial::{SerialConfig, MIN_WRITE_INTERVAL_MS};
pub use server::ServerConfig;
pub use telemetry::TelemetryConfig;
pub use utils::{is_valid_ip_address, output_config_schema, CONFIG_SCHEMA};

/// Root configuration structure for the gateway.
///
/// Every section falls back to its defaults when missing from the file, so an
/// empty document is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    /// Settings for the HTTP command server.
    #[serde(default)]
    pub server: ServerConfig,

    /// Settings for the serial link to the motes.
    #[serde(default)]
    pub serial: SerialConfig,

    /// Settings for telemetry forwarding.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load configuration from a file
    ///
    /// A missing file is replaced by the default configuration, which is also
    /// written at `path`. A file that fails validation leaves a
    /// `*.sample.yaml` with the defaults next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        let config = match Self::from_yaml_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration error in {}: {:#}", path.display(), err);
                if let Err(sample_err) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", sample_err);
                }
                return Err(err.context(format!(
                    "Invalid configuration file {}",
                    path.display()
                )));
            }
        };

        Ok(config)
    }

    /// Parse and validate a YAML document.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        // An empty document means "all defaults"
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }

        let yaml_value: serde_yml::Value =
            serde_yml::from_str(contents).context("Failed to parse YAML configuration")?;

        let json_value =
            serde_json::to_value(&yaml_value).context("Failed to convert YAML to JSON")?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;
        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)
            .context("Failed to build JSON schema validator")?;

        debug!("Validating configuration against schema");
        if let Err(error) = validator.validate(&json_value) {
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        let config: Config = serde_yml::from_str(contents)
            .context("Failed to deserialize configuration")?;

        utils::validate_specific_rules(&config)?;

        Ok(config)
    }

    /// Save the configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Apply command line arguments to override configuration values.
    ///
    /// Only arguments that were actually provided override the file.
    ///
    /// # Parameters
    ///
    /// * `web_port` - TCP port for the HTTP server
    /// * `web_address` - Network address for the HTTP server to bind to
    /// * `serial_port` - Device path of the serial link
    /// * `baud_rate` - Serial line speed
    /// * `sink_endpoint` - Time-series endpoint URL
    /// * `telemetry_enabled` - Enable or disable telemetry forwarding
    pub fn apply_args(
        &mut self,
        web_port: Option<u16>,
        web_address: Option<String>,
        serial_port: Option<String>,
        baud_rate: Option<u32>,
        sink_endpoint: Option<String>,
        telemetry_enabled: Option<bool>,
    ) {
        if let Some(web_port) = web_port {
            debug!("Overriding port from command line: {}", web_port);
            self.server.port = web_port;
        }

        if let Some(web_address) = web_address {
            debug!("Overriding address from command line: {}", web_address);
            self.server.address = web_address;
        }

        if let Some(serial_port) = serial_port {
            debug!("Overriding serial port from command line: {}", serial_port);
            self.serial.port = serial_port;
        }

        if let Some(baud_rate) = baud_rate {
            debug!("Overriding baud rate from command line: {}", baud_rate);
            self.serial.baud_rate = baud_rate;
        }

        if let Some(endpoint) = sink_endpoint {
            debug!("Overriding sink endpoint from command line: {}", endpoint);
            self.telemetry.endpoint = endpoint;
        }

        if let Some(enabled) = telemetry_enabled {
            debug!("Overriding telemetry enabled from command line: {}", enabled);
            self.telemetry.enabled = enabled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_yaml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.serial.write_interval_ms, 400);
        assert_eq!(config.serial.baud_rate, 115_200);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config = Config::from_yaml_str(
            r#"
serial:
  port: /dev/ttyUSB1
telemetry:
  endpoint: "https://metrics.example.org/api/v1/datapoints"
"#,
        )
        .unwrap();

        assert_eq!(config.serial.port, "/dev/ttyUSB1");
        assert_eq!(config.serial.baud_rate, 115_200);
        assert_eq!(
            config.telemetry.endpoint,
            "https://metrics.example.org/api/v1/datapoints"
        );
        assert_eq!(config.server, ServerConfig::default());
    }

    #[test]
    fn test_apply_args_overrides_only_given_values() {
        let mut config = Config::default();
        config.apply_args(
            Some(9000),
            None,
            Some("/dev/ttyACM0".to_string()),
            None,
            None,
            Some(false),
        );

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.address, "0.0.0.0");
        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 115_200);
        assert!(!config.telemetry.enabled);
    }
}

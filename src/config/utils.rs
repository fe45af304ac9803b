// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use base64::Engine;
use log::{debug, warn};

use super::{Config, MIN_WRITE_INTERVAL_MS};

/// JSON schema the YAML configuration is validated against.
pub const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line.
///
/// # Example
///
/// ```bash
/// ./mote_gateway --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **TLS Configuration**: a certificate requires a key and vice versa, both valid base64
/// - **Port Range**: the HTTP port is within 1-65534
/// - **Serial link**: the port path is not empty and the baud rate is not zero
/// - **Telemetry endpoint**: the URL uses the http or https scheme
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    if let Some(cert) = &config.server.cert {
        if config.server.key.is_none() {
            anyhow::bail!("SSL certificate provided without a key");
        }

        let _ = base64::engine::general_purpose::STANDARD
            .decode(cert)
            .context("SSL certificate is not valid base64")?;
    }

    if let Some(key) = &config.server.key {
        if config.server.cert.is_none() {
            anyhow::bail!("SSL key provided without a certificate");
        }

        let _ = base64::engine::general_purpose::STANDARD
            .decode(key)
            .context("SSL key is not valid base64")?;
    }

    if config.server.port < 1 || config.server.port > 65534 {
        anyhow::bail!("Invalid port number: {}", config.server.port);
    }

    if !is_valid_ip_address(&config.server.address) {
        // Hostnames are accepted, Rocket resolves them at bind time
        warn!(
            "Potentially invalid address format: {}",
            config.server.address
        );
    }

    if config.serial.port.trim().is_empty() {
        anyhow::bail!("Serial port path cannot be empty");
    }

    if config.serial.baud_rate == 0 {
        anyhow::bail!("Serial baud rate must be greater than zero");
    }

    if config.serial.write_interval_ms < MIN_WRITE_INTERVAL_MS {
        anyhow::bail!(
            "Serial write interval {} ms is below the {} ms the motes require",
            config.serial.write_interval_ms,
            MIN_WRITE_INTERVAL_MS
        );
    }

    let endpoint = &config.telemetry.endpoint;
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        anyhow::bail!(
            "Invalid telemetry endpoint {}: must start with http:// or https://",
            endpoint
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_specific_rules() {
        assert!(validate_specific_rules(&Config::default()).is_ok());
    }

    #[test]
    fn test_cert_without_key_is_rejected() {
        let mut config = Config::default();
        config.server.cert = Some("SGVsbG8gV29ybGQ=".to_string());

        let err = validate_specific_rules(&config).unwrap_err();
        assert!(err.to_string().contains("SSL certificate provided without a key"));
    }

    #[test]
    fn test_invalid_endpoint_scheme_is_rejected() {
        let mut config = Config::default();
        config.telemetry.endpoint = "ftp://metrics.local/api".to_string();
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn test_zero_baud_rate_is_rejected() {
        let mut config = Config::default();
        config.serial.baud_rate = 0;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn test_short_write_interval_is_rejected() {
        let mut config = Config::default();
        config.serial.write_interval_ms = 0;
        assert!(validate_specific_rules(&config).is_err());

        config.serial.write_interval_ms = MIN_WRITE_INTERVAL_MS - 1;
        assert!(validate_specific_rules(&config).is_err());

        config.serial.write_interval_ms = MIN_WRITE_INTERVAL_MS;
        assert!(validate_specific_rules(&config).is_ok());
    }

    #[test]
    fn test_ip_address_check() {
        assert!(is_valid_ip_address("192.168.1.20"));
        assert!(is_valid_ip_address("::1"));
        assert!(is_valid_ip_address("localhost"));
        assert!(!is_valid_ip_address("not an address"));
    }

    #[test]
    fn test_embedded_schema_is_valid_json() {
        let schema: serde_json::Value = serde_json::from_str(CONFIG_SCHEMA).unwrap();
        assert!(schema["properties"]["serial"].is_object());
    }
}

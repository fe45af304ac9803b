// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use mote_gateway::config::Config;
use std::fs;
use std::path::Path;
use std::sync::Once;
use tempfile::tempdir;

static INIT: Once = Once::new();

// Setup logger for tests
fn setup() {
    INIT.call_once(|| {
        env_logger::builder()
            .filter_level(log::LevelFilter::Debug)
            .is_test(true)
            .init();
    });
}

#[test]
fn test_config_deserialization_error_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Valid YAML, wrong types
    let invalid_yaml = r#"
server:
  port: "not-an-integer"
  address: 12345
  enabled: "true"
serial:
  baud_rate: []
"#;
    fs::write(&config_path, invalid_yaml)?;

    let result = Config::from_file(&config_path);
    assert!(result.is_err(), "Config loading should have failed");

    let sample_path = config_path.with_extension("sample.yaml");
    assert!(
        Path::new(&sample_path).exists(),
        "Sample config file was not created"
    );

    let sample_config = Config::from_file(&sample_path)?;
    assert_eq!(sample_config, Config::default());

    Ok(())
}

#[test]
fn test_config_validation_error_creates_sample_file() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("gateway.yaml");

    // Port out of range
    let invalid_config = r#"
server:
  port: 99999
  address: "127.0.0.1"
serial:
  port: "/dev/ttyS2"
"#;
    fs::write(&config_path, invalid_config)?;

    let result = Config::from_file(&config_path);
    let message = format!("{:#}", result.expect_err("Config loading should have failed"));
    assert!(message.contains("gateway.yaml"), "unexpected error: {}", message);

    let sample_path = temp_dir.path().join("gateway.sample.yaml");
    assert!(sample_path.exists(), "Sample config file was not created");

    // The invalid file is left untouched
    assert_eq!(fs::read_to_string(&config_path)?, invalid_config);

    Ok(())
}

#[test]
fn test_config_yaml_syntax_error() -> Result<()> {
    setup();
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, "server: [unclosed\n")?;

    assert!(Config::from_file(&config_path).is_err());
    assert!(config_path.with_extension("sample.yaml").exists());

    Ok(())
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

// Main entry point for the mote gateway daemon

use anyhow::Result;
use clap::Parser;
use log::info;
use mote_gateway::config::{self, Config};
use mote_gateway::daemon::Daemon;
use std::path::PathBuf;
use tokio::signal;

/// HTTP to Modbus ASCII gateway for serial mote networks
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (default: config.yaml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Validate a configuration file and exit
    #[arg(long)]
    validate_config: Option<PathBuf>,

    /// Print the configuration JSON schema and exit
    #[arg(long)]
    show_config_schema: bool,

    /// Web server port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Web server address
    #[arg(short = 'a', long)]
    address: Option<String>,

    /// Serial device connected to the mote network
    #[arg(long)]
    serial_port: Option<String>,

    /// Serial baud rate
    #[arg(long)]
    baud_rate: Option<u32>,

    /// Time-series store endpoint receiving telemetry
    #[arg(long)]
    sink_endpoint: Option<String>,

    /// Do not forward telemetry
    #[arg(long)]
    no_telemetry: bool,

    /// Enable debug logging
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Disable logging
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,
}

#[rocket::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.quiet {
        log::LevelFilter::Off
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    if args.show_config_schema {
        return config::output_config_schema();
    }

    if let Some(validate_path) = args.validate_config {
        if !validate_path.exists() {
            return Err(anyhow::anyhow!(
                "Configuration file does not exist: {}",
                validate_path.display()
            ));
        }

        Config::from_file(&validate_path)
            .map_err(|err| anyhow::anyhow!("Configuration validation failed: {:#}", err))?;
        println!("Configuration file is valid: {}", validate_path.display());
        return Ok(());
    }

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from("config.yaml"));
    let mut config = Config::from_file(&config_path)?;

    config.apply_args(
        args.port,
        args.address.clone(),
        args.serial_port.clone(),
        args.baud_rate,
        args.sink_endpoint.clone(),
        args.no_telemetry.then_some(false),
    );

    info!(
        "Starting gateway on {} at {} baud",
        config.serial.port, config.serial.baud_rate
    );
    let mut daemon = Daemon::new();
    daemon.launch(&config).await?;

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Received shutdown signal, terminating daemon");
            daemon.shutdown();
            daemon.join().await?;
        }
        Err(err) => {
            eprintln!("Error waiting for shutdown signal: {}", err);
        }
    }

    Ok(())
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Build and inspect Modbus ASCII frames from the command line.
//!
//! ```text
//! frame_tool build --address A0 --command 3 --payload 6162
//! frame_tool parse ':A0036162636465666768696A6BFB'
//! ```

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use mote_gateway::modbus::{self, FunctionCode};
use mote_gateway::telemetry::MetricPoint;

/// Modbus ASCII frame builder and decoder for mote traffic
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    action: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    /// Print the frame for an address, function code and payload
    Build {
        /// Mote address, hexadecimal
        #[arg(long)]
        address: String,

        /// Function code (1, 3, 5 or 6)
        #[arg(long)]
        command: u8,

        /// Payload bytes, hexadecimal
        #[arg(long, default_value = "")]
        payload: String,
    },
    /// Decode a received frame
    Parse {
        /// Frame text, starting with ':'
        frame: String,
    },
}

fn parse_hex_byte(text: &str) -> Result<u8> {
    u8::from_str_radix(text, 16).with_context(|| format!("'{}' is not a hexadecimal byte", text))
}

fn parse_hex_bytes(text: &str) -> Result<Vec<u8>> {
    if text.len() % 2 != 0 {
        return Err(anyhow!("payload must have an even number of hex digits"));
    }
    (0..text.len())
        .step_by(2)
        .map(|i| parse_hex_byte(text.get(i..i + 2).unwrap_or_default()))
        .collect()
}

fn main() -> Result<()> {
    env_logger::init_from_env(
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "warn"),
    );

    match Args::parse().action {
        Action::Build {
            address,
            command,
            payload,
        } => {
            let address = parse_hex_byte(&address)?;
            let function = FunctionCode::from_u8(command)
                .ok_or_else(|| anyhow!("unsupported function code {}", command))?;
            let payload = parse_hex_bytes(&payload)?;
            print!("{}", modbus::build(address, function, &payload));
        }
        Action::Parse { frame } => {
            let parsed = modbus::parse(&frame)?;
            println!("Address:  {:#04X}", parsed.address);
            match parsed.function_code() {
                Some(function) => println!("Command:  {} ({})", parsed.command, function),
                None => println!("Command:  {} (unknown)", parsed.command),
            }
            let payload: String = parsed.payload.iter().map(|b| format!("{:02X}", b)).collect();
            println!("Payload:  {} ({} bytes)", payload, parsed.payload.len());

            if let Some(trailer) = &parsed.trailer {
                println!("Coordinates: {}", trailer.coordinates.join(", "));
                println!("MAC hash:    {}", trailer.mac_hash);
                println!(
                    "Scales:      spatial {} temporal {}",
                    trailer.spatial_scale, trailer.temporal_scale
                );
            }

            match MetricPoint::from_frame(&parsed) {
                Ok(Some(point)) => println!("{}", serde_json::to_string_pretty(&point)?),
                Ok(None) => {}
                Err(err) => println!("No metric point: {}", err),
            }
        }
    }

    Ok(())
}

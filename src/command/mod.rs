// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Actuator command dispatch
//!
//! Turns the named parameters of an HTTP request into Modbus write frames
//! and sends them through the shared [`SerialChannel`]. One frame is written
//! per (parameter, address) pair, in request order, and every parameter is
//! validated before the first frame goes out.

pub mod parameter;

pub use parameter::{CommandParameter, DataKind};

use std::sync::Arc;

use log::{debug, info};

use crate::error::GatewayError;
use crate::modbus;
use crate::serial::SerialChannel;

/// A frame ready to be written, with what it was built from for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedWrite {
    pub address: u8,
    pub parameter: String,
    pub frame: String,
}

/// Sends actuator commands to the motes.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    channel: Arc<SerialChannel>,
}

impl CommandDispatcher {
    pub fn new(channel: Arc<SerialChannel>) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &Arc<SerialChannel> {
        &self.channel
    }

    /// Validate every parameter and build the frames to write, without
    /// touching the serial link.
    pub fn plan<'a, I>(params: I) -> Result<Vec<PlannedWrite>, GatewayError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut writes = Vec::new();

        for (name, raw_value) in params {
            let parameter: CommandParameter = name.parse()?;
            let value = parameter.kind.encode_value(raw_value)?;
            let payload = parameter.payload(value);
            let function = parameter.kind.write_function();

            for &address in &parameter.addresses {
                debug!(
                    "{}: {} {:#04X} channel {:#04X} <- {}",
                    name, function, address, parameter.channel, value
                );
                writes.push(PlannedWrite {
                    address,
                    parameter: name.to_string(),
                    frame: modbus::build(address, function, &payload),
                });
            }
        }

        Ok(writes)
    }

    /// Write every command of a request to the motes.
    ///
    /// Returns the number of frames written. Nothing is written when any
    /// parameter is invalid.
    pub async fn dispatch<'a, I>(&self, params: I) -> Result<usize, GatewayError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let writes = Self::plan(params)?;

        for write in &writes {
            debug!(
                "Writing to serial for {} (mote {:#04X}): {}",
                write.parameter,
                write.address,
                write.frame.trim_end()
            );
            self.channel.write(write.frame.as_bytes()).await?;
        }

        if !writes.is_empty() {
            info!("Dispatched {} command frame(s) to the motes", writes.len());
        }
        Ok(writes.len())
    }
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Metric points decoded from telemetry frames
//!
//! ## Payload layout
//!
//! Read responses start with the declared byte count; the fields below are
//! offsets into the bytes that follow it, all big-endian:
//!
//! | Bytes | Field |
//! |-------|-------|
//! | 0..2 | offset (register or coil number) |
//! | 2..5 | value |
//! | 5..13 | timestamp |
//! | 13..15 | reserved |
//! | 15..19 | tstp_si |
//!
//! The remaining tags come from the frame trailer, see
//! [`crate::modbus::Trailer`].

use std::ops::Range;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::modbus::{FunctionCode, ParsedFrame};

const OFFSET: Range<usize> = 0..2;
const VALUE: Range<usize> = 2..5;
const TIMESTAMP: Range<usize> = 5..13;
const TSTP_SI: Range<usize> = 15..19;

/// Minimum number of data bytes a telemetry payload must carry.
pub const MIN_DATA_LEN: usize = TSTP_SI.end;

/// Tags attached to every point, all as strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricTags {
    pub coordinate_x: String,
    pub coordinate_y: String,
    pub coordinate_z: String,
    pub coordinate_t: String,
    pub tstp_si: String,
    pub mac_hash: String,
    pub spatial_scale: String,
    pub temporal_scale: String,
}

/// One timestamped value, in the shape expected by the time-series store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub name: String,
    pub value: f64,
    pub timestamp: u64,
    pub tags: MetricTags,
}

/// Kind of telemetry carried by a frame, from its function code.
pub fn metric_kind(function: FunctionCode) -> Option<&'static str> {
    match function {
        FunctionCode::ReadHoldingRegister => Some("numeric"),
        FunctionCode::ReadCoils => Some("binary"),
        FunctionCode::WriteSingleCoil | FunctionCode::WriteHoldingRegister => None,
    }
}

fn be_uint(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, byte| (acc << 8) | u64::from(*byte))
}

impl MetricPoint {
    /// Decode the metric carried by a frame.
    ///
    /// Returns `Ok(None)` for frames that carry no telemetry (any function
    /// code other than Read Coils and Read Holding Register).
    pub fn from_frame(frame: &ParsedFrame) -> Result<Option<Self>, GatewayError> {
        let Some(kind) = frame.function_code().and_then(metric_kind) else {
            return Ok(None);
        };

        let trailer = frame.trailer.as_ref().ok_or_else(|| {
            GatewayError::format(format!(
                "telemetry frame from {:#04X} is too short to carry its trailer",
                frame.address
            ))
        })?;

        let data = frame.payload.get(1..).unwrap_or_default();
        if data.len() < MIN_DATA_LEN {
            return Err(GatewayError::format(format!(
                "telemetry payload from {:#04X} has {} data bytes, expected at least {}",
                frame.address,
                data.len(),
                MIN_DATA_LEN
            )));
        }

        if let Some(declared) = frame.declared_size() {
            if usize::from(declared) != data.len() {
                warn!(
                    "Mote {:#04X} declared {} data bytes but sent {}",
                    frame.address,
                    declared,
                    data.len()
                );
            }
        }

        let offset = be_uint(&data[OFFSET]);
        let [x, y, z, t] = &trailer.coordinates;

        Ok(Some(MetricPoint {
            name: format!("{:X}{}{}", frame.address, kind, offset),
            value: be_uint(&data[VALUE]) as f64,
            timestamp: be_uint(&data[TIMESTAMP]),
            tags: MetricTags {
                coordinate_x: x.clone(),
                coordinate_y: y.clone(),
                coordinate_z: z.clone(),
                coordinate_t: t.clone(),
                tstp_si: be_uint(&data[TSTP_SI]).to_string(),
                mac_hash: trailer.mac_hash.clone(),
                spatial_scale: trailer.spatial_scale.clone(),
                temporal_scale: trailer.temporal_scale.clone(),
            },
        }))
    }
}

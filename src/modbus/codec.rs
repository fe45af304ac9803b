// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus ASCII frame codec
//!
//! Frames exchanged with the motes look like:
//!
//! ```text
//! :AACCDD...DDLL\r\n
//! ```
//!
//! | Field | Meaning |
//! |-------|---------|
//! | `AA`  | mote address, 2 hex digits |
//! | `CC`  | function code, 2 hex digits |
//! | `DD`  | payload bytes as hex pairs |
//! | `LL`  | LRC checksum, 2 hex digits |
//!
//! Frames built by the gateway carry `channel ‖ value` as payload. Read
//! responses sent by the motes start their payload with the declared byte
//! count, which [`parse`] reports as [`ParsedFrame::declared_size`] without
//! checking it.
//!
//! Telemetry frames also carry a trailer (coordinates, MAC hash and scale
//! factors) that is read straight from fixed character positions of the
//! frame text, see [`Trailer`].

use std::fmt;

use crate::error::GatewayError;

/// Start-of-frame marker.
pub const FRAME_START: char = ':';

/// End-of-frame terminator appended by [`build`].
pub const FRAME_END: &str = "\r\n";

/// `:` + address + command + checksum.
const MIN_FRAME_LEN: usize = 7;

/// One character per coordinate component, x then y, z and t.
const COORDINATES_START: usize = 15;
const MAC_HASH_START: usize = 55;
const MAC_HASH_END: usize = MAC_HASH_START + 10;
const SPATIAL_SCALE_AT: usize = MAC_HASH_END;
const TEMPORAL_SCALE_AT: usize = MAC_HASH_END + 1;
const TRAILER_END: usize = TEMPORAL_SCALE_AT + 1;

/// Subset of Modbus function codes understood by the motes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FunctionCode {
    ReadCoils = 0x01,
    ReadHoldingRegister = 0x03,
    WriteSingleCoil = 0x05,
    WriteHoldingRegister = 0x06,
}

impl FunctionCode {
    pub fn from_u8(code: u8) -> Option<Self> {
        match code {
            0x01 => Some(FunctionCode::ReadCoils),
            0x03 => Some(FunctionCode::ReadHoldingRegister),
            0x05 => Some(FunctionCode::WriteSingleCoil),
            0x06 => Some(FunctionCode::WriteHoldingRegister),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl From<FunctionCode> for u8 {
    fn from(code: FunctionCode) -> Self {
        code.code()
    }
}

impl fmt::Display for FunctionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FunctionCode::ReadCoils => "ReadCoils",
            FunctionCode::ReadHoldingRegister => "ReadHoldingRegister",
            FunctionCode::WriteSingleCoil => "WriteSingleCoil",
            FunctionCode::WriteHoldingRegister => "WriteHoldingRegister",
        };
        write!(f, "{} ({:#04X})", name, self.code())
    }
}

/// Positional fields carried by telemetry frames outside the decoded payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trailer {
    /// x, y, z and t components, in that order.
    pub coordinates: [String; 4],
    pub mac_hash: String,
    pub spatial_scale: String,
    pub temporal_scale: String,
}

impl Trailer {
    /// Extract the trailer from a frame text, if the frame is long enough to
    /// hold every field in front of its checksum.
    fn extract(text: &str) -> Option<Self> {
        if text.len() < TRAILER_END + 2 {
            return None;
        }

        let field = |start: usize, end: usize| text.get(start..end).map(str::to_string);
        let coordinate = |index: usize| {
            let at = COORDINATES_START + index;
            field(at, at + 1)
        };

        Some(Trailer {
            coordinates: [coordinate(0)?, coordinate(1)?, coordinate(2)?, coordinate(3)?],
            mac_hash: field(MAC_HASH_START, MAC_HASH_END)?,
            spatial_scale: field(SPATIAL_SCALE_AT, SPATIAL_SCALE_AT + 1)?,
            temporal_scale: field(TEMPORAL_SCALE_AT, TEMPORAL_SCALE_AT + 1)?,
        })
    }
}

/// A frame decoded by [`parse`].
///
/// The function code is kept raw so that frames with codes the gateway does
/// not handle can still be inspected and skipped by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFrame {
    pub address: u8,
    pub command: u8,
    pub payload: Vec<u8>,
    pub trailer: Option<Trailer>,
}

impl ParsedFrame {
    pub fn function_code(&self) -> Option<FunctionCode> {
        FunctionCode::from_u8(self.command)
    }

    /// First payload byte, the byte count announced by read responses.
    pub fn declared_size(&self) -> Option<u8> {
        self.payload.first().copied()
    }
}

/// Longitudinal redundancy check over a byte sequence.
pub fn lrc(bytes: impl IntoIterator<Item = u8>) -> u8 {
    let sum = bytes.into_iter().fold(0u8, |acc, byte| acc.wrapping_add(byte));
    (sum ^ 0xFF).wrapping_add(1)
}

fn frame_lrc(address: u8, command: u8, payload: &[u8]) -> u8 {
    lrc([address, command].into_iter().chain(payload.iter().copied()))
}

/// Build the ASCII text of a frame, terminator included.
pub fn build(address: u8, command: FunctionCode, payload: &[u8]) -> String {
    let command = command.code();
    let mut frame = String::with_capacity(MIN_FRAME_LEN + payload.len() * 2 + FRAME_END.len());

    frame.push(FRAME_START);
    frame.push_str(&format!("{:02X}{:02X}", address, command));
    for byte in payload {
        frame.push_str(&format!("{:02X}", byte));
    }
    frame.push_str(&format!("{:02X}", frame_lrc(address, command, payload)));
    frame.push_str(FRAME_END);

    frame
}

fn hex_byte(text: &str, at: usize) -> Result<u8, GatewayError> {
    let digits = text
        .get(at..at + 2)
        .ok_or_else(|| GatewayError::format(format!("truncated frame at offset {}", at)))?;
    u8::from_str_radix(digits, 16).map_err(|_| {
        GatewayError::format(format!("invalid hex pair {:?} at offset {}", digits, at))
    })
}

/// Parse and validate a frame text.
///
/// Trailing `\r` and `\n` are ignored. Fails with [`GatewayError::Format`]
/// when the text is not a structurally valid frame and with
/// [`GatewayError::ChecksumMismatch`] when the LRC does not match.
pub fn parse(text: &str) -> Result<ParsedFrame, GatewayError> {
    let text = text.trim_end_matches(['\r', '\n']);

    if text.is_empty() {
        return Err(GatewayError::format("empty frame"));
    }
    if !text.starts_with(FRAME_START) {
        return Err(GatewayError::format(format!(
            "frame must start with '{}'",
            FRAME_START
        )));
    }
    if !text.is_ascii() {
        return Err(GatewayError::format("frame contains non-ASCII characters"));
    }
    if text.len() < MIN_FRAME_LEN {
        return Err(GatewayError::format(format!(
            "frame too short: {} characters",
            text.len()
        )));
    }
    if (text.len() - 1) % 2 != 0 {
        return Err(GatewayError::format("odd number of hex digits"));
    }

    let address = hex_byte(text, 1)?;
    let command = hex_byte(text, 3)?;
    let checksum_at = text.len() - 2;
    let payload = (5..checksum_at)
        .step_by(2)
        .map(|at| hex_byte(text, at))
        .collect::<Result<Vec<u8>, _>>()?;
    let found = hex_byte(text, checksum_at)?;

    let expected = frame_lrc(address, command, &payload);
    if expected != found {
        return Err(GatewayError::ChecksumMismatch { expected, found });
    }

    Ok(ParsedFrame {
        address,
        command,
        payload,
        trailer: Trailer::extract(text),
    })
}

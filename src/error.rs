// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error taxonomy shared by the codec, the serial channel, the command
//! dispatcher and the telemetry ingester.
//!
//! Application plumbing (configuration loading, daemon startup) keeps using
//! `anyhow`; everything that crosses the gateway core reports one of these
//! variants so callers can decide between retrying, skipping a frame or
//! answering an HTTP client with the right status.

use thiserror::Error;

/// Errors raised by the gateway core.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Malformed frame structure, prefix or length.
    #[error("Malformed frame: {0}")]
    Format(String),

    /// The LRC computed over the frame bytes differs from the transmitted one.
    #[error("Frame checksum mismatch: expected {expected:#04X}, found {found:#04X}")]
    ChecksumMismatch { expected: u8, found: u8 },

    /// Malformed HTTP command parameter name or value.
    #[error("Invalid command parameter: {0}")]
    Validation(String),

    /// Underlying serial I/O failure.
    #[error("Serial transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// Telemetry could not be delivered to the time-series sink.
    #[error("Metric sink error: {0}")]
    Sink(String),
}

impl GatewayError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        GatewayError::Format(message.into())
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        GatewayError::Validation(message.into())
    }

    /// `true` for the errors that only invalidate a single received frame.
    pub fn is_frame_error(&self) -> bool {
        matches!(
            self,
            GatewayError::Format(_) | GatewayError::ChecksumMismatch { .. }
        )
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Sink(err.to_string())
    }
}

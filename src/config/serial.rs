// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serial link configuration

use serde::{Deserialize, Serialize};

/// Shortest spacing between two frames the motes can handle, in milliseconds.
pub const MIN_WRITE_INTERVAL_MS: u64 = 400;

/// Configuration of the serial link shared with the motes.
///
/// # Fields
///
/// * `port` - Device path of the serial port (default: `/dev/ttyS2`)
/// * `baud_rate` - Line speed (default: 115200)
/// * `write_interval_ms` - Minimum delay between two frames sent to the motes (default and minimum: 400)
/// * `read_retries` - Consecutive failed reads tolerated before the link is reported broken (default: 5)
/// * `retry_backoff_ms` - Delay before the first read retry, doubled on each attempt (default: 50)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerialConfig {
    #[serde(default = "default_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// The motes drop frames that arrive closer than this to the previous one.
    /// Values below [`MIN_WRITE_INTERVAL_MS`] are rejected.
    #[serde(default = "default_write_interval_ms")]
    pub write_interval_ms: u64,

    #[serde(default = "default_read_retries")]
    pub read_retries: u32,

    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

fn default_port() -> String {
    "/dev/ttyS2".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_write_interval_ms() -> u64 {
    MIN_WRITE_INTERVAL_MS
}

fn default_read_retries() -> u32 {
    5
}

fn default_retry_backoff_ms() -> u64 {
    50
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            write_interval_ms: default_write_interval_ms(),
            read_retries: default_read_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

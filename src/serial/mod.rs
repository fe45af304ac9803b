// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Shared access to the serial link
//!
//! The HTTP handlers and the telemetry loop all talk to the motes through one
//! serial port. [`SerialChannel`] owns that port together with the instant of
//! the last write, and serializes every I/O call behind a single async mutex:
//!
//! - writes wait until `write_interval` has elapsed since the previous write,
//!   so the motes never receive two frames closer than that;
//! - readers give the lock back every 100 ms while waiting for a line, so
//!   writers are never starved by a quiet network;
//! - failed reads are retried with exponential backoff and escalate as
//!   [`GatewayError::Transport`] after `read_retries` consecutive failures.
//!
//! One channel is built at startup and shared by `Arc` between all callers.

pub mod mock;
pub mod tokio_port;

pub use mock::{MockHandle, MockTransport};
pub use tokio_port::TokioSerialTransport;

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::Mutex;
use tokio::time::{self, Instant};

use crate::config::{SerialConfig, MIN_WRITE_INTERVAL_MS};
use crate::error::GatewayError;

/// Upper bound for the delay between two read attempts.
const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// Longest time a reader keeps the link while waiting for a line.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Byte-level access to the physical link.
#[async_trait]
pub trait SerialTransport: Send + std::fmt::Debug {
    /// Close the underlying port (if open) and open it again.
    async fn reopen(&mut self) -> io::Result<()>;

    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    async fn flush(&mut self) -> io::Result<()>;

    /// Read bytes up to and including the next `\n`.
    ///
    /// Must be cancel safe: when the future is dropped, bytes of the
    /// unfinished line are kept for the next call.
    async fn read_line(&mut self) -> io::Result<Vec<u8>>;

    /// Human readable name of the link, used in logs.
    fn name(&self) -> &str;
}

/// Timing parameters of a [`SerialChannel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelSettings {
    /// Minimum delay between the end of a write and the next one.
    pub write_interval: Duration,
    /// Consecutive failed reads tolerated before giving up.
    pub read_retries: u32,
    /// Delay before the first read retry, doubled at each further attempt.
    pub retry_backoff: Duration,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            write_interval: Duration::from_millis(400),
            read_retries: 5,
            retry_backoff: Duration::from_millis(50),
        }
    }
}

impl From<&SerialConfig> for ChannelSettings {
    /// The write interval never goes below [`MIN_WRITE_INTERVAL_MS`], even
    /// for a configuration that skipped validation.
    fn from(config: &SerialConfig) -> Self {
        Self {
            write_interval: Duration::from_millis(
                config.write_interval_ms.max(MIN_WRITE_INTERVAL_MS),
            ),
            read_retries: config.read_retries,
            retry_backoff: Duration::from_millis(config.retry_backoff_ms),
        }
    }
}

#[derive(Debug)]
struct LinkState {
    transport: Box<dyn SerialTransport>,
    last_write: Option<Instant>,
}

/// Exclusive, rate-limited access to the serial link.
#[derive(Debug)]
pub struct SerialChannel {
    link: Mutex<LinkState>,
    settings: ChannelSettings,
    name: String,
}

impl SerialChannel {
    /// Take ownership of a transport and reset it.
    ///
    /// The transport is closed and reopened under the channel lock so the link
    /// starts in a known state whatever the previous session left behind.
    pub async fn open(
        transport: Box<dyn SerialTransport>,
        settings: ChannelSettings,
    ) -> Result<Self, GatewayError> {
        let name = transport.name().to_string();
        let channel = Self {
            link: Mutex::new(LinkState {
                transport,
                last_write: None,
            }),
            settings,
            name,
        };

        {
            let mut link = channel.link.lock().await;
            link.transport.reopen().await?;
        }
        debug!("Serial link {} reset", channel.name);

        Ok(channel)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn settings(&self) -> ChannelSettings {
        self.settings
    }

    /// Write one frame, waiting for the inter-write delay first.
    pub async fn write(&self, bytes: &[u8]) -> Result<(), GatewayError> {
        let mut link = self.link.lock().await;

        if let Some(last_write) = link.last_write {
            time::sleep_until(last_write + self.settings.write_interval).await;
        }

        let result = async {
            link.transport.write_all(bytes).await?;
            link.transport.flush().await
        }
        .await;
        // The mote may have seen part of the frame, keep the spacing anyway.
        link.last_write = Some(Instant::now());
        result?;

        debug!(
            "Wrote {} bytes to {}: {}",
            bytes.len(),
            self.name,
            String::from_utf8_lossy(bytes).trim_end()
        );
        Ok(())
    }

    /// Read one line of text from the link.
    ///
    /// Blocks until a line is available. Transport and UTF-8 decoding
    /// failures are retried; the last failure is returned once the retry
    /// budget is exhausted.
    pub async fn read_line(&self) -> Result<String, GatewayError> {
        let mut failures = 0u32;

        loop {
            let attempt = {
                let mut link = self.link.lock().await;
                match time::timeout(READ_POLL_INTERVAL, link.transport.read_line()).await {
                    Ok(attempt) => attempt,
                    Err(_) => continue,
                }
            };

            let error = match attempt {
                Ok(bytes) => match String::from_utf8(bytes) {
                    Ok(line) => return Ok(line),
                    Err(err) => io::Error::new(io::ErrorKind::InvalidData, err),
                },
                Err(err) => err,
            };

            failures += 1;
            if failures > self.settings.read_retries {
                return Err(GatewayError::Transport(error));
            }

            let backoff = self.backoff(failures);
            warn!(
                "Read from {} failed (attempt {}/{}): {}, retrying in {:?}",
                self.name,
                failures,
                self.settings.read_retries + 1,
                error,
                backoff
            );
            time::sleep(backoff).await;
        }
    }

    fn backoff(&self, failures: u32) -> Duration {
        let factor = 2u32.saturating_pow(failures.saturating_sub(1));
        self.settings
            .retry_backoff
            .saturating_mul(factor)
            .min(MAX_RETRY_BACKOFF)
    }
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serial read loop forwarding telemetry to a [`MetricSink`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, error, info, warn};

use super::{MetricPoint, MetricSink};
use crate::error::GatewayError;
use crate::modbus;
use crate::serial::SerialChannel;

/// Counters kept by the read loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub lines: u64,
    pub published: u64,
    pub skipped: u64,
    pub rejected: u64,
    pub sink_failures: u64,
}

/// Reads frames from the serial link and forwards their telemetry.
#[derive(Debug)]
pub struct TelemetryIngester {
    channel: Arc<SerialChannel>,
    sink: Arc<dyn MetricSink>,
    running: Arc<AtomicBool>,
}

impl TelemetryIngester {
    pub fn new(
        channel: Arc<SerialChannel>,
        sink: Arc<dyn MetricSink>,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            channel,
            sink,
            running,
        }
    }

    /// Decode one received line.
    ///
    /// Returns `Ok(None)` for valid frames carrying no telemetry.
    pub fn decode_line(line: &str) -> Result<Option<MetricPoint>, GatewayError> {
        let frame = modbus::parse(line.trim_end_matches(['\r', '\n']))?;
        MetricPoint::from_frame(&frame)
    }

    /// Handle one received line: decode it and publish the resulting point.
    ///
    /// Frame and sink errors are logged and counted, never returned.
    pub async fn handle_line(&self, line: &str, stats: &mut IngestStats) {
        stats.lines += 1;

        let point = match Self::decode_line(line) {
            Ok(Some(point)) => point,
            Ok(None) => {
                debug!("Ignoring frame without telemetry: {}", line.trim_end());
                stats.skipped += 1;
                return;
            }
            Err(err) => {
                warn!("Dropping frame {:?}: {}", line.trim_end(), err);
                stats.rejected += 1;
                return;
            }
        };

        match self.sink.publish(&point).await {
            Ok(()) => stats.published += 1,
            Err(err) => {
                error!(
                    "Failed to forward {} to {} sink: {}",
                    point.name,
                    self.sink.sink_type(),
                    err
                );
                stats.sink_failures += 1;
            }
        }
    }

    /// Run until the running flag is cleared or the serial link fails for good.
    ///
    /// Only an escalated [`GatewayError::Transport`] ends the loop with an
    /// error; malformed frames and sink failures are skipped.
    pub async fn run(&self) -> Result<IngestStats, GatewayError> {
        info!(
            "Forwarding telemetry from {} to {} sink",
            self.channel.name(),
            self.sink.sink_type()
        );
        let mut stats = IngestStats::default();

        while self.running.load(Ordering::SeqCst) {
            let line = match self.channel.read_line().await {
                Ok(line) => line,
                Err(err) => {
                    error!("Telemetry ingestion stopped: {}", err);
                    return Err(err);
                }
            };
            debug!("Read from serial: {}", line.trim_end());
            self.handle_line(&line, &mut stats).await;
        }

        info!("Telemetry ingestion finished: {:?}", stats);
        Ok(stats)
    }
}

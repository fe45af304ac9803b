// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Telemetry ingestion
//!
//! ```text
//! SerialChannel::read_line ──▶ modbus::parse ──▶ MetricPoint ──▶ MetricSink
//! ```
//!
//! - [`TelemetryIngester`]: the long-running read loop
//! - [`MetricPoint`]: decoding of the fixed telemetry layout
//! - [`MetricSink`]: where points go, [`HttpMetricSink`] in production

pub mod ingester;
pub mod point;
pub mod sink;

pub use ingester::{IngestStats, TelemetryIngester};
pub use point::{metric_kind, MetricPoint, MetricTags};
pub use sink::{HttpMetricSink, MemorySink, MetricSink};

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Mote gateway library
//!
//! Bridges an HTTP control surface and a serial network of wireless motes
//! speaking Modbus ASCII. Actuator commands received over HTTP are turned
//! into write frames; telemetry frames read from the link are decoded and
//! forwarded to a time-series store.

pub mod command;
pub mod config;
pub mod daemon;
pub mod error;
pub mod modbus;
pub mod serial;
pub mod server;
pub mod telemetry;

pub use error::GatewayError;

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus ASCII protocol support
//!
//! The motes only understand a small subset of Modbus, encoded as ASCII hex
//! over the serial link:
//!
//! | Function code | Name | Direction |
//! |---------------|------|-----------|
//! | 0x01 | Read Coils | mote → gateway (binary telemetry) |
//! | 0x03 | Read Holding Register | mote → gateway (numeric telemetry) |
//! | 0x05 | Write Single Coil | gateway → mote (binary actuator) |
//! | 0x06 | Write Holding Register | gateway → mote (numeric actuator) |
//!
//! ## Usage
//!
//! ```
//! use mote_gateway::modbus::{build, parse, FunctionCode};
//!
//! let text = build(0xA0, FunctionCode::WriteHoldingRegister, &[0x00, 0x05, 0x00, 0x2A]);
//! let frame = parse(&text).unwrap();
//! assert_eq!(frame.address, 0xA0);
//! ```

pub mod codec;

pub use codec::{build, lrc, parse, FunctionCode, ParsedFrame, Trailer};

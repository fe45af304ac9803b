// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Actuator command parameters
//!
//! The supervisory client names each request parameter after what it wants
//! to change:
//!
//! ```text
//! LABEL_ADDR[-ADDR...]_KIND_CHANNEL
//! ```
//!
//! * `LABEL` - free description, ignored by the gateway
//! * `ADDR` - mote addresses in hex, `-` separated
//! * `KIND` - `numeric` (holding register) or `binary` (coil)
//! * `CHANNEL` - register or coil number in hex
//!
//! `servo_A0-B1_numeric_05` writes holding register 5 on motes 0xA0 and 0xB1.

use std::fmt;
use std::str::FromStr;

use crate::error::GatewayError;
use crate::modbus::FunctionCode;

/// Kind of point addressed by a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// 16-bit holding register
    Numeric,
    /// Single-bit coil
    Binary,
}

impl DataKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DataKind::Numeric => "numeric",
            DataKind::Binary => "binary",
        }
    }

    /// Function code used to write a point of this kind.
    pub fn write_function(self) -> FunctionCode {
        match self {
            DataKind::Numeric => FunctionCode::WriteHoldingRegister,
            DataKind::Binary => FunctionCode::WriteSingleCoil,
        }
    }

    /// Convert the raw request value into the 16-bit word sent to the mote.
    ///
    /// Binary values are JSON scalars (`true`, `false`, `0`, `1`...), numeric
    /// values are decimal literals truncated toward zero.
    pub fn encode_value(self, raw: &str) -> Result<u16, GatewayError> {
        match self {
            DataKind::Binary => {
                let value: serde_json::Value = serde_json::from_str(raw.trim()).map_err(|_| {
                    GatewayError::validation(format!("binary value {:?} is not JSON", raw))
                })?;
                match value {
                    serde_json::Value::Bool(flag) => Ok(u16::from(flag)),
                    serde_json::Value::Number(number) => number
                        .as_u64()
                        .and_then(|n| u16::try_from(n).ok())
                        .ok_or_else(|| {
                            GatewayError::validation(format!(
                                "binary value {} does not fit in 16 bits",
                                number
                            ))
                        }),
                    other => Err(GatewayError::validation(format!(
                        "binary value must be a boolean, got {}",
                        other
                    ))),
                }
            }
            DataKind::Numeric => {
                let number: f64 = raw.trim().parse().map_err(|_| {
                    GatewayError::validation(format!("numeric value {:?} is not a number", raw))
                })?;
                let truncated = number.trunc();
                if !truncated.is_finite() || truncated < 0.0 || truncated > f64::from(u16::MAX) {
                    return Err(GatewayError::validation(format!(
                        "numeric value {} does not fit in an unsigned 16-bit register",
                        raw
                    )));
                }
                Ok(truncated as u16)
            }
        }
    }
}

impl FromStr for DataKind {
    type Err = GatewayError;

    fn from_str(kind: &str) -> Result<Self, Self::Err> {
        match kind {
            "numeric" => Ok(DataKind::Numeric),
            "binary" => Ok(DataKind::Binary),
            other => Err(GatewayError::validation(format!(
                "unknown data kind {:?}, expected numeric or binary",
                other
            ))),
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decomposed request parameter name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandParameter {
    pub label: String,
    pub addresses: Vec<u8>,
    pub kind: DataKind,
    pub channel: u8,
}

fn hex_byte(field: &str, what: &str, name: &str) -> Result<u8, GatewayError> {
    u8::from_str_radix(field, 16).map_err(|_| {
        GatewayError::validation(format!(
            "{} {:?} in parameter {:?} is not a hex byte",
            what, field, name
        ))
    })
}

impl FromStr for CommandParameter {
    type Err = GatewayError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = name.split('_').collect();
        let [label, addresses, kind, channel] = parts.as_slice() else {
            return Err(GatewayError::validation(format!(
                "parameter {:?} does not match LABEL_ADDR[-ADDR...]_KIND_CHANNEL",
                name
            )));
        };

        let addresses = addresses
            .split('-')
            .map(|address| hex_byte(address, "address", name))
            .collect::<Result<Vec<u8>, _>>()?;

        Ok(CommandParameter {
            label: label.to_string(),
            addresses,
            kind: kind.parse()?,
            channel: hex_byte(channel, "channel", name)?,
        })
    }
}

impl CommandParameter {
    /// Payload written to each addressed mote: channel then value, big-endian.
    pub fn payload(&self, value: u16) -> [u8; 4] {
        let [channel_hi, channel_lo] = u16::from(self.channel).to_be_bytes();
        let [value_hi, value_lo] = value.to_be_bytes();
        [channel_hi, channel_lo, value_hi, value_lo]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decompose_multi_address_numeric() {
        let parameter: CommandParameter = "servo_A0-B1_numeric_05".parse().unwrap();
        assert_eq!(parameter.label, "servo");
        assert_eq!(parameter.addresses, vec![0xA0, 0xB1]);
        assert_eq!(parameter.kind, DataKind::Numeric);
        assert_eq!(parameter.channel, 0x05);
    }

    #[test]
    fn test_decompose_rejects_malformed_names() {
        for name in [
            "servo",
            "servo_A0_numeric",
            "servo_A0_numeric_05_extra",
            "servo_G0_numeric_05",
            "servo_A0-_numeric_05",
            "servo_A0_analog_05",
            "servo_A0_binary_100",
        ] {
            assert!(
                matches!(
                    name.parse::<CommandParameter>(),
                    Err(GatewayError::Validation(_))
                ),
                "{} should be rejected",
                name
            );
        }
    }

    #[test]
    fn test_binary_values() {
        assert_eq!(DataKind::Binary.encode_value("true").unwrap(), 1);
        assert_eq!(DataKind::Binary.encode_value("false").unwrap(), 0);
        assert_eq!(DataKind::Binary.encode_value(" 1 ").unwrap(), 1);
        assert!(DataKind::Binary.encode_value("on").is_err());
        assert!(DataKind::Binary.encode_value("\"true\"").is_err());
        assert!(DataKind::Binary.encode_value("-1").is_err());
    }

    #[test]
    fn test_numeric_values_are_truncated() {
        assert_eq!(DataKind::Numeric.encode_value("42").unwrap(), 42);
        assert_eq!(DataKind::Numeric.encode_value("42.9").unwrap(), 42);
        assert_eq!(DataKind::Numeric.encode_value("-0.5").unwrap(), 0);
        assert_eq!(DataKind::Numeric.encode_value("65535").unwrap(), u16::MAX);
        assert!(DataKind::Numeric.encode_value("65536").is_err());
        assert!(DataKind::Numeric.encode_value("-3").is_err());
        assert!(DataKind::Numeric.encode_value("NaN").is_err());
        assert!(DataKind::Numeric.encode_value("twelve").is_err());
    }

    #[test]
    fn test_payload_layout() {
        let parameter: CommandParameter = "lamp_0A_binary_1F".parse().unwrap();
        assert_eq!(parameter.payload(1), [0x00, 0x1F, 0x00, 0x01]);
        assert_eq!(parameter.kind.write_function(), FunctionCode::WriteSingleCoil);
    }
}

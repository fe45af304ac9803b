// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Route handlers
//!
//! * `POST /network/`: actuator commands, see [`network_command`]
//! * `GET /health`: liveness report
//! * `OPTIONS /<path..>`: CORS preflight

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use rocket::http::uri::Origin;
use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder};
use rocket::serde::json::Json;
use rocket::{get, options, post, Request, State};
use serde::{Deserialize, Serialize};

use crate::command::CommandDispatcher;
use crate::error::GatewayError;

/// Static facts about the running gateway, managed by Rocket.
#[derive(Debug, Clone)]
pub struct GatewayInfo {
    pub serial_port: String,
    pub started_at: DateTime<Utc>,
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    pub version: String,
    pub serial_port: String,
    pub started_at: DateTime<Utc>,
}

impl<'r> Responder<'r, 'static> for GatewayError {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'static> {
        let status = match &self {
            GatewayError::Validation(_)
            | GatewayError::Format(_)
            | GatewayError::ChecksumMismatch { .. } => Status::BadRequest,
            GatewayError::Transport(_) => Status::ServiceUnavailable,
            GatewayError::Sink(_) => Status::InternalServerError,
        };
        if status.class().is_server_error() {
            warn!("{} {}: {}", request.method(), request.uri(), self);
        }
        (status, self.to_string()).respond_to(request)
    }
}

/// Decode `name=value` pairs of an urlencoded string, keeping their order.
pub fn urlencoded_pairs(raw: &str) -> Result<Vec<(String, String)>, GatewayError> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(raw)
        .map_err(|e| GatewayError::validation(format!("Malformed urlencoded parameters: {}", e)))
}

/// Send actuator commands to the motes.
///
/// Parameters come from the query string, then from an urlencoded form
/// body when there is one. Each name follows
/// `LABEL_ADDR[-ADDR...]_KIND_CHANNEL`, for instance
/// `POST /network/?servo_A0-B1_numeric_05=42`.
///
/// Answers `200` with an empty body once every frame is written, `400` when
/// a parameter is invalid (nothing is written then) and `503` when the
/// serial link fails.
#[post("/network/<_..>", data = "<body>")]
pub async fn network_command(
    origin: &Origin<'_>,
    content_type: Option<&ContentType>,
    body: Option<String>,
    dispatcher: &State<CommandDispatcher>,
) -> Result<(), GatewayError> {
    let mut params = match origin.query() {
        Some(query) => urlencoded_pairs(query.as_str())?,
        None => Vec::new(),
    };

    if let (Some(ct), Some(body)) = (content_type, body.as_deref()) {
        if ct.is_form() {
            params.extend(urlencoded_pairs(body)?);
        } else if !body.trim().is_empty() {
            debug!("Ignoring {} request body", ct);
        }
    }

    dispatcher
        .dispatch(params.iter().map(|(name, value)| (name.as_str(), value.as_str())))
        .await?;
    Ok(())
}

#[get("/health")]
pub async fn health(info: &State<GatewayInfo>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        serial_port: info.serial_port.clone(),
        started_at: info.started_at,
    })
}

/// CORS preflight; the fairing adds the headers.
#[options("/<_path..>")]
pub async fn options(_path: PathBuf) -> Result<(), std::io::Error> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urlencoded_pairs_keep_order_and_decode() {
        let pairs = urlencoded_pairs("lamp_0C_binary_01=true&&servo_A0_numeric_05=12%2E5&flag").unwrap();
        assert_eq!(
            pairs,
            vec![
                ("lamp_0C_binary_01".to_string(), "true".to_string()),
                ("servo_A0_numeric_05".to_string(), "12.5".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_urlencoded_pairs_empty() {
        assert!(urlencoded_pairs("").unwrap().is_empty());
    }

    #[test]
    fn test_urlencoded_pairs_form_encoding() {
        let pairs = urlencoded_pairs("note=two+words&servo_A0_numeric_05=%34%32").unwrap();
        assert_eq!(pairs[0], ("note".to_string(), "two words".to_string()));
        assert_eq!(pairs[1], ("servo_A0_numeric_05".to_string(), "42".to_string()));
    }
}

// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Rocket server builder

use anyhow::{Context, Result};
use base64::prelude::*;
use chrono::Utc;
use log::{debug, info};
use rocket::config::LogLevel;
use rocket::data::{Limits, ToByteUnit};
use rocket::figment::Figment;
use rocket::{routes, Build, Rocket};

use super::cors::CORS;
use super::handlers::{self, GatewayInfo};
use crate::command::CommandDispatcher;
use crate::config::ServerConfig;

/// Build the Rocket figment for a server section.
///
/// TLS is enabled when both `cert` and `key` are set; they hold base64
/// encoded PEM documents.
pub fn server_figment(config: &ServerConfig) -> Result<Figment> {
    let mut figment = rocket::Config::figment()
        .merge(("ident", config.name.clone()))
        .merge((
            "limits",
            Limits::new()
                .limit("form", 64.kibibytes())
                .limit("string", 64.kibibytes()),
        ))
        .merge(("address", config.address.clone()))
        .merge(("port", config.port))
        .merge(("log_level", LogLevel::Normal));

    if let (Some(cert), Some(key)) = (&config.cert, &config.key) {
        debug!("SSL certificates found in configuration, enabling TLS");

        let cert_data = BASE64_STANDARD
            .decode(cert)
            .context("Server certificate is not valid base64")?;
        let key_data = BASE64_STANDARD
            .decode(key)
            .context("Server key is not valid base64")?;

        figment = figment
            .merge(("tls.certs", cert_data))
            .merge(("tls.key", key_data));

        info!("TLS enabled for web server");
    }

    Ok(figment)
}

/// Build a Rocket instance serving the gateway routes.
///
/// ### Parameters
///
/// * `figment` - Rocket configuration (address, port, TLS...)
/// * `dispatcher` - Command dispatcher bound to the shared serial channel
pub async fn build_rocket(figment: Figment, dispatcher: CommandDispatcher) -> Rocket<Build> {
    let info = GatewayInfo {
        serial_port: dispatcher.channel().name().to_string(),
        started_at: Utc::now(),
    };

    rocket::custom(figment)
        .attach(CORS)
        .mount(
            "/",
            routes![
                handlers::network_command,
                handlers::health,
                handlers::options,
            ],
        )
        .manage(dispatcher)
        .manage(info)
}

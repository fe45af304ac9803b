// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! HTTP surface of the gateway
//!
//! A Rocket server exposing the command endpoint and a health check. The
//! [`CommandDispatcher`](crate::command::CommandDispatcher) is managed state,
//! so every request shares the single serial channel opened at startup.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use mote_gateway::command::CommandDispatcher;
//! use mote_gateway::config::ServerConfig;
//! use mote_gateway::serial::{ChannelSettings, SerialChannel, TokioSerialTransport};
//! use mote_gateway::server;
//!
//! async fn start_server() -> anyhow::Result<()> {
//!     let transport = TokioSerialTransport::new("/dev/ttyS2", 115_200);
//!     let channel = SerialChannel::open(Box::new(transport), ChannelSettings::default()).await?;
//!     let dispatcher = CommandDispatcher::new(Arc::new(channel));
//!
//!     let figment = server::server_figment(&ServerConfig::default())?;
//!     server::build_rocket(figment, dispatcher).await.launch().await?;
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod cors;
pub mod handlers;

pub use self::builder::{build_rocket, server_figment};
pub use self::handlers::{GatewayInfo, HealthReport};

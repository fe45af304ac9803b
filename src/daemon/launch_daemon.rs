// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::{Context, Result};
use log::{debug, error, info};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time;

use crate::command::CommandDispatcher;
use crate::config::Config;
use crate::serial::{ChannelSettings, SerialChannel, TokioSerialTransport};
use crate::server::{build_rocket, server_figment};
use crate::telemetry::{HttpMetricSink, MetricSink, TelemetryIngester};

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// Background tasks of the gateway sharing one serial channel
pub struct Daemon {
    tasks: Vec<JoinHandle<Result<()>>>,
    running: Arc<AtomicBool>,
    channel: Option<Arc<SerialChannel>>,
}

impl Default for Daemon {
    fn default() -> Self {
        Self::new()
    }
}

impl Daemon {
    /// Create a new daemon instance
    pub fn new() -> Self {
        Daemon {
            tasks: Vec::new(),
            running: Arc::new(AtomicBool::new(true)),
            channel: None,
        }
    }

    /// Open the configured serial port and launch every enabled task
    pub async fn launch(&mut self, config: &Config) -> Result<()> {
        let transport = TokioSerialTransport::from_config(&config.serial);
        let channel = SerialChannel::open(
            Box::new(transport),
            ChannelSettings::from(&config.serial),
        )
        .await
        .with_context(|| format!("Failed to open serial port {}", config.serial.port))?;

        let sink = Arc::new(HttpMetricSink::from_config(&config.telemetry));
        self.launch_with_channel(config, Arc::new(channel), sink)
            .await
    }

    /// Launch every enabled task on an already opened channel
    pub async fn launch_with_channel(
        &mut self,
        config: &Config,
        channel: Arc<SerialChannel>,
        sink: Arc<dyn MetricSink>,
    ) -> Result<()> {
        self.channel = Some(channel.clone());

        if config.server.enabled {
            self.start_web_server(config, channel.clone()).await?;
        }

        if config.telemetry.enabled {
            self.start_telemetry(channel, sink)?;
        }

        self.start_heartbeat()?;

        Ok(())
    }

    /// Start the Rocket web server
    async fn start_web_server(&mut self, config: &Config, channel: Arc<SerialChannel>) -> Result<()> {
        info!(
            "Starting web server on {}:{}",
            config.server.address, config.server.port
        );

        let figment = server_figment(&config.server)?;
        let rocket = build_rocket(figment, CommandDispatcher::new(channel)).await;

        let task = tokio::spawn(async move {
            let ignited = rocket.ignite().await?;
            ignited.launch().await?;
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start the telemetry forwarding task
    fn start_telemetry(&mut self, channel: Arc<SerialChannel>, sink: Arc<dyn MetricSink>) -> Result<()> {
        info!("Starting telemetry ingestion");

        let ingester = TelemetryIngester::new(channel, sink, self.running.clone());
        let task = tokio::spawn(async move {
            ingester.run().await?;
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Start a heartbeat task that logs system status periodically
    fn start_heartbeat(&mut self) -> Result<()> {
        debug!("Starting heartbeat monitor");

        let running = self.running.clone();
        let channel_name = self
            .channel
            .as_ref()
            .map(|channel| channel.name().to_string())
            .unwrap_or_default();
        let task = tokio::spawn(async move {
            while running.load(Ordering::SeqCst) {
                debug!("Daemon heartbeat: running on {}", channel_name);
                time::sleep(HEARTBEAT_INTERVAL).await;
            }
            Ok(())
        });

        self.tasks.push(task);
        Ok(())
    }

    /// Channel shared by the tasks, once launched
    pub fn channel(&self) -> Option<&Arc<SerialChannel>> {
        self.channel.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Stop all running tasks
    ///
    /// Clears the running flag, then aborts the tasks: the web server and a
    /// telemetry loop waiting on the serial port do not poll the flag.
    pub fn shutdown(&self) {
        info!("Shutting down daemon tasks");
        self.running.store(false, Ordering::SeqCst);
        for task in &self.tasks {
            task.abort();
        }
    }

    /// Wait for all tasks to complete
    pub async fn join(self) -> Result<()> {
        for task in self.tasks {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Task failed: {:#}", e),
                Err(e) if e.is_cancelled() => debug!("Task cancelled"),
                Err(e) => error!("Task panicked: {}", e),
            }
        }
        Ok(())
    }
}

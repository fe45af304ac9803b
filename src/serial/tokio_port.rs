// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Serial port transport based on `tokio-serial`.

use std::io;

use async_trait::async_trait;
use log::{debug, info};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

use super::SerialTransport;
use crate::config::SerialConfig;

/// A real serial port, 8N1, no read timeout.
#[derive(Debug)]
pub struct TokioSerialTransport {
    path: String,
    baud_rate: u32,
    port: Option<BufReader<SerialStream>>,
    // Bytes of a line not yet terminated, kept across cancelled reads.
    pending: Vec<u8>,
}

impl TokioSerialTransport {
    /// Describe a port without opening it; [`SerialTransport::reopen`] opens it.
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            port: None,
            pending: Vec::new(),
        }
    }

    pub fn from_config(config: &SerialConfig) -> Self {
        Self::new(config.port.clone(), config.baud_rate)
    }

    fn port(&mut self) -> io::Result<&mut BufReader<SerialStream>> {
        let path = &self.path;
        self.port.as_mut().ok_or_else(|| not_open(path))
    }
}

fn not_open(path: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotConnected,
        format!("serial port {} is not open", path),
    )
}

#[async_trait]
impl SerialTransport for TokioSerialTransport {
    async fn reopen(&mut self) -> io::Result<()> {
        self.pending.clear();
        if self.port.take().is_some() {
            debug!("Closed serial port {}", self.path);
        }

        let stream = tokio_serial::new(&self.path, self.baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(io::Error::from)?;

        info!("Opened serial port {} at {} baud", self.path, self.baud_rate);
        self.port = Some(BufReader::new(stream));
        Ok(())
    }

    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port()?.get_mut().write_all(bytes).await
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.port()?.get_mut().flush().await
    }

    async fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let port = self.port.as_mut().ok_or_else(|| not_open(&self.path))?;
        let read = port.read_until(b'\n', &mut self.pending).await?;
        if read == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "serial port reached end of stream",
            ));
        }
        Ok(std::mem::take(&mut self.pending))
    }

    fn name(&self) -> &str {
        &self.path
    }
}

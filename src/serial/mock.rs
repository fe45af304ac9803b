// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! In-memory serial transport
//!
//! [`MockTransport`] stands in for the physical port in tests and dry runs.
//! Lines to be "received" are queued through the paired [`MockHandle`], and
//! every write is recorded with the instant it completed so the channel's
//! rate limiting can be checked. Once every handle is dropped, reads fail
//! with `BrokenPipe`.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::SerialTransport;

#[derive(Debug, Default)]
struct MockLog {
    writes: Vec<(Instant, Vec<u8>)>,
    reopen_count: usize,
    fail_writes: bool,
}

#[derive(Debug, Clone, Default)]
struct SharedLog(Arc<Mutex<MockLog>>);

impl SharedLog {
    fn lock(&self) -> MutexGuard<'_, MockLog> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Serial transport backed by in-memory queues.
#[derive(Debug)]
pub struct MockTransport {
    incoming: mpsc::UnboundedReceiver<io::Result<Vec<u8>>>,
    pending: Vec<u8>,
    log: SharedLog,
}

/// Test-side control of a [`MockTransport`].
#[derive(Debug, Clone)]
pub struct MockHandle {
    incoming: mpsc::UnboundedSender<io::Result<Vec<u8>>>,
    log: SharedLog,
}

impl MockTransport {
    pub fn new() -> (Self, MockHandle) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let log = SharedLog::default();
        (
            Self {
                incoming: receiver,
                pending: Vec::new(),
                log: log.clone(),
            },
            MockHandle {
                incoming: sender,
                log,
            },
        )
    }
}

#[async_trait]
impl SerialTransport for MockTransport {
    async fn reopen(&mut self) -> io::Result<()> {
        self.pending.clear();
        self.log.lock().reopen_count += 1;
        Ok(())
    }

    async fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut log = self.log.lock();
        if log.fail_writes {
            return Err(io::Error::new(io::ErrorKind::Other, "mock write failure"));
        }
        log.writes.push((Instant::now(), bytes.to_vec()));
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn read_line(&mut self) -> io::Result<Vec<u8>> {
        loop {
            if let Some(end) = self.pending.iter().position(|b| *b == b'\n') {
                let rest = self.pending.split_off(end + 1);
                return Ok(std::mem::replace(&mut self.pending, rest));
            }

            match self.incoming.recv().await {
                Some(Ok(chunk)) => self.pending.extend_from_slice(&chunk),
                Some(Err(err)) => return Err(err),
                None if !self.pending.is_empty() => return Ok(std::mem::take(&mut self.pending)),
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "mock serial link closed",
                    ))
                }
            }
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

impl MockHandle {
    /// Queue raw bytes as if the mote had sent them.
    pub fn push_bytes(&self, bytes: impl Into<Vec<u8>>) {
        // The transport may already be gone, which only matters to readers.
        let _ = self.incoming.send(Ok(bytes.into()));
    }

    /// Queue one line, adding the `\r\n` terminator if missing.
    pub fn push_line(&self, line: &str) {
        let mut bytes = line.as_bytes().to_vec();
        if !line.ends_with('\n') {
            bytes.extend_from_slice(b"\r\n");
        }
        self.push_bytes(bytes);
    }

    /// Make the next read fail with the given error kind.
    pub fn push_error(&self, kind: io::ErrorKind) {
        let _ = self
            .incoming
            .send(Err(io::Error::new(kind, "injected mock failure")));
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.log.lock().fail_writes = fail;
    }

    /// Every frame written so far, in order.
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.log
            .lock()
            .writes
            .iter()
            .map(|(_, bytes)| bytes.clone())
            .collect()
    }

    /// Written frames decoded as text.
    pub fn written_frames(&self) -> Vec<String> {
        self.writes()
            .into_iter()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .collect()
    }

    /// Completion instant of each write.
    pub fn write_instants(&self) -> Vec<Instant> {
        self.log.lock().writes.iter().map(|(at, _)| *at).collect()
    }

    pub fn reopen_count(&self) -> usize {
        self.log.lock().reopen_count
    }
}

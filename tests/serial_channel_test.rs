// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the mote-gateway project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use std::io;
use std::sync::Arc;
use std::time::Duration;

use mote_gateway::config::SerialConfig;
use mote_gateway::serial::{ChannelSettings, MockHandle, MockTransport, SerialChannel};
use mote_gateway::GatewayError;
use tokio::time::{self, Instant};

const INTERVAL: Duration = Duration::from_millis(400);

async fn open_channel(settings: ChannelSettings) -> (Arc<SerialChannel>, MockHandle) {
    let (transport, handle) = MockTransport::new();
    let channel = SerialChannel::open(Box::new(transport), settings)
        .await
        .expect("mock channel opens");
    (Arc::new(channel), handle)
}

#[tokio::test(start_paused = true)]
async fn test_open_resets_the_link() {
    let (channel, handle) = open_channel(ChannelSettings::default()).await;
    assert_eq!(handle.reopen_count(), 1);
    assert_eq!(channel.name(), "mock");
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_writes_are_spaced() {
    let (channel, handle) = open_channel(ChannelSettings::default()).await;

    let mut tasks = Vec::new();
    for i in 0..4u8 {
        let channel = channel.clone();
        tasks.push(tokio::spawn(async move {
            channel.write(&[b'0' + i, b'\r', b'\n']).await
        }));
    }
    for task in tasks {
        task.await.expect("writer task").expect("write succeeds");
    }

    let instants = handle.write_instants();
    assert_eq!(instants.len(), 4);
    for pair in instants.windows(2) {
        assert!(pair[1] - pair[0] >= INTERVAL, "writes {:?} apart", pair[1] - pair[0]);
    }

    // Frames are never interleaved
    for frame in handle.writes() {
        assert_eq!(frame.len(), 3);
    }
}

#[tokio::test(start_paused = true)]
async fn test_configured_interval_cannot_drop_below_minimum() {
    let config = SerialConfig {
        write_interval_ms: 0,
        ..SerialConfig::default()
    };
    let (channel, handle) = open_channel(ChannelSettings::from(&config)).await;

    channel.write(b":0C050001\r\n").await.unwrap();
    channel.write(b":0C050000\r\n").await.unwrap();

    let instants = handle.write_instants();
    assert_eq!(instants.len(), 2);
    assert!(instants[1] - instants[0] >= INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn test_first_write_is_immediate() {
    let (channel, handle) = open_channel(ChannelSettings::default()).await;
    let start = Instant::now();

    channel.write(b":A0\r\n").await.unwrap();

    assert_eq!(handle.write_instants(), vec![start]);
}

#[tokio::test(start_paused = true)]
async fn test_failed_write_still_delays_the_next_one() {
    let (channel, handle) = open_channel(ChannelSettings::default()).await;
    let start = Instant::now();

    handle.set_fail_writes(true);
    assert!(matches!(
        channel.write(b"lost\r\n").await,
        Err(GatewayError::Transport(_))
    ));

    handle.set_fail_writes(false);
    channel.write(b"kept\r\n").await.unwrap();

    assert_eq!(handle.written_frames(), vec!["kept\r\n".to_string()]);
    assert!(handle.write_instants()[0] - start >= INTERVAL);
}

#[tokio::test(start_paused = true)]
async fn test_read_line_returns_complete_lines() {
    let (channel, handle) = open_channel(ChannelSettings::default()).await;

    handle.push_bytes(b":A003".to_vec());
    let reader = {
        let channel = channel.clone();
        tokio::spawn(async move { channel.read_line().await })
    };

    // The reader keeps waiting across several poll intervals
    time::sleep(Duration::from_millis(350)).await;
    handle.push_bytes(b"6162\r\n:B0".to_vec());

    let line = reader.await.unwrap().unwrap();
    assert_eq!(line, ":A0036162\r\n");

    handle.push_bytes(b"05\r\n".to_vec());
    assert_eq!(channel.read_line().await.unwrap(), ":B005\r\n");
}

#[tokio::test(start_paused = true)]
async fn test_waiting_reader_does_not_block_writers() {
    let (channel, handle) = open_channel(ChannelSettings::default()).await;

    let reader = {
        let channel = channel.clone();
        tokio::spawn(async move { channel.read_line().await })
    };
    tokio::task::yield_now().await;

    time::timeout(Duration::from_secs(1), channel.write(b":0C05\r\n"))
        .await
        .expect("write is not starved by the reader")
        .unwrap();
    assert_eq!(handle.writes().len(), 1);

    handle.push_line(":0C0100");
    assert_eq!(reader.await.unwrap().unwrap(), ":0C0100\r\n");
}

#[tokio::test(start_paused = true)]
async fn test_read_errors_are_retried() {
    let (channel, handle) = open_channel(ChannelSettings::default()).await;

    handle.push_error(io::ErrorKind::TimedOut);
    handle.push_error(io::ErrorKind::Interrupted);
    handle.push_line(":A001FF");

    assert_eq!(channel.read_line().await.unwrap(), ":A001FF\r\n");
}

#[tokio::test(start_paused = true)]
async fn test_invalid_utf8_is_retried() {
    let (channel, handle) = open_channel(ChannelSettings::default()).await;

    handle.push_bytes(vec![0xFF, 0xFE, b'\n']);
    handle.push_line(":A001FF");

    assert_eq!(channel.read_line().await.unwrap(), ":A001FF\r\n");
}

#[tokio::test(start_paused = true)]
async fn test_read_errors_escalate_after_retries() {
    let settings = ChannelSettings {
        read_retries: 2,
        retry_backoff: Duration::from_millis(100),
        ..ChannelSettings::default()
    };
    let (channel, handle) = open_channel(settings).await;
    for _ in 0..3 {
        handle.push_error(io::ErrorKind::BrokenPipe);
    }
    let start = Instant::now();

    let err = channel.read_line().await.unwrap_err();

    assert!(matches!(err, GatewayError::Transport(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
    // 100 ms then 200 ms of backoff between the three attempts
    assert!(Instant::now() - start >= Duration::from_millis(300));
}

#[tokio::test(start_paused = true)]
async fn test_closed_link_escalates() {
    let (channel, handle) = open_channel(ChannelSettings::default()).await;
    drop(handle);

    assert!(matches!(
        channel.read_line().await,
        Err(GatewayError::Transport(_))
    ));
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use push_client_rs::cfg::config::{Config, ConnectionConfig, Credentials, WorkersConfig};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
};

pub const TEST_USERNAME: &str = "u";
pub const TEST_PASSWORD: &str = "p";

pub async fn fake_server() -> (TcpListener, u16) {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await.expect("bind fake server");
    let port = listener.local_addr().expect("local addr").port();
    (listener, port)
}

pub fn test_config(port: u16, pool_size: u32) -> Config {
    Config {
        credentials: Credentials {
            username: TEST_USERNAME.to_string(),
            password: TEST_PASSWORD.to_string(),
        },
        connection: ConnectionConfig {
            host: "127.0.0.1".to_string(),
            secure: false,
            trust_anchors: None,
            port: Some(port),
            timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(5),
        },
        workers: WorkersConfig { pool_size },
    }
}

/// Reads exactly one ConnectionRequest frame off `socket` and returns its
/// raw body bytes (without the 6-byte header).
pub async fn read_connection_request(socket: &mut TcpStream) -> Vec<u8> {
    let mut header = [0u8; push_client_rs::frame::HEADER_LEN];
    socket.read_exact(&mut header).await.expect("read header");
    let length = u32::from_be_bytes([header[2], header[3], header[4], header[5]]) as usize;
    let mut body = vec![0u8; length];
    socket.read_exact(&mut body).await.expect("read body");
    body
}

pub async fn send_connection_response(socket: &mut TcpStream, status: u16) {
    let mut buf = Vec::with_capacity(10);
    buf.extend_from_slice(&push_client_rs::frame::TYPE_CONNECTION_RESPONSE.to_be_bytes());
    buf.extend_from_slice(&4u32.to_be_bytes());
    buf.extend_from_slice(&status.to_be_bytes());
    buf.extend_from_slice(&0u16.to_be_bytes());
    socket.write_all(&buf).await.expect("write ConnectionResponse");
}

pub async fn send_publish_message(
    socket: &mut TcpStream,
    block_id: u16,
    compression: u8,
    payload: &[u8],
) {
    let mut body = Vec::with_capacity(10 + payload.len());
    body.extend_from_slice(&block_id.to_be_bytes());
    body.extend_from_slice(&1u16.to_be_bytes());
    body.push(compression);
    body.push(0);
    body.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    body.extend_from_slice(payload);

    let mut frame = Vec::with_capacity(6 + body.len());
    frame.extend_from_slice(&push_client_rs::frame::TYPE_PUBLISH_MESSAGE.to_be_bytes());
    frame.extend_from_slice(&(body.len() as u32).to_be_bytes());
    frame.extend_from_slice(&body);

    socket.write_all(&frame).await.expect("write PublishMessage");
}

pub async fn read_publish_message_received(socket: &mut TcpStream) -> (u16, u16) {
    let mut header = [0u8; push_client_rs::frame::HEADER_LEN];
    socket.read_exact(&mut header).await.expect("read ack header");
    let mut body = [0u8; 4];
    socket.read_exact(&mut body).await.expect("read ack body");
    (
        u16::from_be_bytes([body[0], body[1]]),
        u16::from_be_bytes([body[2], body[3]]),
    )
}

//! Byte-stream transports the client can open a push connection over:
//! plaintext TCP on port 3200, or TLS on port 3201.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

mod tls;

use std::path::Path;

use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};

use crate::error::{PushError, Result};

pub const PLAIN_PORT: u16 = 3200;
pub const TLS_PORT: u16 = 3201;

/// Anything the session can read frames from and write acks to.
pub trait Stream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> Stream for T {}

pub type BoxedStream = Box<dyn Stream>;

/// Opens a plaintext TCP connection to `host:port`, defaulting to 3200 when
/// `port` is `None`.
pub async fn connect_plain(host: &str, port: Option<u16>) -> Result<BoxedStream> {
    let stream = TcpStream::connect((host, port.unwrap_or(PLAIN_PORT)))
        .await
        .map_err(|source| PushError::Transport { socket_id: None, source })?;
    stream
        .set_nodelay(true)
        .map_err(|source| PushError::Transport { socket_id: None, source })?;
    Ok(Box::new(stream))
}

/// Opens a TLS connection to `host:port`, defaulting to 3201 when `port` is
/// `None`. When `trust_anchors` is set, the peer certificate must chain to
/// one of those anchors; hostname/SAN verification is never performed (see
/// `tls::ChainOnlyVerifier`). When `trust_anchors` is `None`, any
/// certificate the peer presents is accepted.
pub async fn connect_tls(
    host: &str,
    port: Option<u16>,
    trust_anchors: Option<&Path>,
) -> Result<BoxedStream> {
    let tcp = TcpStream::connect((host, port.unwrap_or(TLS_PORT)))
        .await
        .map_err(|source| PushError::Transport { socket_id: None, source })?;
    tcp.set_nodelay(true)
        .map_err(|source| PushError::Transport { socket_id: None, source })?;

    let connector = tls::build_connector(trust_anchors)?;
    let server_name = tls::server_name(host)?;
    let stream = connector
        .connect(server_name, tcp)
        .await
        .map_err(|source| PushError::Transport { socket_id: None, source })?;
    Ok(Box::new(stream))
}

//! A `Session` is one Monitor subscription: it owns the transport connection
//! used to deliver that Monitor's PublishMessages and the user callback that
//! consumes them.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

use bytes::Bytes;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt, ReadHalf, WriteHalf},
    sync::Mutex,
};

use crate::{
    cfg::config::{ConnectionConfig, Credentials},
    error::{PushError, Result},
    frame::{self, ConnectionResponse, FrameHeader},
    transport::{self, BoxedStream},
};

/// Invoked with one delivered (and, if needed, already-decompressed)
/// payload. Returning `true` acknowledges the message; a panic is treated
/// the same as returning `false`.
pub type Callback = Arc<dyn Fn(Bytes) -> bool + Send + Sync>;

/// What the multiplexer observed when it polled a session's socket.
pub enum PollOutcome {
    /// Nothing arrived within the poll window.
    Idle,
    /// The peer closed the connection.
    PeerClosed,
    /// A frame header was read; the multiplexer must now read its body.
    Header(FrameHeader),
}

pub struct Session {
    pub monitor_id: u32,
    callback: Callback,
    reader: Mutex<Option<ReadHalf<BoxedStream>>>,
    socket_id: AtomicU64,
    has_socket: Mutex<bool>,
}

/// Sentinel socket id meaning "not currently connected".
const NO_SOCKET: u64 = 0;

impl Session {
    pub fn new(monitor_id: u32, callback: Callback) -> Arc<Self> {
        Arc::new(Self {
            monitor_id,
            callback,
            reader: Mutex::new(None),
            socket_id: AtomicU64::new(NO_SOCKET),
            has_socket: Mutex::new(false),
        })
    }

    pub fn socket_id(&self) -> Option<u64> {
        match self.socket_id.load(Ordering::Acquire) {
            NO_SOCKET => None,
            id => Some(id),
        }
    }

    pub fn callback(&self) -> &Callback {
        &self.callback
    }

    /// Opens a fresh transport connection, performs the handshake, and
    /// registers the write half in `writers` keyed by the freshly minted
    /// socket id, which is returned on success.
    pub async fn start(
        &self,
        credentials: &Credentials,
        connection: &ConnectionConfig,
        next_socket_id: &AtomicU64,
        writers: &dashmap::DashMap<u64, Mutex<WriteHalf<BoxedStream>>>,
    ) -> Result<u64> {
        let mut started = self.has_socket.lock().await;
        if *started {
            return Err(PushError::AlreadyStarted { monitor_id: self.monitor_id });
        }

        let mut stream: BoxedStream = if connection.secure {
            transport::connect_tls(
                &connection.host,
                connection.port,
                connection.trust_anchors.as_deref(),
            )
            .await?
        } else {
            transport::connect_plain(&connection.host, connection.port).await?
        };

        self.handshake(&mut stream, credentials, connection).await?;

        let (read_half, write_half) = tokio::io::split(stream);
        let sid = next_socket_id.fetch_add(1, Ordering::AcqRel) + 1;

        writers.insert(sid, Mutex::new(write_half));
        *self.reader.lock().await = Some(read_half);
        self.socket_id.store(sid, Ordering::Release);
        *started = true;

        Ok(sid)
    }

    async fn handshake(
        &self,
        stream: &mut BoxedStream,
        credentials: &Credentials,
        connection: &ConnectionConfig,
    ) -> Result<()> {
        let request = frame::encode_connection_request(
            &credentials.username,
            &credentials.password,
            self.monitor_id,
        );
        stream
            .write_all(&request)
            .await
            .map_err(|source| PushError::Transport { socket_id: None, source })?;

        let mut buf = [0u8; frame::HEADER_LEN + 4];
        tokio::time::timeout(connection.handshake_timeout, stream.read_exact(&mut buf))
            .await
            .map_err(|_| PushError::Handshake {
                monitor_id: self.monitor_id,
                reason: "timed out waiting for ConnectionResponse".to_string(),
            })?
            .map_err(|source| PushError::Transport { socket_id: None, source })?;

        let header = FrameHeader::decode(&buf).ok_or_else(|| PushError::Handshake {
            monitor_id: self.monitor_id,
            reason: "short ConnectionResponse header".to_string(),
        })?;
        if header.frame_type != frame::TYPE_CONNECTION_RESPONSE {
            return Err(PushError::Handshake {
                monitor_id: self.monitor_id,
                reason: format!("unexpected frame type {:#x}", header.frame_type),
            });
        }

        let response =
            ConnectionResponse::decode_body(&buf[frame::HEADER_LEN..]).ok_or_else(|| {
                PushError::Handshake {
                    monitor_id: self.monitor_id,
                    reason: "malformed ConnectionResponse body".to_string(),
                }
            })?;
        if response.status_code != frame::STATUS_OK {
            return Err(PushError::Handshake {
                monitor_id: self.monitor_id,
                reason: format!("server returned status {}", response.status_code),
            });
        }

        Ok(())
    }

    /// Closes the session's socket, if any. Does not touch the client's
    /// registries; the caller is responsible for dropping the matching
    /// entries in the session and writer registries.
    pub async fn stop(&self) {
        *self.reader.lock().await = None;
        self.socket_id.store(NO_SOCKET, Ordering::Release);
        *self.has_socket.lock().await = false;
    }

    /// Attempts to read one frame header within `timeout`. Returns
    /// [`PollOutcome::Idle`] if nothing arrived in time.
    pub async fn poll_once(&self, timeout: std::time::Duration) -> Result<PollOutcome> {
        let mut guard = self.reader.lock().await;
        let Some(reader) = guard.as_mut() else {
            return Ok(PollOutcome::Idle);
        };

        let mut header_buf = [0u8; frame::HEADER_LEN];
        match tokio::time::timeout(timeout, reader.read_exact(&mut header_buf)).await {
            Err(_elapsed) => Ok(PollOutcome::Idle),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Ok(PollOutcome::PeerClosed)
            },
            Ok(Err(source)) => {
                Err(PushError::Transport { socket_id: self.socket_id(), source })
            },
            Ok(Ok(_)) => {
                let header = FrameHeader::decode(&header_buf).ok_or_else(|| {
                    PushError::Protocol {
                        socket_id: self.socket_id(),
                        reason: "impossible: fixed-size header failed to decode"
                            .to_string(),
                    }
                })?;
                Ok(PollOutcome::Header(header))
            },
        }
    }

    /// Reads exactly `len` bytes from the session's socket. Used both for
    /// PublishMessage bodies and to drain unknown frame types.
    pub async fn read_exact_body(&self, len: usize) -> Result<Bytes> {
        let mut guard = self.reader.lock().await;
        let Some(reader) = guard.as_mut() else {
            return Err(PushError::Protocol {
                socket_id: None,
                reason: "read attempted on a stopped session".to_string(),
            });
        };
        let mut buf = vec![0u8; len];
        reader
            .read_exact(&mut buf)
            .await
            .map_err(|source| PushError::Transport { socket_id: self.socket_id(), source })?;
        Ok(Bytes::from(buf))
    }
}

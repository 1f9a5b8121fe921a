//! The single writer task: drains the shared write queue and serializes all
//! outbound writes onto their target socket.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use tokio::{
    io::{AsyncWriteExt, WriteHalf},
    sync::{Mutex, mpsc},
};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::transport::BoxedStream;

pub fn spawn_writer(
    mut rx: mpsc::UnboundedReceiver<(u64, Bytes)>,
    writers: Arc<DashMap<u64, Mutex<WriteHalf<BoxedStream>>>>,
    shutdown: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let item = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                item = rx.recv() => item,
            };
            let Some((socket_id, bytes)) = item else {
                break;
            };

            let Some(entry) = writers.get(&socket_id) else {
                warn!(socket_id, "write targeted an unregistered socket, dropping");
                continue;
            };
            let mut half = entry.lock().await;
            match half.write_all(&bytes).await {
                Ok(()) => trace!(socket_id, len = bytes.len(), "wrote frame"),
                Err(source) => warn!(socket_id, %source, "write failed"),
            }
        }
    })
}

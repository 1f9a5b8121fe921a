//! Bounded callback worker pool: invokes user callbacks off the I/O path and
//! enqueues acknowledgements on success.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{panic::AssertUnwindSafe, sync::Arc};

use bytes::Bytes;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use super::session::Session;
use crate::frame;

/// One delivered payload awaiting callback dispatch.
pub struct CallbackJob {
    pub session: Arc<Session>,
    pub socket_id: u64,
    pub block_id: u16,
    pub payload: Bytes,
}

/// Spawns `pool_size` workers sharing `jobs`. Each worker invokes the
/// owning session's callback and, on success, enqueues a
/// PublishMessageReceived ack onto `writes`.
pub fn spawn_workers(
    pool_size: u32,
    jobs: Arc<Mutex<mpsc::Receiver<CallbackJob>>>,
    writes: mpsc::UnboundedSender<(u64, Bytes)>,
    shutdown: CancellationToken,
) -> Vec<tokio::task::JoinHandle<()>> {
    (0..pool_size)
        .map(|worker_id| {
            let jobs = Arc::clone(&jobs);
            let writes = writes.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move { worker_loop(worker_id, jobs, writes, shutdown).await })
        })
        .collect()
}

async fn worker_loop(
    worker_id: u32,
    jobs: Arc<Mutex<mpsc::Receiver<CallbackJob>>>,
    writes: mpsc::UnboundedSender<(u64, Bytes)>,
    shutdown: CancellationToken,
) {
    loop {
        let job = {
            let mut rx = jobs.lock().await;
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                job = rx.recv() => job,
            }
        };
        let Some(job) = job else {
            break;
        };

        let CallbackJob { session, socket_id, block_id, payload } = job;
        let monitor_id = session.monitor_id;
        let callback = Arc::clone(session.callback());

        let outcome =
            std::panic::catch_unwind(AssertUnwindSafe(move || callback(payload)));

        let acked = match outcome {
            Ok(acked) => acked,
            Err(_) => {
                error!(worker_id, monitor_id, block_id, "callback panicked");
                false
            },
        };

        if acked {
            let ack = frame::encode_publish_message_received(block_id, frame::STATUS_OK);
            if writes.send((socket_id, ack)).is_err() {
                warn!(worker_id, monitor_id, "write queue closed, dropping ack");
            }
        }
    }
}

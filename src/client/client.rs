//! `PushClient` is the façade: it owns the session registry, lazily starts
//! the background writer/multiplexer/worker-pool tasks, and exposes
//! create/stop/restart.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::{
    Arc, Weak,
    atomic::AtomicU64,
};

use bytes::Bytes;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use tokio::{
    io::WriteHalf,
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::{
    multiplexer,
    session::{Callback, Session},
    workers::{self, CallbackJob},
    writer,
};
use crate::{
    cfg::config::Config,
    error::{PushError, Result},
    transport::BoxedStream,
};

const POLL_ROUND: std::time::Duration = std::time::Duration::from_millis(100);

pub struct PushClient {
    config: Config,
    self_weak: OnceCell<Weak<PushClient>>,
    started: OnceCell<()>,

    sessions: DashMap<u64, Arc<Session>>,
    writers: Arc<DashMap<u64, Mutex<WriteHalf<BoxedStream>>>>,
    next_socket_id: AtomicU64,

    write_tx: mpsc::UnboundedSender<(u64, Bytes)>,
    write_rx: Mutex<Option<mpsc::UnboundedReceiver<(u64, Bytes)>>>,

    jobs_tx: mpsc::Sender<CallbackJob>,
    jobs_rx: Arc<Mutex<mpsc::Receiver<CallbackJob>>>,

    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl PushClient {
    pub fn new(config: Config) -> Arc<Self> {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let capacity = config.workers.pool_size.max(1) as usize;
        let (jobs_tx, jobs_rx) = mpsc::channel(capacity);

        let client = Arc::new(Self {
            config,
            self_weak: OnceCell::new(),
            started: OnceCell::new(),
            sessions: DashMap::new(),
            writers: Arc::new(DashMap::new()),
            next_socket_id: AtomicU64::new(0),
            write_tx,
            write_rx: Mutex::new(Some(write_rx)),
            jobs_tx,
            jobs_rx: Arc::new(Mutex::new(jobs_rx)),
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        });
        let weak = Arc::downgrade(&client);
        let _ = client.self_weak.set(weak);
        client
    }

    fn self_arc(&self) -> Arc<PushClient> {
        self.self_weak
            .get()
            .and_then(Weak::upgrade)
            .expect("PushClient always constructed via PushClient::new")
    }

    /// Creates and starts a new session bound to `monitor_id`, lazily
    /// starting the background tasks on first call.
    pub async fn create_session(
        self: &Arc<Self>,
        monitor_id: Option<u32>,
        callback: Callback,
    ) -> Result<Arc<Session>> {
        let monitor_id = monitor_id.ok_or_else(|| {
            PushError::Config("create_session requires a monitor id".to_string())
        })?;

        self.ensure_started().await;

        let session = Session::new(monitor_id, callback);
        let sid = session
            .start(
                &self.config.credentials,
                &self.config.connection,
                &self.next_socket_id,
                &self.writers,
            )
            .await?;
        self.sessions.insert(sid, Arc::clone(&session));
        info!(monitor_id, socket_id = sid, "session started");
        Ok(session)
    }

    async fn ensure_started(&self) {
        if self.started.get().is_some() {
            return;
        }

        let Some(write_rx) = self.write_rx.lock().await.take() else {
            return;
        };

        let writer_handle =
            writer::spawn_writer(write_rx, Arc::clone(&self.writers), self.shutdown.clone());

        let mut worker_handles = workers::spawn_workers(
            self.config.workers.pool_size,
            Arc::clone(&self.jobs_rx),
            self.write_tx.clone(),
            self.shutdown.clone(),
        );

        let mux_handle = multiplexer::spawn_multiplexer(self.self_arc(), POLL_ROUND);

        let mut tasks = self.tasks.lock().await;
        tasks.push(writer_handle);
        tasks.append(&mut worker_handles);
        tasks.push(mux_handle);

        let _ = self.started.set(());
    }

    /// Stops every session and background task. Idempotent.
    pub async fn stop_all(&self) {
        self.shutdown.cancel();

        let handles = {
            let mut tasks = self.tasks.lock().await;
            std::mem::take(&mut *tasks)
        };
        for handle in handles {
            if let Err(source) = handle.await {
                warn!(%source, "background task panicked during shutdown");
            }
        }

        for entry in self.sessions.iter() {
            entry.value().stop().await;
        }
        self.sessions.clear();
        self.writers.clear();
    }

    pub(super) fn sessions(&self) -> &DashMap<u64, Arc<Session>> {
        &self.sessions
    }

    pub(super) fn jobs(&self) -> &mpsc::Sender<CallbackJob> {
        &self.jobs_tx
    }

    pub(super) fn shutdown(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Removes the registry entry for `old_sid` and restarts `session` in
    /// place, re-registering it under the socket id minted by the new
    /// connection. A failed restart drops the session from the registry.
    pub(super) async fn restart_session(&self, old_sid: u64, session: Arc<Session>) {
        self.sessions.remove(&old_sid);
        self.writers.remove(&old_sid);
        session.stop().await;

        match session
            .start(
                &self.config.credentials,
                &self.config.connection,
                &self.next_socket_id,
                &self.writers,
            )
            .await
        {
            Ok(new_sid) => {
                let monitor_id = session.monitor_id;
                self.sessions.insert(new_sid, session);
                info!(monitor_id, old_socket_id = old_sid, new_socket_id = new_sid, "session restarted");
            },
            Err(source) => {
                warn!(old_socket_id = old_sid, %source, "session restart failed, dropping");
            },
        }
    }
}

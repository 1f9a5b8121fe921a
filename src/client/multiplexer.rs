//! The I/O multiplexer: one background task that concurrently polls every
//! registered session's socket, reassembles frames, and hands payloads to
//! the worker pool. Peer-close triggers a session restart.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{io::Read, sync::Arc, time::Duration};

use flate2::read::ZlibDecoder;
use futures_util::stream::{FuturesUnordered, StreamExt};
use tracing::{debug, warn};

use super::{client::PushClient, session::{PollOutcome, Session}, workers::CallbackJob};
use crate::frame::{self, PublishMessage};

pub fn spawn_multiplexer(
    client: Arc<PushClient>,
    round: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move { run(client, round).await })
}

async fn run(client: Arc<PushClient>, round: Duration) {
    loop {
        if client.shutdown().is_cancelled() {
            break;
        }

        let live: Vec<(u64, Arc<Session>)> = client
            .sessions()
            .iter()
            .map(|e| (*e.key(), Arc::clone(e.value())))
            .collect();

        if live.is_empty() {
            tokio::select! {
                _ = client.shutdown().cancelled() => break,
                _ = tokio::time::sleep(round) => {},
            }
            continue;
        }

        let mut polls = FuturesUnordered::new();
        for (sid, session) in live {
            polls.push(async move {
                let outcome = session.poll_once(round).await;
                (sid, session, outcome)
            });
        }

        while let Some((sid, session, outcome)) = polls.next().await {
            match outcome {
                Ok(PollOutcome::Idle) => {},
                Ok(PollOutcome::PeerClosed) => {
                    debug!(socket_id = sid, "peer closed connection, restarting session");
                    client.restart_session(sid, session).await;
                },
                Ok(PollOutcome::Header(header)) => {
                    handle_header(&client, sid, session, header).await;
                },
                Err(source) => {
                    warn!(socket_id = sid, %source, "session poll failed, restarting");
                    client.restart_session(sid, session).await;
                },
            }
        }
    }

    for entry in client.sessions().iter() {
        entry.value().stop().await;
    }
}

async fn handle_header(
    client: &Arc<PushClient>,
    sid: u64,
    session: Arc<Session>,
    header: frame::FrameHeader,
) {
    if header.frame_type != frame::TYPE_PUBLISH_MESSAGE {
        warn!(
            socket_id = sid,
            frame_type = header.frame_type,
            "unexpected frame type in steady state, draining body"
        );
        if let Err(source) = session.read_exact_body(header.length as usize).await {
            warn!(socket_id = sid, %source, "failed to drain unexpected frame body");
        }
        return;
    }

    let body = match session.read_exact_body(header.length as usize).await {
        Ok(body) => body,
        Err(source) => {
            warn!(socket_id = sid, %source, "failed to read PublishMessage body");
            return;
        },
    };

    let Some(message) = PublishMessage::decode_body(body) else {
        warn!(socket_id = sid, "malformed PublishMessage body");
        return;
    };

    let payload = if message.compression == frame::COMPRESSION_ZLIB {
        match decompress(&message.payload) {
            Ok(bytes) => bytes,
            Err(source) => {
                warn!(socket_id = sid, %source, "zlib decompression failed");
                return;
            },
        }
    } else {
        message.payload
    };

    let job = CallbackJob {
        session,
        socket_id: sid,
        block_id: message.block_id,
        payload,
    };

    if client.jobs().send(job).await.is_err() {
        warn!(socket_id = sid, "job queue closed, dropping delivered payload");
    }
}

fn decompress(data: &[u8]) -> std::io::Result<bytes::Bytes> {
    let mut decoder = ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(bytes::Bytes::from(out))
}

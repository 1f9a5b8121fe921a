// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use thiserror::Error;

/// Every failure mode the push client can surface.
#[derive(Debug, Error)]
pub enum PushError {
    #[error("transport error on socket {socket_id:?}: {source}")]
    Transport {
        socket_id: Option<u64>,
        #[source]
        source: std::io::Error,
    },

    #[error("handshake failed for monitor {monitor_id}: {reason}")]
    Handshake { monitor_id: u32, reason: String },

    #[error("session for monitor {monitor_id} is already started")]
    AlreadyStarted { monitor_id: u32 },

    #[error("protocol error on socket {socket_id:?}: {reason}")]
    Protocol { socket_id: Option<u64>, reason: String },

    #[error("callback panicked for monitor {monitor_id}, block {block_id}")]
    Callback { monitor_id: u32, block_id: u16 },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, PushError>;

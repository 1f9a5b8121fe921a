// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::time::Duration;

use anyhow::{Context, Result};
use push_client_rs::{
    cfg::{cli::resolve_config_path, config::Config, logger::init_logger},
    client::PushClient,
};
use tokio::time::sleep;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let _logger_guard = init_logger("config/logger.yaml")?;

    let cfg = resolve_config_path("config/push_client.yaml")
        .and_then(Config::load_from_file)
        .context("failed to resolve or load config")?;

    let client = PushClient::new(cfg);

    let session = client
        .create_session(
            Some(1),
            std::sync::Arc::new(|payload: bytes::Bytes| {
                info!(len = payload.len(), "received payload");
                true
            }),
        )
        .await
        .context("failed to create session")?;
    info!(monitor_id = session.monitor_id, "session ready");

    sleep(Duration::from_secs(30)).await;

    client.stop_all().await;
    Ok(())
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Credentials sent in every ConnectionRequest.
    pub credentials: Credentials,
    /// Transport-level settings (host, secure flag, trust anchors, timeouts).
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Callback worker pool sizing.
    #[serde(default)]
    pub workers: WorkersConfig,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            secure: default_secure(),
            trust_anchors: None,
            port: None,
            timeout: default_connect_timeout(),
            handshake_timeout: default_handshake_timeout(),
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ConnectionConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_secure")]
    pub secure: bool,

    #[serde(default)]
    pub trust_anchors: Option<PathBuf>,

    /// Overrides the default push port (3200 plaintext / 3201 TLS). Mainly
    /// useful for pointing at a local test harness.
    #[serde(default)]
    pub port: Option<u16>,

    #[serde(default = "default_connect_timeout", with = "serde_secs")]
    pub timeout: Duration,

    #[serde(default = "default_handshake_timeout", with = "serde_secs")]
    pub handshake_timeout: Duration,
}

#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct WorkersConfig {
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,
}

impl Default for WorkersConfig {
    fn default() -> Self {
        Self { pool_size: default_pool_size() }
    }
}

fn default_host() -> String {
    "developer.idigi.com".to_string()
}

fn default_secure() -> bool {
    true
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_handshake_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_pool_size() -> u32 {
    20
}

impl Config {
    /// Loads the configuration from YAML, validates it, and returns the
    /// ready-to-use value.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path)?;
        let mut cfg: Config =
            serde_yaml::from_str(&s).context("failed to parse config YAML")?;
        cfg.validate_and_normalize()?;
        Ok(cfg)
    }

    /// Validates invariants.
    pub fn validate_and_normalize(&mut self) -> Result<()> {
        ensure!(
            !self.credentials.username.is_empty(),
            "credentials.username must not be empty"
        );
        ensure!(!self.connection.host.is_empty(), "connection.host must not be empty");
        ensure!(self.workers.pool_size >= 1, "workers.pool_size must be >= 1");

        if !self.connection.secure && self.connection.trust_anchors.is_some() {
            ensure!(
                false,
                "connection.trust_anchors requires connection.secure = true"
            );
        }

        Ok(())
    }
}

/// Serde helpers for representing `Duration` as a number of seconds.
mod serde_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = u64::deserialize(d)?;
        Ok(Duration::from_secs(secs))
    }
}

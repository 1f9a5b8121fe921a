// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::io::Write;

use push_client_rs::cfg::config::Config;

#[test]
fn loads_full_config_from_file() {
    let yaml = r#"
credentials:
  username: alice
  password: s3cret
connection:
  host: push.example.com
  secure: true
  trust_anchors: /etc/push/roots.pem
  handshake_timeout: 5
workers:
  pool_size: 4
"#;
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(yaml.as_bytes()).expect("write yaml");

    let cfg = Config::load_from_file(file.path()).expect("loads");
    assert_eq!(cfg.credentials.username, "alice");
    assert_eq!(cfg.connection.host, "push.example.com");
    assert_eq!(cfg.workers.pool_size, 4);
    assert_eq!(cfg.connection.handshake_timeout.as_secs(), 5);
}

#[test]
fn rejects_zero_worker_pool() {
    let yaml = r#"
credentials:
  username: alice
  password: s3cret
workers:
  pool_size: 0
"#;
    let mut file = tempfile::NamedTempFile::new().expect("create temp file");
    file.write_all(yaml.as_bytes()).expect("write yaml");

    assert!(Config::load_from_file(file.path()).is_err());
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::sync::Arc;

use push_client_rs::{client::PushClient, frame};
use tokio::io::AsyncWriteExt;

use crate::integration_tests::common::{fake_server, read_connection_request, test_config};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handshake_succeeds_on_status_ok() {
    let (listener, port) = fake_server().await;

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let body = read_connection_request(&mut socket).await;
        // proto version (2) + uLen (2) + 'u' + pLen (2) + 'p' + monitorId (4)
        assert_eq!(body, vec![0x00, 0x01, 0x00, 0x01, b'u', 0x00, 0x01, b'p', 0, 0, 0, 7]);

        let mut resp = Vec::new();
        resp.extend_from_slice(&frame::TYPE_CONNECTION_RESPONSE.to_be_bytes());
        resp.extend_from_slice(&4u32.to_be_bytes());
        resp.extend_from_slice(&frame::STATUS_OK.to_be_bytes());
        resp.extend_from_slice(&0u16.to_be_bytes());
        socket.write_all(&resp).await.expect("write response");
        socket
    });

    let client = PushClient::new(test_config(port, 2));
    let callback: push_client_rs::client::Callback = Arc::new(|_| true);
    let session = client
        .create_session(Some(7), callback)
        .await
        .expect("handshake should succeed");

    assert_eq!(session.monitor_id, 7);
    assert!(session.socket_id().is_some());

    server.await.expect("server task");
    client.stop_all().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn handshake_fails_on_unauthorized_status() {
    let (listener, port) = fake_server().await;

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let _ = read_connection_request(&mut socket).await;

        let mut resp = Vec::new();
        resp.extend_from_slice(&frame::TYPE_CONNECTION_RESPONSE.to_be_bytes());
        resp.extend_from_slice(&4u32.to_be_bytes());
        resp.extend_from_slice(&frame::STATUS_UNAUTHORIZED.to_be_bytes());
        resp.extend_from_slice(&0u16.to_be_bytes());
        socket.write_all(&resp).await.expect("write response");
    });

    let client = PushClient::new(test_config(port, 2));
    let callback: push_client_rs::client::Callback = Arc::new(|_| true);
    let result = client.create_session(Some(7), callback).await;

    assert!(result.is_err());
    server.await.expect("server task");
    client.stop_all().await;
}

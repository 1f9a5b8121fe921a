// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use push_client_rs::{client::PushClient, frame};
use tokio::time::timeout;

use crate::integration_tests::common::{
    fake_server, read_connection_request, read_publish_message_received,
    send_connection_response, send_publish_message, test_config,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn truthy_callback_sends_ack() {
    let (listener, port) = fake_server().await;

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let _ = read_connection_request(&mut socket).await;
        send_connection_response(&mut socket, frame::STATUS_OK).await;

        send_publish_message(&mut socket, 42, frame::COMPRESSION_NONE, b"hello").await;

        timeout(Duration::from_secs(5), read_publish_message_received(&mut socket))
            .await
            .expect("ack arrives in time")
    });

    let client = PushClient::new(test_config(port, 2));
    let callback: push_client_rs::client::Callback = Arc::new(|_| true);
    client.create_session(Some(1), callback).await.expect("session starts");

    let (block_id, status) = server.await.expect("server task");
    assert_eq!(block_id, 42);
    assert_eq!(status, frame::STATUS_OK);

    client.stop_all().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn falsy_callback_sends_no_ack() {
    let (listener, port) = fake_server().await;
    let observed_close = Arc::new(AtomicBool::new(false));
    let observed_close_server = Arc::clone(&observed_close);

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let _ = read_connection_request(&mut socket).await;
        send_connection_response(&mut socket, frame::STATUS_OK).await;

        send_publish_message(&mut socket, 99, frame::COMPRESSION_NONE, b"hello").await;

        // No ack should arrive within the window.
        let mut buf = [0u8; 1];
        let res = timeout(Duration::from_millis(500), tokio::io::AsyncReadExt::read(&mut socket, &mut buf)).await;
        observed_close_server.store(res.is_err(), Ordering::SeqCst);
    });

    let client = PushClient::new(test_config(port, 2));
    let callback: push_client_rs::client::Callback = Arc::new(|_| false);
    client.create_session(Some(1), callback).await.expect("session starts");

    server.await.expect("server task");
    assert!(observed_close.load(Ordering::SeqCst), "no bytes should arrive when callback returns false");

    client.stop_all().await;
}

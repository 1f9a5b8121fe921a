// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{
    io::Write,
    sync::{Arc, Mutex},
    time::Duration,
};

use flate2::{Compression, write::ZlibEncoder};
use push_client_rs::{client::PushClient, frame};
use tokio::time::timeout;

use crate::integration_tests::common::{
    fake_server, read_connection_request, send_connection_response, send_publish_message,
    test_config,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn zlib_payload_is_decompressed_before_callback() {
    let (listener, port) = fake_server().await;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"world").expect("compress");
    let compressed = encoder.finish().expect("finish compression");

    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let _ = read_connection_request(&mut socket).await;
        send_connection_response(&mut socket, frame::STATUS_OK).await;
        send_publish_message(&mut socket, 1, frame::COMPRESSION_ZLIB, &compressed).await;
    });

    let received: Arc<Mutex<Option<Vec<u8>>>> = Arc::new(Mutex::new(None));
    let received_cb = Arc::clone(&received);
    let callback: push_client_rs::client::Callback = Arc::new(move |payload| {
        *received_cb.lock().expect("lock") = Some(payload.to_vec());
        true
    });

    let client = PushClient::new(test_config(port, 2));
    client.create_session(Some(1), callback).await.expect("session starts");

    server.await.expect("server task");

    timeout(Duration::from_secs(2), async {
        loop {
            if received.lock().expect("lock").is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("callback invoked in time");

    assert_eq!(received.lock().expect("lock").as_deref(), Some(&b"world"[..]));

    client.stop_all().await;
}

//! Wire framing for the push protocol: four message types over a 6-byte
//! header (`type: u16`, `length: u32`, both big-endian) followed by exactly
//! `length` body bytes.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use bytes::{Buf, BufMut, Bytes, BytesMut};

pub const HEADER_LEN: usize = 6;

pub const TYPE_CONNECTION_REQUEST: u16 = 0x01;
pub const TYPE_CONNECTION_RESPONSE: u16 = 0x02;
pub const TYPE_PUBLISH_MESSAGE: u16 = 0x03;
pub const TYPE_PUBLISH_MESSAGE_RECEIVED: u16 = 0x04;

pub const STATUS_OK: u16 = 200;
pub const STATUS_BAD_REQUEST: u16 = 400;
pub const STATUS_UNAUTHORIZED: u16 = 403;

pub const COMPRESSION_NONE: u8 = 0;
pub const COMPRESSION_ZLIB: u8 = 1;

const PROTOCOL_VERSION: u16 = 1;

/// A decoded frame header: message type and body length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub frame_type: u16,
    pub length: u32,
}

impl FrameHeader {
    pub fn decode(buf: &[u8]) -> Option<Self> {
        if buf.len() < HEADER_LEN {
            return None;
        }
        let mut b = buf;
        let frame_type = b.get_u16();
        let length = b.get_u32();
        Some(FrameHeader { frame_type, length })
    }
}

/// Encodes a ConnectionRequest frame (header + body).
pub fn encode_connection_request(username: &str, password: &str, monitor_id: u32) -> Bytes {
    let user = username.as_bytes();
    let pass = password.as_bytes();
    let body_len = 2 + 2 + user.len() + 2 + pass.len() + 4;

    let mut out = BytesMut::with_capacity(HEADER_LEN + body_len);
    out.put_u16(TYPE_CONNECTION_REQUEST);
    out.put_u32(body_len as u32);
    out.put_u16(PROTOCOL_VERSION);
    out.put_u16(user.len() as u16);
    out.put_slice(user);
    out.put_u16(pass.len() as u16);
    out.put_slice(pass);
    out.put_u32(monitor_id);
    out.freeze()
}

/// The 4-byte body of a ConnectionResponse frame.
#[derive(Debug, Clone, Copy)]
pub struct ConnectionResponse {
    pub status_code: u16,
}

impl ConnectionResponse {
    /// Parses the 4-byte body that follows the 6-byte header.
    pub fn decode_body(body: &[u8]) -> Option<Self> {
        if body.len() < 2 {
            return None;
        }
        let mut b = body;
        let status_code = b.get_u16();
        Some(ConnectionResponse { status_code })
    }
}

/// A decoded PublishMessage body (compression already resolved by the
/// caller).
#[derive(Debug, Clone)]
pub struct PublishMessage {
    pub block_id: u16,
    pub aggregate_count: u16,
    pub compression: u8,
    pub format: u8,
    pub payload: Bytes,
}

impl PublishMessage {
    pub fn decode_body(mut body: Bytes) -> Option<Self> {
        if body.len() < 10 {
            return None;
        }
        let block_id = body.get_u16();
        let aggregate_count = body.get_u16();
        let compression = body.get_u8();
        let format = body.get_u8();
        let payload_size = body.get_u32() as usize;
        if body.len() < payload_size {
            return None;
        }
        let payload = body.split_to(payload_size);
        Some(PublishMessage {
            block_id,
            aggregate_count,
            compression,
            format,
            payload,
        })
    }
}

/// Encodes a PublishMessageReceived acknowledgement frame.
pub fn encode_publish_message_received(block_id: u16, status_code: u16) -> Bytes {
    let mut out = BytesMut::with_capacity(HEADER_LEN + 4);
    out.put_u16(TYPE_PUBLISH_MESSAGE_RECEIVED);
    out.put_u32(4);
    out.put_u16(block_id);
    out.put_u16(status_code);
    out.freeze()
}

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

#![allow(clippy::module_inception)]

pub mod client;
mod multiplexer;
pub mod session;
mod workers;
mod writer;

pub use client::PushClient;
pub use session::{Callback, Session};

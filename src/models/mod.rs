// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod activity;
pub mod credential;
pub mod stream;

pub use activity::{ActivityRecord, ActivityTable};
pub use credential::{Credential, TokenRecord};
pub use stream::{RawStream, StreamPayload, StreamTable, STREAM_KEYS};

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Strava-Sync: incremental local mirror of Strava activities and streams
//!
//! This crate keeps a local copy of an athlete's activity summaries and
//! per-activity streams up to date, handling the OAuth token lifecycle,
//! pagination and rate limits along the way.

pub mod config;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
pub mod time_utils;

pub use config::Settings;
pub use error::{ErrorKind, Result, SyncError};
pub use services::{SyncPipeline, SyncReport};

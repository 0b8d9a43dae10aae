// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - sync logic on top of the stores.

pub mod credentials;
pub mod pipeline;
pub mod strava;

pub use credentials::{acquire_credential, AuthorizationPrompt, ConsolePrompt, ReauthGuard};
pub use pipeline::{SyncPipeline, SyncReport, PAGE_SIZE};
pub use strava::{classify, ApiResponse, StravaApi, StravaClient};

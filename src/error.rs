// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Error types for the sync pipeline.
//!
//! Every failure is one `SyncError`; callers branch on [`SyncError::kind`]
//! rather than on the concrete variant when they only care about the class.

use crate::config::ConfigError;

/// Pipeline error type.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Unauthorized. The access token may be invalid or expired.")]
    Unauthorized,

    #[error("Strava API rate limit exceeded.")]
    RateLimited,

    #[error("API Error {status}: {}", or_unknown(.body))]
    Api { status: u16, body: String },

    #[error("Strava request failed: {0}")]
    Transport(String),

    #[error("Could not decode Strava response: {0}")]
    Decode(String),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

fn or_unknown(body: &str) -> &str {
    if body.is_empty() {
        "Unknown error"
    } else {
        body
    }
}

/// Coarse classification used to decide how far a failure propagates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or unusable configuration. Fatal; the operator must fix it.
    Configuration,
    /// HTTP 401. Drives the credential state machine.
    Authorization,
    /// HTTP 429. Always recoverable by waiting.
    RateLimit,
    /// Any other non-2xx response.
    Api,
    Transport,
    Decode,
    /// Local file I/O or table encoding.
    Storage,
    Internal,
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Config(_) => ErrorKind::Configuration,
            SyncError::Unauthorized => ErrorKind::Authorization,
            SyncError::RateLimited => ErrorKind::RateLimit,
            SyncError::Api { .. } => ErrorKind::Api,
            SyncError::Transport(_) => ErrorKind::Transport,
            SyncError::Decode(_) => ErrorKind::Decode,
            SyncError::Io(_) | SyncError::Csv(_) => ErrorKind::Storage,
            SyncError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// HTTP status carried by this error, if it came from a response.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            SyncError::Unauthorized => Some(401),
            SyncError::RateLimited => Some(429),
            SyncError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        self.kind() == ErrorKind::RateLimit
    }

    pub fn is_unauthorized(&self) -> bool {
        self.kind() == ErrorKind::Authorization
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, SyncError>;

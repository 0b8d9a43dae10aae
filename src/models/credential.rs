// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! OAuth credential model.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::time_utils;

/// Default margin before expiry at which a token is treated as expired.
pub const DEFAULT_EXPIRY_BUFFER_SECS: i64 = 60;

/// Strava access/refresh token pair.
///
/// Secrets stay wrapped; `Debug` output is redacted.
#[derive(Debug, Clone)]
pub struct Credential {
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    /// Access token expiry (Unix seconds)
    pub expires_at: i64,
}

impl Credential {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>, expires_at: i64) -> Self {
        Self {
            access_secret: SecretString::from(access.into()),
            refresh_secret: SecretString::from(refresh.into()),
            expires_at,
        }
    }

    /// Whether the token is expired or expires within `buffer_seconds`.
    pub fn is_expired(&self, buffer_seconds: i64) -> bool {
        self.is_expired_at(time_utils::now_epoch_seconds(), buffer_seconds)
    }

    /// Expiry check against an explicit clock. Expiring exactly at the end
    /// of the buffer counts as expired.
    pub fn is_expired_at(&self, now: i64, buffer_seconds: i64) -> bool {
        self.expires_at <= now.saturating_add(buffer_seconds)
    }

    /// Plaintext form for durable storage.
    pub fn to_record(&self) -> TokenRecord {
        TokenRecord {
            access_token: self.access_secret.expose_secret().to_string(),
            refresh_token: self.refresh_secret.expose_secret().to_string(),
            expires_at: self.expires_at,
        }
    }
}

/// On-disk and on-wire token shape. Unknown fields (`token_type`,
/// `expires_in`, `athlete`) are ignored.
#[derive(Deserialize, Serialize)]
pub struct TokenRecord {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
}

impl From<TokenRecord> for Credential {
    fn from(record: TokenRecord) -> Self {
        Credential::new(record.access_token, record.refresh_token, record.expires_at)
    }
}

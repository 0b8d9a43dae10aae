// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Credential lifecycle.
//!
//! ```text
//! ABSENT ──authorize──▶ AUTHORIZED ──expires──▶ EXPIRED
//!                           ▲                      │
//!                           └──────refresh─────────┘
//! ```
//!
//! A refresh denied with 401 counts against a [`ReauthGuard`] and falls back
//! to interactive authorization. Once the guard trips the run fails with a
//! configuration error, since the stored refresh token has most likely been
//! revoked.

use async_trait::async_trait;
use console::style;
use std::io::{self, Write};

use crate::config::ConfigError;
use crate::error::{Result, SyncError};
use crate::models::Credential;
use crate::services::strava::StravaApi;
use crate::store::TokenStore;
use crate::time_utils;

/// Counts denied refreshes. Reset only by a successful interactive
/// authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReauthGuard {
    attempts: u32,
    max_attempts: u32,
}

impl ReauthGuard {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            attempts: 0,
            max_attempts,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Record a denied refresh. Fails once the limit is reached.
    pub fn record_denial(&mut self) -> std::result::Result<(), ConfigError> {
        self.attempts += 1;
        if self.attempts >= self.max_attempts {
            return Err(ConfigError::ReauthorizationExhausted {
                max_attempts: self.max_attempts,
            });
        }
        Ok(())
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}

/// Source of one-time authorization codes.
#[async_trait]
pub trait AuthorizationPrompt: Send + Sync {
    /// Show `authorization_url` to the operator and return what they paste.
    async fn request_code(&self, authorization_url: &str) -> Result<String>;
}

/// Prompts on the terminal and reads the code from standard input.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

#[async_trait]
impl AuthorizationPrompt for ConsolePrompt {
    async fn request_code(&self, authorization_url: &str) -> Result<String> {
        let url = authorization_url.to_string();
        let input = tokio::task::spawn_blocking(move || -> io::Result<String> {
            println!(
                "{}",
                style("Please authorize this application to access your Strava data:").bold()
            );
            println!("1. Open this URL in your browser:\n   {}", style(&url).cyan());
            println!("2. Authorize the app and copy the 'code' from the redirected URL.");
            print!("3. Paste the authorization code here: ");
            io::stdout().flush()?;

            let mut input = String::new();
            io::stdin().read_line(&mut input)?;
            Ok(input)
        })
        .await
        .map_err(|e| anyhow::anyhow!("Authorization prompt failed: {}", e))??;

        Ok(input)
    }
}

/// Return a credential that is valid for at least `expiry_buffer` seconds,
/// refreshing or re-authorizing as needed. Every new credential is
/// persisted before it is returned.
pub async fn acquire_credential<A, P>(
    api: &A,
    store: &TokenStore,
    prompt: &P,
    guard: &mut ReauthGuard,
    expiry_buffer: i64,
) -> Result<Credential>
where
    A: StravaApi + ?Sized,
    P: AuthorizationPrompt + ?Sized,
{
    if let Some(credential) = store.read() {
        if !credential.is_expired(expiry_buffer) {
            tracing::debug!(
                expires_at = %time_utils::format_epoch(credential.expires_at),
                "Using existing, valid Strava token"
            );
            return Ok(credential);
        }

        tracing::info!(
            expired_at = %time_utils::format_epoch(credential.expires_at),
            "Strava token has expired, refreshing"
        );
        match api.refresh(&credential.refresh_secret).await {
            Ok(fresh) => {
                store.write(&fresh)?;
                tracing::info!(
                    expires_at = %time_utils::format_epoch(fresh.expires_at),
                    "Strava token refreshed"
                );
                return Ok(fresh);
            }
            Err(e) if e.is_unauthorized() => {
                tracing::warn!(
                    attempt = guard.attempts() + 1,
                    max_attempts = guard.max_attempts(),
                    "Token refresh was denied, re-authorization required"
                );
                guard.record_denial()?;
            }
            Err(e) => return Err(e),
        }
    }

    authorize_interactively(api, store, prompt, guard).await
}

async fn authorize_interactively<A, P>(
    api: &A,
    store: &TokenStore,
    prompt: &P,
    guard: &mut ReauthGuard,
) -> Result<Credential>
where
    A: StravaApi + ?Sized,
    P: AuthorizationPrompt + ?Sized,
{
    let url = api.authorization_url()?;
    tracing::info!("Starting interactive authorization");

    let code = prompt.request_code(&url).await?;
    let code = code.trim();
    if code.is_empty() {
        return Err(SyncError::Config(ConfigError::EmptyAuthorizationCode));
    }

    let credential = api.exchange_code(code).await?;
    store.write(&credential)?;
    guard.reset();
    tracing::info!("New Strava token obtained and saved");
    Ok(credential)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_trips_at_limit() {
        let mut guard = ReauthGuard::new(3);
        assert!(guard.record_denial().is_ok());
        assert!(guard.record_denial().is_ok());

        let err = guard.record_denial().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ReauthorizationExhausted { max_attempts: 3 }
        ));
        assert_eq!(guard.attempts(), 3);
    }

    #[test]
    fn test_guard_of_one_trips_immediately() {
        let mut guard = ReauthGuard::new(1);
        assert!(guard.record_denial().is_err());
    }

    #[test]
    fn test_guard_reset() {
        let mut guard = ReauthGuard::new(2);
        guard.record_denial().unwrap();
        guard.reset();

        assert_eq!(guard.attempts(), 0);
        assert!(guard.record_denial().is_ok());
    }
}

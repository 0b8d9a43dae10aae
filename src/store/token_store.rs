// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Token store: one JSON credential record at a fixed path.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{Credential, TokenRecord};
use crate::store::write_atomically;

/// Reads and writes the Strava token file.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored credential. Missing or unreadable files yield `None`.
    pub fn read(&self) -> Option<Credential> {
        if !self.path.is_file() {
            tracing::info!(path = %self.path.display(), "Token file not found");
            return None;
        }

        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Could not read token file");
                return None;
            }
        };

        match serde_json::from_str::<TokenRecord>(&content) {
            Ok(record) => Some(record.into()),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Could not validate token file, ignoring it"
                );
                None
            }
        }
    }

    /// Persist the credential, replacing any previous one.
    pub fn write(&self, credential: &Credential) -> Result<()> {
        let body = serde_json::to_vec_pretty(&credential.to_record())
            .map_err(|e| anyhow::anyhow!("Failed to encode token: {}", e))?;

        write_atomically(&self.path, |file| {
            restrict_permissions(file.as_file())?;
            file.write_all(&body)?;
            Ok(())
        })
        .inspect_err(|e| {
            tracing::error!(path = %self.path.display(), error = %e, "Failed to write token");
        })?;

        tracing::info!(path = %self.path.display(), "Token written");
        Ok(())
    }
}

#[cfg(unix)]
fn restrict_permissions(file: &fs::File) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &fs::File) -> std::io::Result<()> {
    Ok(())
}

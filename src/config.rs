// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration.
//!
//! Values are layered, lowest to highest precedence:
//! 1. Built-in defaults
//! 2. YAML config file (`--config-file`)
//! 3. Environment variables (`STRAVA_*`, `.env` honoured)
//! 4. Explicit CLI arguments
//!
//! Example config file:
//! ```yaml
//! strava_api:
//!   client_id: 12345
//!   client_secret: "abcdef"
//! paths:
//!   data_dir: data
//!   streams_dir: data/Streams
//! sync:
//!   max_pages: 10
//!   retry_interval_seconds: 900
//!   skip_trainer_activities: true
//! ```

use secrecy::SecretString;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use validator::Validate;

/// Directory under the home directory used when no data dir is configured.
const DEFAULT_DATA_SUBDIR: &str = ".strava_fetcher/data";

/// Fully resolved settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    pub strava_api: StravaApiSettings,
    pub paths: PathSettings,
    pub sync: SyncSettings,
}

/// Strava OAuth application credentials.
#[derive(Debug, Clone, Default)]
pub struct StravaApiSettings {
    pub client_id: Option<SecretString>,
    pub client_secret: Option<SecretString>,
}

/// Storage locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSettings {
    /// Base directory for all data files
    pub data_dir: PathBuf,
    /// Credential record (JSON)
    pub token_file: PathBuf,
    /// Activity summary table (semicolon-delimited)
    pub activities_cache_file: PathBuf,
    /// One stream table per activity
    pub streams_dir: PathBuf,
}

impl PathSettings {
    /// Derive every path from a single data directory.
    pub fn under(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            token_file: data_dir.join("token.json"),
            activities_cache_file: data_dir.join("activities.csv"),
            streams_dir: data_dir.join("Streams"),
            data_dir,
        }
    }
}

/// Sync tunables, immutable for a run.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct SyncSettings {
    /// Maximum number of activity pages to fetch
    #[validate(range(min = 1))]
    pub max_pages: u32,
    /// Seconds to wait after hitting a rate limit
    #[validate(range(min = 1))]
    pub retry_interval_seconds: u64,
    /// Skip streams for indoor trainer activities
    pub skip_trainer_activities: bool,
    /// Failed refreshes tolerated before giving up on re-authorization
    #[validate(range(min = 1))]
    pub max_auth_attempts: u32,
    /// A token expiring within this many seconds is treated as expired
    pub token_expiry_buffer_seconds: i64,
    /// Cap on rate-limit waits per run; `None` waits indefinitely
    pub max_rate_limit_waits: Option<u32>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_pages: 100,
            retry_interval_seconds: 900,
            skip_trainer_activities: false,
            max_auth_attempts: 3,
            token_expiry_buffer_seconds: 60,
            max_rate_limit_waits: None,
        }
    }
}

/// Explicit overrides, usually from the command line.
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub config_file: Option<PathBuf>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

// ─── File format ─────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    strava_api: FileApiSettings,
    paths: FilePathSettings,
    sync: FileSyncSettings,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileApiSettings {
    #[serde(deserialize_with = "string_or_number")]
    client_id: Option<String>,
    #[serde(deserialize_with = "string_or_number")]
    client_secret: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FilePathSettings {
    data_dir: Option<PathBuf>,
    token_file: Option<PathBuf>,
    activities_cache_file: Option<PathBuf>,
    streams_dir: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSyncSettings {
    max_pages: Option<u32>,
    retry_interval_seconds: Option<u64>,
    skip_trainer_activities: Option<bool>,
    max_auth_attempts: Option<u32>,
    token_expiry_buffer_seconds: Option<i64>,
    max_rate_limit_waits: Option<u32>,
}

/// Accept `client_id: 12345` as well as `client_id: "12345"`.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Scalar {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Scalar>::deserialize(deserializer)?.map(|v| match v {
        Scalar::Text(s) => s,
        Scalar::Int(i) => i.to_string(),
        Scalar::Float(f) => f.to_string(),
    }))
}

// ─── Loading ─────────────────────────────────────────────────────────────────

impl Settings {
    /// Built-in defaults only.
    pub fn with_defaults() -> Self {
        Self {
            strava_api: StravaApiSettings::default(),
            paths: PathSettings::under(default_data_dir()),
            sync: SyncSettings::default(),
        }
    }

    /// Load settings from all sources using the process environment.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present
        Self::load_with_env(options, |key| env::var(key).ok())
    }

    /// Load settings with an explicit environment lookup.
    pub fn load_with_env<F>(options: LoadOptions, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match &options.config_file {
            Some(path) => {
                tracing::info!(path = %path.display(), "Loading settings from file");
                read_file_settings(path)?
            }
            None => FileSettings::default(),
        };
        let lookup = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        // Credentials: file < env < args
        let client_id = non_empty(options.client_id)
            .or_else(|| lookup("STRAVA_CLIENT_ID"))
            .or_else(|| non_empty(file.strava_api.client_id));
        let client_secret = non_empty(options.client_secret)
            .or_else(|| lookup("STRAVA_CLIENT_SECRET"))
            .or_else(|| non_empty(file.strava_api.client_secret));

        // Paths: explicit file paths win over data_dir-derived ones
        let data_dir = lookup("STRAVA_DATA_DIR")
            .map(PathBuf::from)
            .or(file.paths.data_dir)
            .unwrap_or_else(default_data_dir);
        let derived = PathSettings::under(&data_dir);
        let paths = PathSettings {
            token_file: file.paths.token_file.unwrap_or(derived.token_file),
            activities_cache_file: file
                .paths
                .activities_cache_file
                .unwrap_or(derived.activities_cache_file),
            streams_dir: file.paths.streams_dir.unwrap_or(derived.streams_dir),
            data_dir,
        };

        let defaults = SyncSettings::default();
        let sync = SyncSettings {
            max_pages: parse_env(&lookup, "STRAVA_MAX_PAGES")?
                .or(file.sync.max_pages)
                .unwrap_or(defaults.max_pages),
            retry_interval_seconds: parse_env(&lookup, "STRAVA_RETRY_INTERVAL_SECONDS")?
                .or(file.sync.retry_interval_seconds)
                .unwrap_or(defaults.retry_interval_seconds),
            skip_trainer_activities: parse_env_bool(&lookup, "STRAVA_SKIP_TRAINER_ACTIVITIES")?
                .or(file.sync.skip_trainer_activities)
                .unwrap_or(defaults.skip_trainer_activities),
            max_auth_attempts: file
                .sync
                .max_auth_attempts
                .unwrap_or(defaults.max_auth_attempts),
            token_expiry_buffer_seconds: file
                .sync
                .token_expiry_buffer_seconds
                .unwrap_or(defaults.token_expiry_buffer_seconds),
            max_rate_limit_waits: file.sync.max_rate_limit_waits,
        };
        sync.validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(Self {
            strava_api: StravaApiSettings {
                client_id: client_id.map(SecretString::from),
                client_secret: client_secret.map(SecretString::from),
            },
            paths,
            sync,
        })
    }

    /// Create all data directories if they don't exist.
    pub fn ensure_paths_exist(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.paths.data_dir)?;
        fs::create_dir_all(&self.paths.streams_dir)?;
        for file in [&self.paths.token_file, &self.paths.activities_cache_file] {
            if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

fn read_file_settings(path: &Path) -> Result<FileSettings, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(FileSettings::default());
    }
    serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(DEFAULT_DATA_SUBDIR))
        .unwrap_or_else(|| PathBuf::from("data"))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_env<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| {
            raw.parse()
                .map_err(|_| ConfigError::Invalid(format!("{} must be a positive integer, got {:?}", key, raw)))
        })
        .transpose()
}

fn parse_env_bool<F>(lookup: &F, key: &'static str) -> Result<Option<bool>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::Invalid(format!(
                "{} must be a boolean, got {:?}",
                key, raw
            ))),
        })
        .transpose()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Invalid configuration in {}: {message}", .path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Strava {0} is not configured.")]
    MissingCredential(&'static str),

    #[error("Exceeded maximum {max_attempts} re-authorization attempts.")]
    ReauthorizationExhausted { max_attempts: u32 },

    #[error("No authorization code entered.")]
    EmptyAuthorizationCode,

    #[error("Could not prepare data directory: {0}")]
    Io(#[from] std::io::Error),
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Scripted test doubles for the Strava API and the operator prompt.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Map, Value};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use strava_sync::config::{PathSettings, StravaApiSettings};
use strava_sync::models::{Credential, StreamPayload};
use strava_sync::services::{AuthorizationPrompt, StravaApi};
use strava_sync::store::TokenStore;
use strava_sync::time_utils::now_epoch_seconds;
use strava_sync::{Result, Settings, SyncError};

pub const AUTH_URL: &str = "https://strava.test/oauth/authorize?client_id=test";

/// One recorded call against [`MockStravaApi`].
#[allow(dead_code)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    AuthorizationUrl,
    ExchangeCode(String),
    Refresh(String),
    ListActivities { page: u32, per_page: u32 },
    FetchStreams(u64),
}

/// API double answering from per-operation scripts.
///
/// Unscripted list calls return an empty page and unscripted stream fetches
/// return a three-sample `time` stream. Unscripted token calls fail.
#[derive(Default)]
pub struct MockStravaApi {
    exchanges: Mutex<VecDeque<Result<Credential>>>,
    refreshes: Mutex<VecDeque<Result<Credential>>>,
    pages: Mutex<VecDeque<Result<Vec<Map<String, Value>>>>>,
    streams: Mutex<HashMap<u64, VecDeque<Result<StreamPayload>>>>,
    calls: Mutex<Vec<Call>>,
}

#[allow(dead_code)]
impl MockStravaApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exchange(self, result: Result<Credential>) -> Self {
        self.exchanges.lock().unwrap().push_back(result);
        self
    }

    pub fn with_refresh(self, result: Result<Credential>) -> Self {
        self.refreshes.lock().unwrap().push_back(result);
        self
    }

    /// Queue one page of activities.
    pub fn with_page(self, activities: Vec<Value>) -> Self {
        let page = activities
            .into_iter()
            .map(|v| v.as_object().cloned().expect("activity must be an object"))
            .collect();
        self.pages.lock().unwrap().push_back(Ok(page));
        self
    }

    pub fn with_page_error(self, error: SyncError) -> Self {
        self.pages.lock().unwrap().push_back(Err(error));
        self
    }

    /// Queue a response for the next stream fetch of `activity_id`.
    pub fn with_stream(self, activity_id: u64, result: Result<StreamPayload>) -> Self {
        self.streams
            .lock()
            .unwrap()
            .entry(activity_id)
            .or_default()
            .push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    /// Activity IDs passed to `fetch_streams`, in call order.
    pub fn stream_fetches(&self) -> Vec<u64> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::FetchStreams(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn pages_requested(&self) -> Vec<u32> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ListActivities { page, .. } => Some(page),
                _ => None,
            })
            .collect()
    }

    pub fn token_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::ExchangeCode(_) | Call::Refresh(_)))
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl StravaApi for MockStravaApi {
    fn authorization_url(&self) -> Result<String> {
        self.record(Call::AuthorizationUrl);
        Ok(AUTH_URL.to_string())
    }

    async fn exchange_code(&self, code: &str) -> Result<Credential> {
        self.record(Call::ExchangeCode(code.to_string()));
        self.exchanges
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("exchange_code")))
    }

    async fn refresh(&self, refresh_secret: &SecretString) -> Result<Credential> {
        self.record(Call::Refresh(refresh_secret.expose_secret().to_string()));
        self.refreshes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unscripted("refresh")))
    }

    async fn list_activities(
        &self,
        _access_secret: &SecretString,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Map<String, Value>>> {
        self.record(Call::ListActivities { page, per_page });
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn fetch_streams(
        &self,
        _access_secret: &SecretString,
        activity_id: u64,
    ) -> Result<StreamPayload> {
        self.record(Call::FetchStreams(activity_id));
        self.streams
            .lock()
            .unwrap()
            .get_mut(&activity_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(stream_payload(3)))
    }
}

fn unscripted(operation: &str) -> SyncError {
    SyncError::Internal(anyhow::anyhow!("unscripted {} call", operation))
}

/// Prompt double returning queued codes and recording the URLs shown.
#[derive(Default)]
pub struct ScriptedPrompt {
    codes: Mutex<VecDeque<String>>,
    shown: Mutex<Vec<String>>,
}

#[allow(dead_code)]
impl ScriptedPrompt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code(self, code: &str) -> Self {
        self.codes.lock().unwrap().push_back(code.to_string());
        self
    }

    /// URLs presented to the operator, in order.
    pub fn shown(&self) -> Vec<String> {
        self.shown.lock().unwrap().clone()
    }
}

#[async_trait]
impl AuthorizationPrompt for ScriptedPrompt {
    async fn request_code(&self, authorization_url: &str) -> Result<String> {
        self.shown.lock().unwrap().push(authorization_url.to_string());
        Ok(self.codes.lock().unwrap().pop_front().unwrap_or_default())
    }
}

/// Settings rooted in `dir` with a configured client.
#[allow(dead_code)]
pub fn test_settings(dir: &Path) -> Settings {
    let mut settings = Settings::with_defaults();
    settings.paths = PathSettings::under(dir);
    settings.strava_api = StravaApiSettings {
        client_id: Some(SecretString::from("12345".to_string())),
        client_secret: Some(SecretString::from("test_secret".to_string())),
    };
    settings
}

/// Minimal activity summary as returned by the list endpoint.
#[allow(dead_code)]
pub fn activity(id: u64, trainer: bool) -> Value {
    json!({
        "id": id,
        "name": format!("Activity {}", id),
        "trainer": trainer,
        "distance": 1000.5,
        "map": {"summary_polyline": "abc"}
    })
}

/// `time` and `heartrate` streams with `samples` entries each.
#[allow(dead_code)]
pub fn stream_payload(samples: usize) -> StreamPayload {
    let time: Vec<usize> = (0..samples).collect();
    let heartrate: Vec<usize> = (0..samples).map(|i| 120 + i).collect();
    serde_json::from_value(json!({
        "time": {"data": time},
        "heartrate": {"data": heartrate}
    }))
    .expect("valid stream payload")
}

#[allow(dead_code)]
pub fn valid_credential(access: &str) -> Credential {
    Credential::new(access, format!("{}_refresh", access), now_epoch_seconds() + 3600)
}

#[allow(dead_code)]
pub fn expired_credential(access: &str) -> Credential {
    Credential::new(access, format!("{}_refresh", access), now_epoch_seconds() - 10)
}

/// Persist `credential` where the pipeline will look for it.
#[allow(dead_code)]
pub fn seed_token(settings: &Settings, credential: &Credential) {
    TokenStore::new(&settings.paths.token_file)
        .write(credential)
        .expect("seed token");
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava API client.
//!
//! Handles:
//! - Authorization URL construction and code exchange
//! - Token refresh
//! - Paginated activity listing
//! - Per-activity stream fetching
//!
//! Every response goes through [`classify`], so 401 and 429 surface as
//! [`SyncError::Unauthorized`] and [`SyncError::RateLimited`] no matter
//! which endpoint produced them.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};

use crate::config::{ConfigError, StravaApiSettings};
use crate::error::{Result, SyncError};
use crate::models::{Credential, StreamPayload, TokenRecord, STREAM_KEYS};

pub const API_BASE_URL: &str = "https://www.strava.com/api/v3";
pub const OAUTH_BASE_URL: &str = "https://www.strava.com/oauth";

/// Where Strava sends the operator after approval. Nothing listens there;
/// the operator copies the `code` parameter from the address bar.
pub const REDIRECT_URI: &str = "http://localhost";
pub const SCOPE: &str = "profile:read_all,activity:read_all";

/// Outbound calls the sync pipeline depends on.
#[async_trait]
pub trait StravaApi: Send + Sync {
    /// URL the operator opens to grant access.
    fn authorization_url(&self) -> Result<String>;

    /// Trade a one-time authorization code for a credential.
    async fn exchange_code(&self, code: &str) -> Result<Credential>;

    /// Obtain a fresh credential from a refresh secret.
    async fn refresh(&self, refresh_secret: &SecretString) -> Result<Credential>;

    /// One page of activity summaries. An empty page means no more data.
    async fn list_activities(
        &self,
        access_secret: &SecretString,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Map<String, Value>>>;

    /// Streams for one activity, keyed by stream type. Keys without data
    /// for the activity are absent.
    async fn fetch_streams(
        &self,
        access_secret: &SecretString,
        activity_id: u64,
    ) -> Result<StreamPayload>;
}

/// Outcome of one HTTP exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum ApiResponse {
    Success(Value),
    Unauthorized,
    RateLimited,
    Failed { status: u16, body: String },
    /// 2xx with a body that is not JSON.
    Malformed(String),
}

/// Classify a response by status code, decoding the body on success.
pub fn classify(status: u16, body: &str) -> ApiResponse {
    match status {
        401 => ApiResponse::Unauthorized,
        429 => ApiResponse::RateLimited,
        200..=299 => match serde_json::from_str(body) {
            Ok(value) => ApiResponse::Success(value),
            Err(e) => ApiResponse::Malformed(format!("JSON parse error: {}", e)),
        },
        _ => ApiResponse::Failed {
            status,
            body: body.to_string(),
        },
    }
}

impl ApiResponse {
    pub fn into_result(self) -> Result<Value> {
        match self {
            ApiResponse::Success(value) => Ok(value),
            ApiResponse::Unauthorized => Err(SyncError::Unauthorized),
            ApiResponse::RateLimited => Err(SyncError::RateLimited),
            ApiResponse::Failed { status, body } => Err(SyncError::Api { status, body }),
            ApiResponse::Malformed(message) => Err(SyncError::Decode(message)),
        }
    }
}

/// HTTP implementation of [`StravaApi`].
#[derive(Debug, Clone)]
pub struct StravaClient {
    http: reqwest::Client,
    api_url: String,
    oauth_url: String,
    client_id: Option<SecretString>,
    client_secret: Option<SecretString>,
}

impl StravaClient {
    /// Create a client for the public Strava endpoints.
    pub fn new(settings: &StravaApiSettings) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: API_BASE_URL.to_string(),
            oauth_url: OAUTH_BASE_URL.to_string(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
        }
    }

    /// Point the client at different API and OAuth roots.
    pub fn with_base_urls(mut self, api_url: impl Into<String>, oauth_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self.oauth_url = oauth_url.into().trim_end_matches('/').to_string();
        self
    }

    fn client_id(&self) -> Result<&str> {
        self.client_id
            .as_ref()
            .map(|s| s.expose_secret())
            .ok_or(SyncError::Config(ConfigError::MissingCredential("Client ID")))
    }

    fn client_secret(&self) -> Result<&str> {
        self.client_secret
            .as_ref()
            .map(|s| s.expose_secret())
            .ok_or(SyncError::Config(ConfigError::MissingCredential(
                "Client Secret",
            )))
    }

    /// POST to the token endpoint with the given grant.
    async fn token_request(&self, grant: &[(&str, &str)]) -> Result<Credential> {
        let mut form = vec![
            ("client_id", self.client_id()?),
            ("client_secret", self.client_secret()?),
        ];
        form.extend_from_slice(grant);

        let response = self
            .http
            .post(format!("{}/token", self.oauth_url))
            .form(&form)
            .send()
            .await
            .map_err(|e| SyncError::Transport(format!("Token request failed: {}", e)))?;

        let value = read_response(response).await?;
        let record: TokenRecord = serde_json::from_value(value)
            .map_err(|e| SyncError::Decode(format!("Invalid token response: {}", e)))?;
        Ok(record.into())
    }

    /// Authenticated GET returning the decoded JSON body.
    async fn get_json(
        &self,
        url: &str,
        access_secret: &SecretString,
        query: &[(&str, String)],
    ) -> Result<Value> {
        let response = self
            .http
            .get(url)
            .bearer_auth(access_secret.expose_secret())
            .query(query)
            .send()
            .await
            .map_err(|e| SyncError::Transport(e.to_string()))?;

        read_response(response).await
    }
}

/// Read the body and classify the response.
async fn read_response(response: reqwest::Response) -> Result<Value> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| SyncError::Transport(format!("Failed to read response body: {}", e)))?;

    let classified = classify(status, &body);
    match &classified {
        ApiResponse::RateLimited => tracing::warn!("Strava rate limit hit (429)"),
        ApiResponse::Failed { status, .. } => {
            tracing::debug!(status = *status, "Strava request failed")
        }
        _ => {}
    }
    classified.into_result()
}

#[async_trait]
impl StravaApi for StravaClient {
    fn authorization_url(&self) -> Result<String> {
        Ok(format!(
            "{}/authorize?client_id={}&response_type=code&redirect_uri={}\
             &approval_prompt=force&scope={}",
            self.oauth_url,
            urlencoding::encode(self.client_id()?),
            REDIRECT_URI,
            SCOPE
        ))
    }

    async fn exchange_code(&self, code: &str) -> Result<Credential> {
        self.token_request(&[("code", code), ("grant_type", "authorization_code")])
            .await
    }

    async fn refresh(&self, refresh_secret: &SecretString) -> Result<Credential> {
        self.token_request(&[
            ("refresh_token", refresh_secret.expose_secret()),
            ("grant_type", "refresh_token"),
        ])
        .await
    }

    async fn list_activities(
        &self,
        access_secret: &SecretString,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<Map<String, Value>>> {
        let url = format!("{}/athlete/activities", self.api_url);
        let value = self
            .get_json(
                &url,
                access_secret,
                &[("page", page.to_string()), ("per_page", per_page.to_string())],
            )
            .await?;

        let Value::Array(items) = value else {
            return Err(SyncError::Decode(
                "activity list is not a JSON array".to_string(),
            ));
        };
        items
            .into_iter()
            .map(|item| match item {
                Value::Object(map) => Ok(map),
                other => Err(SyncError::Decode(format!(
                    "activity entry is not an object: {}",
                    other
                ))),
            })
            .collect()
    }

    async fn fetch_streams(
        &self,
        access_secret: &SecretString,
        activity_id: u64,
    ) -> Result<StreamPayload> {
        let url = format!("{}/activities/{}/streams", self.api_url, activity_id);
        let value = self
            .get_json(
                &url,
                access_secret,
                &[
                    ("keys", STREAM_KEYS.join(",")),
                    ("key_by_type", "true".to_string()),
                ],
            )
            .await?;

        serde_json::from_value(value)
            .map_err(|e| SyncError::Decode(format!("Invalid stream response: {}", e)))
    }
}

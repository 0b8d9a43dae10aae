// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity stream (time-series) model.

use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{Result, SyncError};
use crate::models::activity::cell_text;

/// Stream channels requested for every activity, in column order.
pub const STREAM_KEYS: [&str; 10] = [
    "time",
    "distance",
    "latlng",
    "altitude",
    "velocity_smooth",
    "heartrate",
    "cadence",
    "watts",
    "moving",
    "grade_smooth",
];

/// One channel from the streams endpoint (`key_by_type=true`).
#[derive(Debug, Clone, Deserialize)]
pub struct RawStream {
    #[serde(default)]
    pub data: Vec<Value>,
}

/// Streams endpoint response, keyed by channel name. Channels without data
/// for an activity are simply absent.
pub type StreamPayload = HashMap<String, RawStream>;

/// Sample-aligned stream table for one activity.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamTable {
    columns: Vec<String>,
    /// Row-major samples, one row per sample index.
    samples: Vec<Vec<String>>,
}

impl StreamTable {
    /// Keep the requested channels present in `payload` and align them by
    /// sample index. Channels of different lengths cannot be aligned.
    pub fn from_payload(payload: &StreamPayload) -> Result<Self> {
        let present: Vec<(&str, &RawStream)> = STREAM_KEYS
            .iter()
            .filter_map(|key| payload.get(*key).map(|s| (*key, s)))
            .collect();

        let len = present.first().map(|(_, s)| s.data.len()).unwrap_or(0);
        if let Some((key, stream)) = present.iter().find(|(_, s)| s.data.len() != len) {
            return Err(SyncError::Decode(format!(
                "stream '{}' has {} samples, expected {}",
                key,
                stream.data.len(),
                len
            )));
        }

        let samples = (0..len)
            .map(|i| present.iter().map(|(_, s)| cell_text(&s.data[i])).collect())
            .collect();

        Ok(Self {
            columns: present.iter().map(|(k, _)| k.to_string()).collect(),
            samples,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.samples
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

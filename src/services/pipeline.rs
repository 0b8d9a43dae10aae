// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Sync pipeline.
//!
//! One run is:
//! 1. Acquire a valid credential
//! 2. Page through the athlete's activities and merge them into the cache
//! 3. Backfill streams for cached activities that have none on disk
//!
//! A 429 anywhere suspends the run for `retry_interval_seconds` and then
//! resumes the interrupted step. Everything persisted before a failure stays
//! valid, so the next run picks up where this one stopped.

use std::collections::HashSet;
use std::time::Duration;

use crate::config::{Settings, SyncSettings};
use crate::error::{Result, SyncError};
use crate::models::{ActivityRecord, Credential, StreamTable};
use crate::services::credentials::{acquire_credential, AuthorizationPrompt, ReauthGuard};
use crate::services::strava::StravaApi;
use crate::store::{ActivityStore, TokenStore};

/// Activities requested per page.
pub const PAGE_SIZE: u32 = 100;

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Activity summaries received from Strava
    pub activities_fetched: usize,
    /// Rows in the activity cache after the merge
    pub activities_total: usize,
    pub streams_written: usize,
    /// Stream fetches that failed and were skipped
    pub streams_failed: usize,
    pub trainer_skipped: usize,
    pub rate_limit_waits: u32,
}

/// Result of one backfill pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BackfillPass {
    Completed,
    RateLimited,
}

/// End-to-end synchronization of activities and streams.
pub struct SyncPipeline<A, P> {
    settings: SyncSettings,
    api: A,
    prompt: P,
    tokens: TokenStore,
    activities: ActivityStore,
    guard: ReauthGuard,
}

impl<A, P> SyncPipeline<A, P>
where
    A: StravaApi,
    P: AuthorizationPrompt,
{
    pub fn new(settings: &Settings, api: A, prompt: P) -> Self {
        Self {
            settings: settings.sync.clone(),
            api,
            prompt,
            tokens: TokenStore::new(&settings.paths.token_file),
            activities: ActivityStore::new(
                &settings.paths.activities_cache_file,
                &settings.paths.streams_dir,
            ),
            guard: ReauthGuard::new(settings.sync.max_auth_attempts),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn prompt(&self) -> &P {
        &self.prompt
    }

    pub fn reauth_guard(&self) -> &ReauthGuard {
        &self.guard
    }

    /// Run the full pipeline once.
    pub async fn run(&mut self) -> Result<SyncReport> {
        tracing::info!("Starting Strava data synchronization");

        let mut report = SyncReport::default();
        match self.run_steps(&mut report).await {
            Ok(()) => {
                tracing::info!(
                    activities_fetched = report.activities_fetched,
                    activities_total = report.activities_total,
                    streams_written = report.streams_written,
                    streams_failed = report.streams_failed,
                    trainer_skipped = report.trainer_skipped,
                    rate_limit_waits = report.rate_limit_waits,
                    "Strava data synchronization completed"
                );
                Ok(report)
            }
            Err(e) => {
                tracing::error!(error = %e, kind = ?e.kind(), "Strava data synchronization aborted");
                Err(e)
            }
        }
    }

    async fn run_steps(&mut self, report: &mut SyncReport) -> Result<()> {
        let mut credential = self.credential().await?;
        self.sync_activities(&mut credential, report).await?;

        // IDs already handled this run, so a resumed pass never fetches
        // the same activity twice.
        let mut attempted = HashSet::new();
        loop {
            match self.backfill_streams(&credential, &mut attempted, report).await? {
                BackfillPass::Completed => return Ok(()),
                BackfillPass::RateLimited => {
                    self.wait_out_rate_limit(report).await?;
                    credential = self.credential().await?;
                }
            }
        }
    }

    async fn credential(&mut self) -> Result<Credential> {
        acquire_credential(
            &self.api,
            &self.tokens,
            &self.prompt,
            &mut self.guard,
            self.settings.token_expiry_buffer_seconds,
        )
        .await
    }

    /// Sleep for the retry interval, unless the configured cap on waits has
    /// been used up.
    async fn wait_out_rate_limit(&self, report: &mut SyncReport) -> Result<()> {
        if let Some(max) = self.settings.max_rate_limit_waits {
            if report.rate_limit_waits >= max {
                tracing::error!(max_waits = max, "Rate limit persists, giving up");
                return Err(SyncError::RateLimited);
            }
        }

        report.rate_limit_waits += 1;
        let wait_seconds = self.settings.retry_interval_seconds;
        tracing::warn!(
            wait_seconds,
            wait = report.rate_limit_waits,
            "Rate limit hit, waiting before resuming"
        );
        tokio::time::sleep(Duration::from_secs(wait_seconds)).await;
        Ok(())
    }

    /// Fetch activity pages until an empty page or `max_pages`, then merge
    /// them into the cache. The cache is left untouched when nothing new
    /// arrived.
    async fn sync_activities(
        &mut self,
        credential: &mut Credential,
        report: &mut SyncReport,
    ) -> Result<()> {
        tracing::info!("Starting activity summary synchronization");

        let mut fetched = Vec::new();
        let mut page = 1;
        while page <= self.settings.max_pages {
            tracing::debug!(page, "Fetching activity page");
            let result = self
                .api
                .list_activities(&credential.access_secret, page, PAGE_SIZE)
                .await;
            let items = match result {
                Ok(items) => items,
                Err(e) if e.is_rate_limit() => {
                    self.wait_out_rate_limit(report).await?;
                    *credential = self.credential().await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if items.is_empty() {
                tracing::info!(page, "No more activities found");
                break;
            }
            for item in &items {
                fetched.push(ActivityRecord::from_json(item)?);
            }
            page += 1;
        }
        report.activities_fetched = fetched.len();

        let cached = self.activities.read_cache()?;
        if fetched.is_empty() {
            report.activities_total = cached.map_or(0, |table| table.len());
            tracing::info!("No activities fetched, cache unchanged");
            return Ok(());
        }

        let mut table = cached.unwrap_or_default();
        table.merge(fetched);
        self.activities.write_cache(&table)?;
        report.activities_total = table.len();

        tracing::info!(
            fetched = report.activities_fetched,
            total = table.len(),
            path = %self.activities.cache_file().display(),
            "Activity cache updated"
        );
        Ok(())
    }

    /// Fetch streams for every cached activity without a stream file, in
    /// table order. Stops early on a rate limit.
    async fn backfill_streams(
        &self,
        credential: &Credential,
        attempted: &mut HashSet<u64>,
        report: &mut SyncReport,
    ) -> Result<BackfillPass> {
        let Some(table) = self.activities.read_cache()? else {
            tracing::warn!("No activities found in cache, cannot sync streams");
            return Ok(BackfillPass::Completed);
        };

        let existing = self.activities.existing_stream_ids()?;
        let missing: Vec<&ActivityRecord> = table
            .records()
            .filter(|r| !existing.contains(&r.id) && !attempted.contains(&r.id))
            .collect();

        if missing.is_empty() {
            tracing::info!("All activity streams are already up to date");
            return Ok(BackfillPass::Completed);
        }
        tracing::info!(count = missing.len(), "Activities needing streams");

        for record in missing {
            let activity_id = record.id;
            if self.settings.skip_trainer_activities && record.is_trainer() {
                tracing::debug!(activity_id, "Skipping trainer activity");
                report.trainer_skipped += 1;
                attempted.insert(activity_id);
                continue;
            }

            match self.fetch_stream(credential, activity_id).await {
                Ok(samples) => {
                    tracing::info!(activity_id, samples, "Stream saved");
                    report.streams_written += 1;
                }
                Err(e) if e.is_rate_limit() => {
                    tracing::warn!(activity_id, "Rate limit hit while fetching streams");
                    return Ok(BackfillPass::RateLimited);
                }
                Err(e) => {
                    tracing::error!(
                        activity_id,
                        error = %e,
                        "Failed to fetch streams for activity"
                    );
                    report.streams_failed += 1;
                }
            }
            attempted.insert(activity_id);
        }

        Ok(BackfillPass::Completed)
    }

    async fn fetch_stream(&self, credential: &Credential, activity_id: u64) -> Result<usize> {
        let payload = self
            .api
            .fetch_streams(&credential.access_secret, activity_id)
            .await?;
        let table = StreamTable::from_payload(&payload)?;
        self.activities.write_stream(activity_id, &table)?;
        Ok(table.len())
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity store: the summary table and per-activity stream tables.
//!
//! Both are semicolon-delimited with a header row. A stream file's presence
//! (non-empty, named after the zero-padded activity ID) is what marks an
//! activity as synced; file contents are never read for that decision.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::models::{ActivityTable, StreamTable};
use crate::store::write_atomically;

const DELIMITER: u8 = b';';
const STREAM_PREFIX: &str = "stream_";
const STREAM_SUFFIX: &str = ".csv";

/// Reads and writes activity summaries and streams.
#[derive(Debug, Clone)]
pub struct ActivityStore {
    cache_file: PathBuf,
    streams_dir: PathBuf,
}

impl ActivityStore {
    pub fn new(cache_file: impl Into<PathBuf>, streams_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_file: cache_file.into(),
            streams_dir: streams_dir.into(),
        }
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// Read the activity summary cache. `None` if there is no usable file.
    pub fn read_cache(&self) -> Result<Option<ActivityTable>> {
        if !self.cache_file.is_file() || fs::metadata(&self.cache_file)?.len() == 0 {
            return Ok(None);
        }

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(DELIMITER)
            .flexible(true)
            .from_path(&self.cache_file)?;
        let headers = reader.headers()?.clone();

        let mut table = ActivityTable::new();
        for (line, row) in reader.records().enumerate() {
            let row = row?;
            let cells = headers
                .iter()
                .zip(row.iter())
                .map(|(h, v)| (h.to_string(), v.to_string()))
                .collect();
            if !table.push_cached(cells) {
                tracing::warn!(
                    path = %self.cache_file.display(),
                    row = line + 1,
                    "Cached row has no usable activity id, keeping it as-is"
                );
            }
        }

        Ok(Some(table))
    }

    /// Replace the activity summary cache.
    pub fn write_cache(&self, table: &ActivityTable) -> Result<()> {
        write_atomically(&self.cache_file, |file| {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(DELIMITER)
                .from_writer(file);
            writer.write_record(table.columns())?;
            for row in table.aligned_rows() {
                writer.write_record(&row)?;
            }
            writer.flush()?;
            Ok(())
        })
    }

    /// IDs with a non-empty stream file on disk.
    pub fn existing_stream_ids(&self) -> Result<HashSet<u64>> {
        if !self.streams_dir.is_dir() {
            return Ok(HashSet::new());
        }

        let mut ids = HashSet::new();
        for entry in fs::read_dir(&self.streams_dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(id) = name.to_str().and_then(parse_stream_file_name) else {
                continue;
            };
            let meta = entry.metadata()?;
            if meta.is_file() && meta.len() > 0 {
                ids.insert(id);
            }
        }
        Ok(ids)
    }

    /// Path of the stream file for an activity.
    pub fn stream_path(&self, activity_id: u64) -> PathBuf {
        self.streams_dir
            .join(format!("{}{:09}{}", STREAM_PREFIX, activity_id, STREAM_SUFFIX))
    }

    /// Write one activity's stream table, indexed by sample position.
    pub fn write_stream(&self, activity_id: u64, stream: &StreamTable) -> Result<()> {
        let path = self.stream_path(activity_id);
        write_atomically(&path, |file| {
            let mut writer = csv::WriterBuilder::new()
                .delimiter(DELIMITER)
                .from_writer(file);

            let header: Vec<&str> = std::iter::once("")
                .chain(stream.columns().iter().map(String::as_str))
                .collect();
            writer.write_record(&header)?;

            for (index, row) in stream.rows().iter().enumerate() {
                let index = index.to_string();
                let record: Vec<&str> = std::iter::once(index.as_str())
                    .chain(row.iter().map(String::as_str))
                    .collect();
                writer.write_record(&record)?;
            }
            writer.flush()?;
            Ok(())
        })
    }
}

/// `stream_000012345.csv` -> `12345`
fn parse_stream_file_name(name: &str) -> Option<u64> {
    name.strip_prefix(STREAM_PREFIX)?
        .strip_suffix(STREAM_SUFFIX)?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ActivityRecord, StreamPayload};
    use serde_json::json;

    fn store_in(dir: &Path) -> ActivityStore {
        ActivityStore::new(dir.join("activities.csv"), dir.join("Streams"))
    }

    fn record(value: serde_json::Value) -> ActivityRecord {
        ActivityRecord::from_json(value.as_object().unwrap()).unwrap()
    }

    fn stream(value: serde_json::Value) -> StreamTable {
        let payload: StreamPayload = serde_json::from_value(value).unwrap();
        StreamTable::from_payload(&payload).unwrap()
    }

    #[test]
    fn test_read_cache_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(dir.path()).read_cache().unwrap().is_none());
    }

    #[test]
    fn test_read_cache_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(store.cache_file(), "").unwrap();

        assert!(store.read_cache().unwrap().is_none());
    }

    #[test]
    fn test_cache_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        let table = ActivityTable::from_records(vec![
            record(json!({"id": 12345678, "name": "Morning Ride; long", "trainer": false})),
            record(json!({"id": 12345679, "name": "Evening Run", "map": {"summary_polyline": "x"}})),
        ]);

        store.write_cache(&table).unwrap();
        let read = store.read_cache().unwrap().unwrap();

        assert_eq!(read.len(), 2);
        assert_eq!(read.columns(), table.columns());
        assert_eq!(
            read.get(12345678).unwrap().get("name"),
            Some("Morning Ride; long")
        );
        assert_eq!(read.get(12345679).unwrap().get("trainer"), Some(""));
        assert_eq!(
            read.get(12345679).unwrap().get("map.summary_polyline"),
            Some("x")
        );
    }

    #[test]
    fn test_cache_file_is_semicolon_delimited() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store
            .write_cache(&ActivityTable::from_records(vec![record(
                json!({"id": 1, "name": "a"}),
            )]))
            .unwrap();

        let content = fs::read_to_string(store.cache_file()).unwrap();
        assert_eq!(content, "id;name\n1;a\n");
    }

    #[test]
    fn test_unreadable_cached_rows_are_written_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        fs::write(store.cache_file(), "id;name\n1;a\nnope;b\n2;c\n").unwrap();

        let mut table = store.read_cache().unwrap().unwrap();
        assert_eq!(table.ids().collect::<Vec<_>>(), vec![1, 2]);

        table.merge(vec![record(json!({"id": 3, "name": "d"}))]);
        store.write_cache(&table).unwrap();

        let content = fs::read_to_string(store.cache_file()).unwrap();
        assert_eq!(content, "id;name\n1;a\nnope;b\n2;c\n3;d\n");
    }

    #[test]
    fn test_stream_path_is_zero_padded() {
        let store = ActivityStore::new("a.csv", "Streams");
        assert_eq!(
            store.stream_path(12345),
            PathBuf::from("Streams").join("stream_000012345.csv")
        );
    }

    #[test]
    fn test_existing_stream_ids() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store
            .write_stream(1, &stream(json!({"time": {"data": [0, 1]}})))
            .unwrap();
        store
            .write_stream(12345678901, &stream(json!({"time": {"data": [0]}})))
            .unwrap();

        let streams = dir.path().join("Streams");
        fs::write(streams.join("stream_000000002.csv"), "").unwrap();
        fs::write(streams.join("notes.txt"), "hello").unwrap();
        fs::write(streams.join("stream_abc.csv"), "x").unwrap();

        let ids = store.existing_stream_ids().unwrap();
        assert_eq!(ids, HashSet::from([1, 12345678901]));
    }

    #[test]
    fn test_existing_stream_ids_without_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(store_in(dir.path()).existing_stream_ids().unwrap().is_empty());
    }

    #[test]
    fn test_stream_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store
            .write_stream(
                7,
                &stream(json!({
                    "time": {"data": [0, 1]},
                    "heartrate": {"data": [140, 141]}
                })),
            )
            .unwrap();

        let content = fs::read_to_string(store.stream_path(7)).unwrap();
        assert_eq!(content, ";time;heartrate\n0;0;140\n1;1;141\n");
    }

    #[test]
    fn test_empty_stream_still_marks_synced() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());
        store.write_stream(9, &stream(json!({}))).unwrap();

        assert!(store.existing_stream_ids().unwrap().contains(&9));
    }
}

// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Activity summary rows and the summary table.
//!
//! Strava returns nested JSON per activity; rows are flattened into
//! `column -> cell` pairs (`map.summary_polyline`, `athlete.id`, ...) so the
//! whole table can be written as one delimited file.

use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::error::{Result, SyncError};

/// Column holding the activity ID.
pub const ID_COLUMN: &str = "id";

/// Column Strava uses to flag indoor trainer activities.
pub const TRAINER_COLUMN: &str = "trainer";

/// One flattened activity summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub id: u64,
    /// Cells in column order. Includes the `id` cell.
    fields: Vec<(String, String)>,
}

impl ActivityRecord {
    /// Flatten one raw activity from the list endpoint.
    pub fn from_json(raw: &Map<String, Value>) -> Result<Self> {
        let id = raw
            .get(ID_COLUMN)
            .and_then(Value::as_u64)
            .ok_or_else(|| SyncError::Decode("activity without an integer id".to_string()))?;

        let mut fields = Vec::with_capacity(raw.len());
        flatten_into("", raw, &mut fields);
        Ok(Self { id, fields })
    }

    /// Build a record from already-flat cells (e.g. a cached table row).
    pub fn from_cells(fields: Vec<(String, String)>) -> Result<Self> {
        let id = id_cell(&fields)
            .ok_or_else(|| SyncError::Decode("cached row without an integer id".to_string()))?;
        Ok(Self { id, fields })
    }

    pub fn get(&self, column: &str) -> Option<&str> {
        cell(&self.fields, column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(c, _)| c.as_str())
    }

    /// Whether Strava flagged this activity as recorded on a trainer.
    pub fn is_trainer(&self) -> bool {
        self.get(TRAINER_COLUMN).is_some_and(is_truthy)
    }
}

/// A table row: an activity, or a cached row whose ID cell is unusable.
#[derive(Debug, Clone)]
enum Row {
    Activity(ActivityRecord),
    Unkeyed(Vec<(String, String)>),
}

impl Row {
    fn get(&self, column: &str) -> Option<&str> {
        match self {
            Row::Activity(record) => record.get(column),
            Row::Unkeyed(fields) => cell(fields, column),
        }
    }
}

/// Ordered activity table with exactly one row per ID.
///
/// Cached rows without a usable ID are carried along untouched and written
/// back in place; they never match a fetched activity.
#[derive(Debug, Clone, Default)]
pub struct ActivityTable {
    columns: Vec<String>,
    rows: Vec<Row>,
    positions: HashMap<u64, usize>,
}

impl ActivityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = ActivityRecord>) -> Self {
        let mut table = Self::new();
        table.merge(records);
        table
    }

    /// Insert or replace a row. A replaced row keeps its position and takes
    /// the newer values.
    pub fn upsert(&mut self, record: ActivityRecord) {
        self.add_columns(record.columns());

        match self.positions.get(&record.id) {
            Some(&pos) => self.rows[pos] = Row::Activity(record),
            None => {
                self.positions.insert(record.id, self.rows.len());
                self.rows.push(Row::Activity(record));
            }
        }
    }

    /// Append a row read back from the cache. Returns `false` if the row had
    /// no usable ID and was kept as an opaque row.
    pub fn push_cached(&mut self, fields: Vec<(String, String)>) -> bool {
        if let Some(id) = id_cell(&fields) {
            self.upsert(ActivityRecord { id, fields });
            return true;
        }

        self.add_columns(fields.iter().map(|(c, _)| c.as_str()));
        self.rows.push(Row::Unkeyed(fields));
        false
    }

    /// Merge newer records on top of this table (last write wins).
    pub fn merge(&mut self, newer: impl IntoIterator<Item = ActivityRecord>) {
        for record in newer {
            self.upsert(record);
        }
    }

    /// Number of activities. Unkeyed rows are not counted.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of rows, including unkeyed ones.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.positions.contains_key(&id)
    }

    pub fn get(&self, id: u64) -> Option<&ActivityRecord> {
        match self.rows.get(*self.positions.get(&id)?)? {
            Row::Activity(record) => Some(record),
            Row::Unkeyed(_) => None,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Activities in table order.
    pub fn records(&self) -> impl Iterator<Item = &ActivityRecord> + '_ {
        self.rows.iter().filter_map(|row| match row {
            Row::Activity(record) => Some(record),
            Row::Unkeyed(_) => None,
        })
    }

    /// IDs in table order.
    pub fn ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.records().map(|r| r.id)
    }

    /// Row cells aligned to [`Self::columns`]; absent cells are empty.
    pub fn aligned_rows(&self) -> impl Iterator<Item = Vec<&str>> + '_ {
        self.rows.iter().map(move |row| {
            self.columns
                .iter()
                .map(|column| row.get(column).unwrap_or(""))
                .collect()
        })
    }

    fn add_columns<'a>(&mut self, columns: impl Iterator<Item = &'a str>) {
        for column in columns {
            if !self.columns.iter().any(|c| c == column) {
                self.columns.push(column.to_string());
            }
        }
    }
}

fn flatten_into(prefix: &str, object: &Map<String, Value>, out: &mut Vec<(String, String)>) {
    for (key, value) in object {
        let column = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };
        match value {
            Value::Object(nested) if nested.is_empty() => out.push((column, String::new())),
            Value::Object(nested) => flatten_into(&column, nested, out),
            other => out.push((column, cell_text(other))),
        }
    }
}

/// Render a JSON value as a table cell.
pub(crate) fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

fn cell<'a>(fields: &'a [(String, String)], column: &str) -> Option<&'a str> {
    fields
        .iter()
        .find(|(c, _)| c == column)
        .map(|(_, v)| v.as_str())
}

fn id_cell(fields: &[(String, String)]) -> Option<u64> {
    cell(fields, ID_COLUMN).and_then(parse_id)
}

/// Parse an ID cell. Tolerates a float spelling (`123.0`) left by other tools.
fn parse_id(cell: &str) -> Option<u64> {
    let cell = cell.trim();
    cell.parse::<u64>().ok().or_else(|| {
        cell.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0 && *f >= 0.0)
            .map(|f| f as u64)
    })
}

fn is_truthy(cell: &str) -> bool {
    matches!(cell.trim().to_ascii_lowercase().as_str(), "true" | "1")
}

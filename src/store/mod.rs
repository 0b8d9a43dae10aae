// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local file storage.
//!
//! Layout under the data directory:
//! - `token.json` - credential record
//! - `activities.csv` - activity summary table
//! - `Streams/stream_{id:09}.csv` - one stream table per activity

pub mod activity_store;
pub mod token_store;

pub use activity_store::ActivityStore;
pub use token_store::TokenStore;

use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::Result;

/// Write `path` via a temp file in the same directory and rename it into
/// place, so readers never observe a truncated file.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut NamedTempFile) -> Result<()>,
{
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    write(&mut tmp)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

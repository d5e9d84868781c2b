//! Durable state of the harvest.
//!
//! # Submodules
//!
//! - [`checkpoint`]: CID -> `has_image`, rewritten after every probed CID
//! - [`dataset`]: harvested [`Record`]s, merged and rewritten once per run
//! - [`images`]: one image file per harvested CID
//! - [`execution_log`]: one appended line per run
//!
//! # Output Structure
//!
//! ```text
//! ./
//! ├── checkpoint_signaux.csv     # cid,has_image
//! ├── signaux_routiers.csv       # cid,Numero,Nom,...,Dimensions
//! ├── execution_log.txt
//! └── images_signaux/
//!     ├── P-010-1-13001.png
//!     └── ...
//! ```
//!
//! The CSV stores are behind the [`CheckpointStore`] and [`DatasetStore`]
//! traits so the scan controller can run against in-memory doubles.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::StoreError;
use crate::models::{Cid, Record};

pub mod checkpoint;
pub mod dataset;
pub mod execution_log;
pub mod images;

/// Persisted CID -> `has_image` mapping. Entries are never deleted.
pub trait CheckpointStore {
    fn load(&mut self) -> Result<BTreeMap<Cid, bool>, StoreError>;

    /// Insert or overwrite the entry for `cid` and persist it before returning.
    fn upsert(&mut self, cid: Cid, has_image: bool) -> Result<(), StoreError>;
}

/// Persisted collection of records, at most one per CID.
pub trait DatasetStore {
    fn load(&mut self) -> Result<Vec<Record>, StoreError>;

    /// Replace the persisted collection wholesale.
    fn persist(&mut self, records: &[Record]) -> Result<(), StoreError>;

    /// Merge `new` over `existing` with [`merge_records`] and persist the result.
    fn merge_and_persist(
        &mut self,
        existing: Vec<Record>,
        new: Vec<Record>,
    ) -> Result<Vec<Record>, StoreError> {
        let merged = merge_records(existing, new);
        self.persist(&merged)?;
        Ok(merged)
    }
}

/// Concatenate `existing` then `new` and keep the last record of each CID.
///
/// Surviving records keep the relative order of their last occurrence, so a
/// re-fetched CID moves to where the new batch put it.
pub fn merge_records(existing: Vec<Record>, new: Vec<Record>) -> Vec<Record> {
    let mut merged: Vec<Record> = existing
        .into_iter()
        .chain(new)
        .rev()
        .unique_by(|r| r.cid)
        .collect();
    merged.reverse();
    merged
}

/// Read every row of a CSV file with headers. A missing file has no rows.
pub(crate) fn read_csv<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, StoreError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut reader = csv::Reader::from_path(path).map_err(|e| StoreError::csv(path, e))?;
    reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| StoreError::csv(path, e))
}

/// Write `rows` to a sibling temp file, then rename it over `path`.
///
/// A crash mid-write leaves the previous file intact.
pub(crate) fn write_csv_atomic<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
    }
    let tmp = tmp_path(path);
    {
        let mut writer = csv::Writer::from_path(&tmp).map_err(|e| StoreError::csv(&tmp, e))?;
        for row in rows {
            writer.serialize(row).map_err(|e| StoreError::csv(&tmp, e))?;
        }
        writer.flush().map_err(|e| StoreError::io(&tmp, e))?;
    }
    fs::rename(&tmp, path).map_err(|e| StoreError::io(path, e))
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

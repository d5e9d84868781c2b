//! CSV-backed checkpoint store.
//!
//! The whole file is rewritten (temp file + rename) on every upsert, so a
//! crash leaves either the previous or the new file, with exactly one row per
//! CID. Writing cost is O(n) per upsert and O(n^2) over a run that adds n
//! entries. Rows are two short columns: at 100k entries a rewrite is a few
//! hundred KB. Ranges far beyond that would want an append log compacted on
//! load instead.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use super::{CheckpointStore, read_csv, write_csv_atomic};
use crate::error::StoreError;
use crate::models::{CheckpointEntry, Cid};

#[derive(Debug)]
pub struct CsvCheckpointStore {
    path: PathBuf,
    entries: Option<BTreeMap<Cid, bool>>,
}

impl CsvCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn entries(&mut self) -> Result<&mut BTreeMap<Cid, bool>, StoreError> {
        if self.entries.is_none() {
            let rows: Vec<CheckpointEntry> = read_csv(&self.path)?;
            // Later rows win if a hand-edited file repeats a CID.
            let map = rows.into_iter().map(|e| (e.cid, e.has_image)).collect();
            self.entries = Some(map);
        }
        Ok(self.entries.get_or_insert_with(BTreeMap::new))
    }
}

impl CheckpointStore for CsvCheckpointStore {
    #[instrument(level = "info", skip(self), fields(path = %self.path.display()))]
    fn load(&mut self) -> Result<BTreeMap<Cid, bool>, StoreError> {
        self.entries = None;
        let entries = self.entries()?.clone();
        info!(entries = entries.len(), "Loaded checkpoint");
        Ok(entries)
    }

    fn upsert(&mut self, cid: Cid, has_image: bool) -> Result<(), StoreError> {
        let path = self.path.clone();
        let entries = self.entries()?;
        entries.insert(cid, has_image);
        let rows: Vec<CheckpointEntry> = entries
            .iter()
            .map(|(&cid, &has_image)| CheckpointEntry { cid, has_image })
            .collect();
        write_csv_atomic(&path, &rows)?;
        debug!(cid, has_image, "Checkpoint written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = CsvCheckpointStore::new(dir.path().join("checkpoint.csv"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_persists_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.csv");
        let mut store = CsvCheckpointStore::new(&path);
        store.upsert(100, false).unwrap();
        store.upsert(101, true).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "cid,has_image\n100,false\n101,true\n");

        let mut reopened = CsvCheckpointStore::new(&path);
        let entries = reopened.load().unwrap();
        assert_eq!(entries.get(&100), Some(&false));
        assert_eq!(entries.get(&101), Some(&true));
    }

    #[test]
    fn test_upsert_overwrites_and_keeps_one_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.csv");
        let mut store = CsvCheckpointStore::new(&path);
        store.upsert(7, false).unwrap();
        store.upsert(7, true).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert_eq!(store.load().unwrap().get(&7), Some(&true));
    }

    #[test]
    fn test_upsert_without_load_keeps_existing_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.csv");
        fs::write(&path, "cid,has_image\n1,True\n2,False\n").unwrap();

        let mut store = CsvCheckpointStore::new(&path);
        store.upsert(3, true).unwrap();

        let entries = CsvCheckpointStore::new(&path).load().unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries.get(&1), Some(&true));
        assert_eq!(entries.get(&2), Some(&false));
    }

    #[test]
    fn test_load_rejects_bad_flag() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.csv");
        fs::write(&path, "cid,has_image\n1,maybe\n").unwrap();
        let err = CsvCheckpointStore::new(&path).load().unwrap_err();
        assert!(matches!(err, StoreError::Csv { .. }));
    }

    #[test]
    fn test_each_upsert_leaves_complete_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("checkpoint.csv");
        let mut store = CsvCheckpointStore::new(&path);

        for cid in 1..=500 {
            store.upsert(cid, cid % 3 == 0).unwrap();
            if cid % 100 == 0 {
                let on_disk = CsvCheckpointStore::new(&path).load().unwrap();
                assert_eq!(on_disk.len(), cid as usize);
            }
        }
        store.upsert(250, true).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 501);
        assert!(!dir.path().join("checkpoint.csv.tmp").exists());
        assert_eq!(CsvCheckpointStore::new(&path).load().unwrap().get(&250), Some(&true));
    }
}

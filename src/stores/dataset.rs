//! CSV-backed dataset store.

use std::path::{Path, PathBuf};

use tracing::{info, instrument};

use super::{DatasetStore, read_csv, write_csv_atomic};
use crate::error::StoreError;
use crate::models::Record;

#[derive(Debug)]
pub struct CsvDatasetStore {
    path: PathBuf,
}

impl CsvDatasetStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetStore for CsvDatasetStore {
    #[instrument(level = "info", skip(self), fields(path = %self.path.display()))]
    fn load(&mut self) -> Result<Vec<Record>, StoreError> {
        let records: Vec<Record> = read_csv(&self.path)?;
        info!(records = records.len(), "Loaded dataset");
        Ok(records)
    }

    #[instrument(level = "info", skip_all, fields(path = %self.path.display(), records = records.len()))]
    fn persist(&mut self, records: &[Record]) -> Result<(), StoreError> {
        write_csv_atomic(&self.path, records)?;
        info!("Dataset written");
        Ok(())
    }
}

//! Image files of harvested entries.
//!
//! Files are named `{Numero}-{cid}.png`. The CID keeps names unique when two
//! entries share a number, and a re-fetch overwrites the previous file.

use std::path::PathBuf;

use tokio::fs;
use tracing::{info, instrument};

use crate::error::CidError;
use crate::models::Record;
use crate::utils::sanitize_file_stem;

#[derive(Debug, Clone)]
pub struct ImageDir {
    root: PathBuf,
}

impl ImageDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, record: &Record) -> PathBuf {
        self.root
            .join(format!("{}-{}.png", sanitize_file_stem(&record.numero), record.cid))
    }

    #[instrument(level = "debug", skip_all, fields(cid = record.cid))]
    pub async fn save(&self, record: &Record, bytes: &[u8]) -> Result<PathBuf, CidError> {
        let path = self.path_for(record);
        let to_err = |source| CidError::Image {
            path: path.clone(),
            source,
        };
        fs::create_dir_all(&self.root).await.map_err(to_err)?;
        fs::write(&path, bytes).await.map_err(to_err)?;
        info!(path = %path.display(), bytes = bytes.len(), "Saved image");
        Ok(path)
    }
}

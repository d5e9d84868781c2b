//! Error taxonomy for the harvester.
//!
//! Errors are split by blast radius:
//! - [`FetchError`], [`ExtractError`] and [`CidError`] describe why a single
//!   CID could not be processed. The scan logs them and moves on.
//! - [`StoreError`] means a durable file could not be read or written. For the
//!   checkpoint and dataset stores this aborts the scan.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::models::Cid;

/// Transport failure talking to the remote catalog.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },
    /// The request never produced a response (DNS, TLS, timeout, reset).
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// The detail page did not have the shape the extractor expects.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("image element has no src attribute")]
    MissingImageSource,
    #[error("image src {src:?} cannot be resolved: {source}")]
    InvalidImageUrl {
        src: String,
        #[source]
        source: url::ParseError,
    },
    #[error("dimensions row {row} has {cells} cell(s), expected at least 2")]
    MalformedDimensionRow { row: usize, cells: usize },
}

/// Why one CID was left unprocessed this run.
#[derive(Debug, Error)]
pub enum CidError {
    #[error(transparent)]
    Transport(#[from] FetchError),
    #[error("unexpected document shape: {0}")]
    Extraction(#[from] ExtractError),
    #[error("failed to write image {}: {source}", .path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A durable file could not be read or written.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV error on {}: {source}", .path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn csv(path: impl Into<PathBuf>, source: csv::Error) -> Self {
        StoreError::Csv {
            path: path.into(),
            source,
        }
    }
}

/// A `Dimensions` cell is neither JSON nor a Python list literal.
#[derive(Debug, Error)]
#[error("unreadable Dimensions cell at byte {pos}: {reason}")]
pub struct DimensionsError {
    pub pos: usize,
    pub reason: &'static str,
}

impl DimensionsError {
    pub fn new(pos: usize, reason: &'static str) -> Self {
        Self { pos, reason }
    }
}

/// Fatal scan failure.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("invalid CID range: start {start} is after end {end}")]
    InvalidRange { start: Cid, end: Cid },
    #[error(transparent)]
    Store(#[from] StoreError),
}

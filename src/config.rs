//! Runtime configuration handed to the scan controller.
//!
//! Everything the harvest touches on disk or over the network is named here,
//! so tests can point a controller at a temporary directory and a fake host.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::cli::Cli;
use crate::models::Cid;

#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Detail page URL; the `cid` query parameter is set per entry.
    pub detail_url: Url,
    pub dataset_path: PathBuf,
    pub checkpoint_path: PathBuf,
    pub image_dir: PathBuf,
    pub execution_log_path: PathBuf,
    /// Fixed pause after every CID that touched the network.
    pub request_delay: Duration,
    pub show_progress: bool,
}

impl ScanConfig {
    pub fn from_cli(cli: &Cli) -> Result<Self, url::ParseError> {
        Ok(ScanConfig {
            detail_url: Url::parse(&cli.detail_url)?,
            dataset_path: cli.dataset.clone(),
            checkpoint_path: cli.checkpoint.clone(),
            image_dir: cli.image_dir.clone(),
            execution_log_path: cli.execution_log.clone(),
            request_delay: Duration::from_millis(cli.delay_ms),
            show_progress: !cli.no_progress,
        })
    }

    /// URL of the detail page for `cid`.
    pub fn detail_url_for(&self, cid: Cid) -> Url {
        let mut url = self.detail_url.clone();
        url.query_pairs_mut()
            .clear()
            .append_pair("cid", &cid.to_string());
        url
    }
}

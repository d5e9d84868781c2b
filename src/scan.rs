//! Incremental fetch-and-checkpoint pipeline.
//!
//! [`ScanController::run_scan`] walks an inclusive CID range in ascending
//! order. For each CID it:
//!
//! 1. decides from the scan mode and the prior checkpoint whether to skip it
//!    ([`should_skip`]),
//! 2. fetches the detail page and probes it for an image,
//! 3. records `has_image = false` right away when there is none, or downloads
//!    the image, stores it and records `has_image = true`,
//! 4. pauses for the configured delay before the next CID.
//!
//! Any per-CID failure is logged and counted; that CID gets no checkpoint and
//! is retried by a later run. The checkpoint is persisted after every CID, the
//! dataset once at the end of the run.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ScanConfig;
use crate::error::{CidError, ScanError, StoreError};
use crate::fetcher::PageFetcher;
use crate::models::{Cid, Record, ScanMode};
use crate::scrapers::rsr::{Extraction, extract};
use crate::stores::execution_log::ExecutionLog;
use crate::stores::images::ImageDir;
use crate::stores::{CheckpointStore, DatasetStore};
use crate::utils::truncate_for_log;

/// Whether a CID is skipped, given the mode and its prior checkpoint
/// (`Some(has_image)`), if any.
pub fn should_skip(mode: ScanMode, prior: Option<bool>) -> bool {
    match mode {
        ScanMode::Full => false,
        ScanMode::Minimal => prior.is_some(),
        // A CID seen with an image is probed again.
        ScanMode::Partial => prior == Some(false),
    }
}

/// Per-run counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ScanResult {
    /// CIDs whose record and image were stored.
    pub fetched: usize,
    /// CIDs probed and found without an image.
    pub no_image: usize,
    /// CIDs skipped from the checkpoint without any request.
    pub skipped: usize,
    /// CIDs left unprocessed after a transport, extraction or image error.
    pub failed: usize,
}

impl fmt::Display for ScanResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched: {}, no image: {}, skipped: {}, failed: {}",
            self.fetched, self.no_image, self.skipped, self.failed
        )
    }
}

enum CidOutcome {
    NoImage,
    Fetched(Record),
}

/// Drives one scan against a fetcher and the two stores.
///
/// The controller is the only writer of both stores for the duration of a run.
pub struct ScanController<F, C, D> {
    config: ScanConfig,
    fetcher: F,
    checkpoints: C,
    dataset: D,
    images: ImageDir,
    execution_log: ExecutionLog,
}

impl<F, C, D> ScanController<F, C, D>
where
    F: PageFetcher,
    C: CheckpointStore,
    D: DatasetStore,
{
    pub fn new(config: ScanConfig, fetcher: F, checkpoints: C, dataset: D) -> Self {
        let images = ImageDir::new(&config.image_dir);
        let execution_log = ExecutionLog::new(&config.execution_log_path);
        Self {
            config,
            fetcher,
            checkpoints,
            dataset,
            images,
            execution_log,
        }
    }

    /// Scan `[cid_start, cid_end]` under `mode`.
    ///
    /// # Errors
    ///
    /// Only an invalid range or a checkpoint/dataset store failure is returned;
    /// per-CID failures are counted in [`ScanResult::failed`].
    #[instrument(level = "info", skip(self), fields(mode = %mode))]
    pub async fn run_scan(
        &mut self,
        cid_start: Cid,
        cid_end: Cid,
        mode: ScanMode,
    ) -> Result<ScanResult, ScanError> {
        if cid_start > cid_end {
            return Err(ScanError::InvalidRange {
                start: cid_start,
                end: cid_end,
            });
        }

        if let Err(e) = self
            .execution_log
            .append(Local::now(), mode, cid_start, cid_end)
            .await
        {
            warn!(path = %self.execution_log.path().display(), error = %e, "Failed to append to execution log");
        }

        let prior = self.checkpoints.load()?;
        // Read up front so an unreadable dataset fails before any request.
        let existing = self.dataset.load()?;

        let progress = self.progress_bar(u64::from(cid_end - cid_start) + 1);
        let mut result = ScanResult::default();
        let mut batch = Vec::new();

        for cid in cid_start..=cid_end {
            progress.set_message(format!("cid {cid}"));
            if let Err(e) = self.scan_one(cid, mode, &prior, &mut result, &mut batch).await {
                progress.abandon();
                error!(cid, error = %e, "Checkpoint store failed; aborting scan");
                // Records whose CIDs are already checkpointed must not be lost.
                // The checkpoint failure stays the reported cause either way.
                if !batch.is_empty() {
                    if let Err(flush_err) = self.dataset.merge_and_persist(existing, batch) {
                        error!(error = %flush_err, "Failed to flush collected records after abort");
                    }
                }
                return Err(e.into());
            }
            progress.inc(1);
        }
        progress.finish_and_clear();

        if batch.is_empty() {
            info!("No new records; dataset left untouched");
        } else {
            let merged = self.dataset.merge_and_persist(existing, batch)?;
            info!(total_records = merged.len(), "Dataset merged");
        }

        info!(
            fetched = result.fetched,
            no_image = result.no_image,
            skipped = result.skipped,
            failed = result.failed,
            "Scan complete"
        );
        Ok(result)
    }

    /// Handle one CID. Only a checkpoint store failure is returned.
    async fn scan_one(
        &mut self,
        cid: Cid,
        mode: ScanMode,
        prior: &BTreeMap<Cid, bool>,
        result: &mut ScanResult,
        batch: &mut Vec<Record>,
    ) -> Result<(), StoreError> {
        let previous = prior.get(&cid).copied();
        if should_skip(mode, previous) {
            debug!(cid, ?previous, "Skipping CID from checkpoint");
            result.skipped += 1;
            return Ok(());
        }

        match self.process_cid(cid).await {
            Ok(CidOutcome::NoImage) => {
                self.checkpoints.upsert(cid, false)?;
                info!(cid, "No image; checkpointed");
                result.no_image += 1;
            }
            Ok(CidOutcome::Fetched(record)) => {
                self.checkpoints.upsert(cid, true)?;
                info!(cid, numero = %record.numero, nom = %record.nom, "Fetched entry");
                result.fetched += 1;
                batch.push(record);
            }
            Err(e) => {
                warn!(cid, error = %e, "CID not processed this run");
                result.failed += 1;
            }
        }

        sleep(self.config.request_delay).await;
        Ok(())
    }

    async fn process_cid(&self, cid: Cid) -> Result<CidOutcome, CidError> {
        let page = self.fetcher.fetch_page(cid).await?;
        let extraction = extract(cid, &page.url, &page.body).inspect_err(|e| {
            debug!(cid, error = %e, body = %truncate_for_log(&page.body, 300), "Extraction failed");
        })?;

        match extraction {
            Extraction::NoImage => Ok(CidOutcome::NoImage),
            Extraction::Entry { record, image_url } => {
                let bytes = self.fetcher.fetch_image(&image_url).await?;
                self.images.save(&record, &bytes).await?;
                Ok(CidOutcome::Fetched(record))
            }
        }
    }

    fn progress_bar(&self, len: u64) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg} (eta {eta})")
        {
            pb.set_style(style.progress_chars("=> "));
        }
        pb
    }
}

#[cfg(test)]
impl<F, C, D> ScanController<F, C, D> {
    fn fetcher(&self) -> &F {
        &self.fetcher
    }

    fn checkpoints(&self) -> &C {
        &self.checkpoints
    }

    fn dataset(&self) -> &D {
        &self.dataset
    }
}

//! # RSR Harvest
//!
//! Incrementally harvests road sign entries from the Québec road signage
//! catalog (Répertoire de la signalisation routière). Entries are addressed by
//! a dense integer key, the CID. For each CID with a figure the harvester
//! stores a structured record and the image; a checkpoint remembers which
//! CIDs were already probed so interrupted or repeated scans resume cheaply.
//!
//! ## Usage
//!
//! ```sh
//! rsr_harvest --cid-start 13000 --cid-end 13099 --mode minimal
//! ```
//!
//! ## Architecture
//!
//! 1. **Skip decision**: the scan mode and the checkpoint decide which CIDs are probed
//! 2. **Probe/fetch**: the detail page is fetched and read by the field extractor
//! 3. **Checkpoint**: every probed CID is checkpointed immediately
//! 4. **Merge**: records of the run are merged into the dataset once, last write wins

use std::error::Error;

use clap::Parser;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;
mod config;
mod error;
mod fetcher;
mod models;
mod pyrepr;
mod scan;
mod scrapers;
mod stores;
mod utils;

use cli::Cli;
use config::ScanConfig;
use fetcher::HttpFetcher;
use scan::ScanController;
use stores::checkpoint::CsvCheckpointStore;
use stores::dataset::CsvDatasetStore;
use utils::ensure_writable_dir;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("rsr_harvest starting up");

    // Parse CLI
    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    let config = ScanConfig::from_cli(&args).inspect_err(|e| {
        error!(detail_url = %args.detail_url, error = %e, "Invalid detail page URL");
    })?;

    // Early check: ensure the image dir is writable before any request
    if let Err(e) = ensure_writable_dir(&config.image_dir).await {
        error!(
            path = %config.image_dir.display(),
            error = %e,
            "Image directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    let fetcher = HttpFetcher::new(&config)?;
    if args.skip_robots_check {
        debug!("Skipping robots.txt check");
    } else if let Err(e) = fetcher.check_robots_txt().await {
        warn!(error = %e, "Could not fetch robots.txt; continuing");
    }

    let checkpoints = CsvCheckpointStore::new(&config.checkpoint_path);
    let dataset = CsvDatasetStore::new(&config.dataset_path);
    info!(
        checkpoint = %checkpoints.path().display(),
        dataset = %dataset.path().display(),
        mode = %args.mode,
        cid_start = args.cid_start,
        cid_end = args.cid_end,
        "Starting scan"
    );

    let mut controller = ScanController::new(config, fetcher, checkpoints, dataset);
    let result = match controller.run_scan(args.cid_start, args.cid_end, args.mode).await {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Scan aborted");
            return Err(e.into());
        }
    };

    println!("{result}");

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

//! Command-line interface definitions for the RSR harvester.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! The detail page URL can also be provided through an environment variable.

use std::path::PathBuf;

use clap::Parser;

use crate::models::{Cid, ScanMode};

/// Detail page of one catalog entry; the `cid` query parameter is replaced per entry.
pub const DEFAULT_DETAIL_URL: &str =
    "https://www.rsr.transports.gouv.qc.ca/Dispositifs/Details.aspx";

/// Command-line arguments for the harvester.
///
/// # Examples
///
/// ```sh
/// # Probe everything never seen before in 13000..=13099
/// rsr_harvest -s 13000 -e 13099
///
/// # Re-probe entries known to have an image, skip known blanks
/// rsr_harvest -s 13000 -e 13099 --mode partial
///
/// # Start over, ignoring the checkpoint
/// rsr_harvest -s 12392 -e 18392 --mode full --delay-ms 500
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// First CID of the scan
    #[arg(short = 's', long)]
    pub cid_start: Cid,

    /// Last CID of the scan (inclusive)
    #[arg(short = 'e', long)]
    pub cid_end: Cid,

    /// How the checkpoint decides which CIDs are skipped
    #[arg(short, long, value_enum, default_value_t = ScanMode::Minimal)]
    pub mode: ScanMode,

    /// Detail page URL of the catalog
    #[arg(long, env = "RSR_DETAIL_URL", default_value = DEFAULT_DETAIL_URL)]
    pub detail_url: String,

    /// Dataset CSV file
    #[arg(long, default_value = "signaux_routiers.csv")]
    pub dataset: PathBuf,

    /// Checkpoint CSV file
    #[arg(long, default_value = "checkpoint_signaux.csv")]
    pub checkpoint: PathBuf,

    /// Directory receiving the downloaded images
    #[arg(long, default_value = "images_signaux")]
    pub image_dir: PathBuf,

    /// Append-only execution log
    #[arg(long, default_value = "execution_log.txt")]
    pub execution_log: PathBuf,

    /// Pause after each CID that touched the network, in milliseconds
    #[arg(long, default_value_t = 250)]
    pub delay_ms: u64,

    /// Do not fetch and print robots.txt before scanning
    #[arg(long)]
    pub skip_robots_check: bool,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing_defaults() {
        let cli = Cli::parse_from(["rsr_harvest", "--cid-start", "100", "--cid-end", "200"]);

        assert_eq!(cli.cid_start, 100);
        assert_eq!(cli.cid_end, 200);
        assert_eq!(cli.mode, ScanMode::Minimal);
        assert_eq!(cli.delay_ms, 250);
        assert_eq!(cli.dataset, PathBuf::from("signaux_routiers.csv"));
        assert_eq!(cli.image_dir, PathBuf::from("images_signaux"));
        assert!(!cli.skip_robots_check);
    }

    #[test]
    fn test_cli_short_flags_and_mode() {
        let cli = Cli::parse_from(["rsr_harvest", "-s", "5", "-e", "9", "-m", "partial"]);

        assert_eq!(cli.cid_start, 5);
        assert_eq!(cli.cid_end, 9);
        assert_eq!(cli.mode, ScanMode::Partial);
    }

    #[test]
    fn test_cli_rejects_unknown_mode() {
        let res = Cli::try_parse_from(["rsr_harvest", "-s", "1", "-e", "2", "-m", "lazy"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_cli_rejects_negative_cid() {
        let res = Cli::try_parse_from(["rsr_harvest", "-s", "-1", "-e", "2"]);
        assert!(res.is_err());
    }
}

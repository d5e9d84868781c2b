//! HTTP access to the remote catalog.
//!
//! The scan controller only talks to the network through [`PageFetcher`], so
//! the pipeline can run against an in-memory double in tests. [`HttpFetcher`]
//! is the `reqwest` implementation used by the binary.
//!
//! Two endpoints are used:
//! - the entry detail page, parameterized by CID
//! - the image endpoint, whose URL (with its `imgId`) is found on the detail page

use std::time::{Duration, Instant};

use reqwest::{Client, Response};
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::config::ScanConfig;
use crate::error::FetchError;
use crate::models::Cid;

const USER_AGENT: &str = concat!("rsr_harvest/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A detail page as returned by the server.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL the page was requested from; relative links resolve against it.
    pub url: Url,
    pub body: String,
}

/// Network side of the harvest.
pub trait PageFetcher {
    /// Fetch the detail page of one catalog entry.
    async fn fetch_page(&self, cid: Cid) -> Result<FetchedPage, FetchError>;

    /// Download the raw bytes of an image found on a detail page.
    async fn fetch_image(&self, url: &Url) -> Result<Vec<u8>, FetchError>;
}

/// [`PageFetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    config: ScanConfig,
}

impl HttpFetcher {
    pub fn new(config: &ScanConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    async fn get(&self, url: &Url) -> Result<Response, FetchError> {
        let t0 = Instant::now();
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Request {
                url: url.to_string(),
                source,
            })?;
        let status = resp.status();
        debug!(%url, %status, elapsed_ms = t0.elapsed().as_millis() as u64, "GET");
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(resp)
    }

    /// Fetch `/robots.txt` from the catalog host and log it.
    ///
    /// Only informational: the scan runs whatever the file says.
    #[instrument(level = "info", skip_all)]
    pub async fn check_robots_txt(&self) -> Result<(), FetchError> {
        let mut robots = self.config.detail_url.clone();
        robots.set_path("/robots.txt");
        robots.set_query(None);

        let resp = self.get(&robots).await?;
        let body = resp.text().await.map_err(|source| FetchError::Request {
            url: robots.to_string(),
            source,
        })?;
        info!(url = %robots, "robots.txt content:\n{}", body.trim_end());
        Ok(())
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self))]
    async fn fetch_page(&self, cid: Cid) -> Result<FetchedPage, FetchError> {
        let url = self.config.detail_url_for(cid);
        let resp = self.get(&url).await?;
        let body = resp.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        Ok(FetchedPage { url, body })
    }

    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn fetch_image(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let resp = self.get(url).await?;
        let bytes = resp.bytes().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;
        if bytes.is_empty() {
            warn!(%url, "Image endpoint returned an empty body");
        }
        Ok(bytes.to_vec())
    }
}

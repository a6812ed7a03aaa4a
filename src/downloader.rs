//! Reference-image downloader for catalog entries.
//!
//! Fetches each entry's artwork into `<id>.<ext>`; individual failures
//! are logged and skipped, and cancellation is honored between entries.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use futures_util::StreamExt;
use reqwest::Client;
use tokio::io::AsyncWriteExt;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::{Catalog, CatalogEntry};
use crate::error::Result;

/// Called after every processed entry with (entries finished, total).
pub type ProgressCallback = Box<dyn Fn(usize, usize) + Send + Sync>;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct DownloadOptions {
    pub out_dir: PathBuf,
    /// Re-fetch images that already exist locally.
    pub force: bool,
    /// Pause after each fetched image, out of politeness to the host.
    pub delay: Duration,
}

impl DownloadOptions {
    pub fn new(out_dir: impl Into<PathBuf>) -> Self {
        Self {
            out_dir: out_dir.into(),
            force: false,
            delay: Duration::from_millis(500),
        }
    }
}

/// What happened across one downloader run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSummary {
    pub downloaded: usize,
    /// Already present locally, or the record carried no image URL.
    pub skipped: usize,
    pub failed: usize,
    pub cancelled: bool,
}

enum FetchOutcome {
    Downloaded,
    AlreadyPresent,
    NoUrl,
}

pub struct ImageDownloader {
    client: Client,
    options: DownloadOptions,
}

impl ImageDownloader {
    pub fn new(options: DownloadOptions) -> Result<Self> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, options })
    }

    /// Fetch reference images for every catalog entry.
    ///
    /// The cancellation token is checked before each entry, so a running
    /// transfer finishes but nothing new starts once it fires.
    pub async fn fetch_all(
        &self,
        catalog: &Catalog,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<DownloadSummary> {
        tokio::fs::create_dir_all(&self.options.out_dir).await?;

        let total = catalog.len();
        let mut summary = DownloadSummary::default();

        for (done, entry) in catalog.entries().iter().enumerate() {
            if cancel.is_cancelled() {
                info!(done, total, "download run cancelled");
                summary.cancelled = true;
                break;
            }

            match self.fetch_entry(entry).await {
                Ok(FetchOutcome::Downloaded) => {
                    summary.downloaded += 1;
                    tokio::select! {
                        _ = sleep(self.options.delay) => {}
                        _ = cancel.cancelled() => {}
                    }
                }
                Ok(FetchOutcome::AlreadyPresent | FetchOutcome::NoUrl) => summary.skipped += 1,
                Err(err) => {
                    warn!(id = entry.id, err = %err, "skipping failed download");
                    summary.failed += 1;
                }
            }

            if let Some(ref callback) = progress {
                callback(done + 1, total);
            }
        }

        info!(
            downloaded = summary.downloaded,
            skipped = summary.skipped,
            failed = summary.failed,
            cancelled = summary.cancelled,
            "downloader finished"
        );
        Ok(summary)
    }

    async fn fetch_entry(&self, entry: &CatalogEntry) -> anyhow::Result<FetchOutcome> {
        let url = match entry.image_url.as_deref() {
            Some(url) => url,
            None => {
                debug!(id = entry.id, "no image reference in catalog");
                return Ok(FetchOutcome::NoUrl);
            }
        };

        let path = self.options.out_dir.join(file_name_for(entry.id, url));
        if !self.options.force && path.exists() {
            debug!(id = entry.id, "image already present");
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("requesting {url}"))?;
        if !response.status().is_success() {
            anyhow::bail!("{url} returned status {}", response.status());
        }

        // Stream into a sibling temp file and rename at the end, so an
        // interrupted transfer never leaves a truncated image behind.
        let temp_path = path.with_extension("part");
        if let Err(err) = stream_to_file(response, &temp_path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(err);
        }
        tokio::fs::rename(&temp_path, &path)
            .await
            .with_context(|| format!("moving image into {}", path.display()))?;

        info!(id = entry.id, path = %path.display(), "downloaded card image");
        Ok(FetchOutcome::Downloaded)
    }
}

async fn stream_to_file(response: reqwest::Response, path: &Path) -> anyhow::Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .with_context(|| format!("creating {}", path.display()))?;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.context("reading download stream")?;
        file.write_all(&chunk).await.context("writing image data")?;
    }
    file.flush().await.context("flushing image data")?;
    Ok(())
}

/// Local file name for an entry: the card id plus the URL's extension,
/// falling back to jpg when the URL has none worth keeping.
fn file_name_for(id: u64, url: &str) -> String {
    let ext = url
        .rsplit('.')
        .next()
        .filter(|e| !e.is_empty() && e.len() <= 4 && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("jpg");
    format!("{id}.{ext}")
}

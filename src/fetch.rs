//! Retrying HTTP fetch layer.
//!
//! All network I/O goes through [`Fetcher`]: HTML pages via [`Fetcher::fetch_text`]
//! and PDFs via [`Fetcher::fetch_pdf`]. Both retry transient failures with a
//! fixed delay and a bounded attempt count; neither parses what it fetches.
//!
//! Downloads stream to a `.part` file and are renamed into place only once
//! complete, so a file at the destination path always means a finished
//! download.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use crate::config::HarvestConfig;
use crate::error::{HarvestError, Result};

/// User-Agent string for all outgoing requests.
const USER_AGENT: &str = concat!("paper_harvest/", env!("CARGO_PKG_VERSION"));

/// HTTP fetch abstraction with bounded, fixed-delay retries.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    retries: usize,
    retry_delay: Duration,
}

impl Fetcher {
    /// Build a fetcher from the configured timeout and retry budget.
    pub fn new(config: &HarvestConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| HarvestError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            retries: config.fetch_retries.max(1),
            retry_delay: Duration::from_secs(config.retry_delay_secs),
        })
    }

    /// GET a page and return the decoded body.
    ///
    /// Non-200 responses and network/timeout errors are retried up to the
    /// configured attempt count with a fixed delay in between. After the
    /// budget is spent the give-up is logged and `None` returned; the caller
    /// decides whether that skips a document or a whole year.
    #[instrument(level = "debug", skip(self))]
    pub async fn fetch_text(&self, url: &str) -> Option<String> {
        for attempt in 1..=self.retries {
            match self.client.get(url).send().await {
                Ok(resp) if resp.status().is_success() => match resp.text().await {
                    Ok(body) => {
                        debug!(%url, attempt, "fetched page");
                        return Some(body);
                    }
                    Err(e) => {
                        warn!(%url, attempt, error = %e, "failed to read response body")
                    }
                },
                Ok(resp) => {
                    warn!(%url, attempt, status = %resp.status(), "unexpected status")
                }
                Err(e) => warn!(%url, attempt, error = %e, "request failed"),
            }
            if attempt < self.retries {
                sleep(self.retry_delay).await;
            }
        }
        error!(%url, attempts = self.retries, "giving up on fetch");
        None
    }

    /// Download a binary resource to `dest`, streaming in chunks.
    ///
    /// Skips the request entirely if `dest` already exists. The body streams
    /// into `<dest>.part` and is renamed over `dest` on success; on the final
    /// failed attempt the partial file is removed, so `dest` never holds a
    /// truncated download. Filesystem errors abort immediately instead of
    /// being retried.
    #[instrument(level = "debug", skip(self, dest), fields(dest = %dest.display()))]
    pub async fn fetch_pdf(&self, url: &str, dest: &Path) -> Result<()> {
        if dest.exists() {
            info!(%url, "already downloaded, skipping");
            return Ok(());
        }

        let part = part_path(dest);
        for attempt in 1..=self.retries {
            match self.stream_to_file(url, &part).await {
                Ok(()) => {
                    tokio::fs::rename(&part, dest)
                        .await
                        .map_err(|e| HarvestError::io(dest, e))?;
                    info!(%url, dest = %dest.display(), "download complete");
                    return Ok(());
                }
                Err(e @ HarvestError::Io { .. }) => {
                    let _ = tokio::fs::remove_file(&part).await;
                    return Err(e);
                }
                Err(e) => warn!(%url, attempt, error = %e, "download attempt failed"),
            }
            if attempt < self.retries {
                sleep(self.retry_delay).await;
            }
        }

        let _ = tokio::fs::remove_file(&part).await;
        error!(%url, attempts = self.retries, "giving up on download");
        Err(HarvestError::Fetch {
            url: url.to_string(),
            attempts: self.retries,
        })
    }

    async fn stream_to_file(&self, url: &str, part: &Path) -> Result<()> {
        let mut resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| HarvestError::network(url, e))?;
        if !resp.status().is_success() {
            return Err(HarvestError::network(
                url,
                format!("unexpected status {}", resp.status()),
            ));
        }

        let mut file = tokio::fs::File::create(part)
            .await
            .map_err(|e| HarvestError::io(part, e))?;
        while let Some(chunk) = resp
            .chunk()
            .await
            .map_err(|e| HarvestError::network(url, e))?
        {
            file.write_all(&chunk)
                .await
                .map_err(|e| HarvestError::io(part, e))?;
        }
        file.flush().await.map_err(|e| HarvestError::io(part, e))?;
        Ok(())
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

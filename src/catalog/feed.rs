//! HTTP fetching of the published version feed and periodic refresh.
//!
//! Refreshes never mutate the current catalog in place: a fetched document is
//! validated in full and only then swapped into the [`CatalogHandle`]. A failed
//! refresh leaves the previous catalog serving.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::user_agent;

use super::{Catalog, CatalogError, CatalogHandle};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const READ_TIMEOUT_SECS: u64 = 30;

/// Connect/read timeouts for feed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedTimeouts {
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl Default for FeedTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

/// Client for the published version feed.
#[derive(Debug, Clone)]
pub struct FeedClient {
    client: Client,
}

impl FeedClient {
    /// Builds a feed client with default timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Client`] when the HTTP client cannot be constructed.
    pub fn new() -> Result<Self, CatalogError> {
        Self::with_timeouts(FeedTimeouts::default())
    }

    /// Builds a feed client with explicit timeouts.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Client`] when the HTTP client cannot be constructed.
    pub fn with_timeouts(timeouts: FeedTimeouts) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_timeout_secs))
            .timeout(Duration::from_secs(timeouts.read_timeout_secs))
            .user_agent(user_agent::default_feed_user_agent())
            .gzip(true)
            .build()
            .map_err(|error| CatalogError::Client(error.to_string()))?;
        Ok(Self { client })
    }

    /// Downloads and validates the feed at `url`, JSON or upstream XML.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Network`] or [`CatalogError::HttpStatus`] on
    /// transport failures, or a parse error for an invalid document.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch(&self, url: &str) -> Result<Catalog, CatalogError> {
        let network = |source| CatalogError::Network {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url).send().await.map_err(network)?;
        let status = response.status();
        if !status.is_success() {
            return Err(CatalogError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(network)?;
        let catalog = Catalog::from_feed(&body)?;
        debug!(entries = catalog.len(), "Fetched version feed");
        Ok(catalog)
    }

    /// Fetches the feed and swaps it into `handle`.
    ///
    /// Returns the number of entries in the new catalog.
    ///
    /// # Errors
    ///
    /// Returns any fetch error; `handle` is left untouched in that case.
    pub async fn refresh(&self, handle: &CatalogHandle, url: &str) -> Result<usize, CatalogError> {
        let catalog = self.fetch(url).await?;
        let entries = catalog.len();
        handle.replace(catalog);
        info!(entries, "Version catalog refreshed");
        Ok(entries)
    }
}

/// Spawns a background task that refreshes `handle` every `interval`.
///
/// When `save_to` is set, each successfully fetched catalog is also written to
/// that file so a restart can start from the last good feed. Failures are
/// logged and the previous catalog keeps serving.
pub fn spawn_refresh_task(
    client: FeedClient,
    handle: Arc<CatalogHandle>,
    url: String,
    interval: Duration,
    save_to: Option<PathBuf>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match client.fetch(&url).await {
                Ok(catalog) => {
                    if let Some(path) = save_to.as_deref()
                        && let Err(error) = catalog.save_file(path)
                    {
                        warn!(error = %error, "Failed to persist refreshed version feed");
                    }
                    let entries = catalog.len();
                    handle.replace(catalog);
                    info!(entries, "Version catalog refreshed");
                }
                Err(error) => {
                    warn!(
                        error = %error,
                        transient = error.is_transient(),
                        "Version feed refresh failed; keeping previous catalog"
                    );
                }
            }
        }
    })
}

//! Web archive fallback
//!
//! When the standalone worker cannot deliver lyrics, the requester scrapes an archived
//! copy of the lyrics page instead of the live site:
//!
//! 1. [`resolve_snapshot`](ArchivalScraper::resolve_snapshot) finds a snapshot no older
//!    than `max_snapshot_age`, requesting a capture once if none exists.
//! 2. The snapshot is downloaded.
//! 3. [`parse_lyrics`] extracts the text from the lyrics containers.
//!
//! ## Usage
//!
//! ```no_run
//! use lyrics_dl::archive::{ArchivalScraper, LyricsArchive};
//! use lyrics_dl::config::{ArchiveConfig, RetryConfig};
//!
//! # async fn example() -> lyrics_dl::Result<()> {
//! let scraper = ArchivalScraper::new(
//!     reqwest::Client::new(),
//!     ArchiveConfig::default(),
//!     RetryConfig::default(),
//! );
//! let lyrics = scraper.fetch_lyrics("https://genius.com/Artist-song-lyrics").await?;
//! println!("{lyrics}");
//! # Ok(())
//! # }
//! ```

mod availability;
mod capture;
mod parse;

pub use parse::parse_lyrics;

use async_trait::async_trait;

use crate::config::{ArchiveConfig, RetryConfig};
use crate::error::{ArchiveError, Error, Result};
use crate::retry::with_retry;

/// Fallback lyrics source
#[async_trait]
pub trait LyricsArchive: Send + Sync {
    /// Fetch the lyrics on `page_url` from an archived copy
    async fn fetch_lyrics(&self, page_url: &str) -> Result<String>;
}

/// Wayback Machine backed [`LyricsArchive`]
pub struct ArchivalScraper {
    http: reqwest::Client,
    config: ArchiveConfig,
    retry: RetryConfig,
}

impl ArchivalScraper {
    /// Create a scraper using a shared HTTP client
    pub fn new(http: reqwest::Client, config: ArchiveConfig, retry: RetryConfig) -> Self {
        Self {
            http,
            config,
            retry,
        }
    }

    async fn fetch_snapshot(&self, snapshot_url: &str) -> Result<String> {
        let response = self
            .http
            .get(snapshot_url)
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Http {
                status: response.status().as_u16(),
                url: snapshot_url.to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

#[async_trait]
impl LyricsArchive for ArchivalScraper {
    async fn fetch_lyrics(&self, page_url: &str) -> Result<String> {
        let snapshot = self.resolve_snapshot(page_url, false).await?;
        tracing::info!(
            url = %page_url,
            snapshot = %snapshot.snapshot_url,
            snapshot_timestamp = %snapshot.timestamp,
            "Fetching archived lyrics page"
        );

        let html = with_retry(&self.retry, "archive snapshot", || {
            self.fetch_snapshot(&snapshot.snapshot_url)
        })
        .await?;

        match parse_lyrics(&html) {
            Some(lyrics) if !lyrics.trim().is_empty() => Ok(lyrics),
            parsed => {
                tracing::warn!(
                    snapshot = %snapshot.snapshot_url,
                    containers_found = parsed.is_some(),
                    "No lyrics in archived page"
                );
                Err(Error::FallbackFailed(ArchiveError::ParseFailure {
                    url: snapshot.snapshot_url,
                }))
            }
        }
    }
}

//! Lyrics acquisition pipeline
//!
//! [`LyricsFetcher`] is the root of the crate. It owns the shared HTTP client, the
//! database handle and every collaborator, and runs the fallback chain:
//!
//! ```text
//! cache ──hit──▶ text
//!   │ miss
//!   ▼
//! search ──▶ worker ──ok──▶ text
//!              │ NotAcknowledged | FallbackRequested | LyricsEmpty
//!              ▼
//!           archive ──ok──▶ store ──▶ text
//! ```

use std::sync::Arc;

use crate::archive::{ArchivalScraper, LyricsArchive};
use crate::config::{Config, RateLimitConfig};
use crate::db::Database;
use crate::error::{ArchiveError, Error, Result};
use crate::rate_limiter::RateLimiter;
use crate::search::{LyricsSearch, SearchClient};
use crate::store::PersistentStore;
use crate::types::LyricsRecord;
use crate::worker::{WorkerDispatch, WorkerJobCoordinator};

const USER_AGENT: &str = concat!("lyrics-dl/", env!("CARGO_PKG_VERSION"));

/// Main entry point for acquiring lyrics
pub struct LyricsFetcher {
    store: Arc<dyn PersistentStore>,
    search: Arc<dyn LyricsSearch>,
    /// `None` when the standalone worker is disabled
    worker: Option<Arc<dyn WorkerDispatch>>,
    archive: Arc<dyn LyricsArchive>,
    rate_limiter: RateLimiter,
}

impl LyricsFetcher {
    /// Build a fetcher with the default collaborators
    ///
    /// Opens (or creates) the SQLite database, which doubles as the worker queue, and shares
    /// one HTTP client between the search and archive clients.
    pub async fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;

        let db = Arc::new(Database::new(&config.persistence.database_path).await?);

        let search = Arc::new(SearchClient::new(
            http.clone(),
            config.search,
            config.retry.clone(),
        ));
        let archive = Arc::new(ArchivalScraper::new(http, config.archive, config.retry));
        let worker: Option<Arc<dyn WorkerDispatch>> = if config.worker.enabled {
            Some(Arc::new(WorkerJobCoordinator::new(
                db.clone(),
                db.clone(),
                config.worker.clone(),
            )))
        } else {
            None
        };

        tracing::info!(
            database = %config.persistence.database_path.display(),
            worker_enabled = config.worker.enabled,
            "Lyrics fetcher initialized"
        );

        Ok(Self::with_components(
            db,
            search,
            worker,
            archive,
            config.rate_limit,
        ))
    }

    /// Build a fetcher from injected collaborators
    pub fn with_components(
        store: Arc<dyn PersistentStore>,
        search: Arc<dyn LyricsSearch>,
        worker: Option<Arc<dyn WorkerDispatch>>,
        archive: Arc<dyn LyricsArchive>,
        rate_limit: RateLimitConfig,
    ) -> Self {
        let rate_limiter = RateLimiter::new(store.clone(), rate_limit);
        Self {
            store,
            search,
            worker,
            archive,
            rate_limiter,
        }
    }

    /// Per-user quota, evaluated by the calling command layer around [`get_lyrics`](Self::get_lyrics)
    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    /// Get the lyrics for a song, trying the cache, the worker and the archive in turn
    pub async fn get_lyrics(&self, artist: &str, song: &str) -> Result<String> {
        if let Some(text) = self.cached(artist, song).await {
            tracing::info!(artist = %artist, song = %song, "Lyrics cache hit");
            return Ok(text);
        }

        let candidate = self.search.search(artist, song).await?;
        tracing::info!(
            artist = %artist,
            song = %song,
            url = %candidate.url,
            "Found lyrics page"
        );

        if let Some(worker) = &self.worker {
            match worker.request_lyrics(artist, song, &candidate.url).await {
                // The worker persisted its own record
                Ok(text) => return Ok(text),
                Err(e) if e.triggers_fallback() => {
                    tracing::info!(
                        artist = %artist,
                        song = %song,
                        reason = %e,
                        "Worker unavailable, falling back to archive"
                    );
                }
                Err(e) => return Err(e),
            }
        } else {
            tracing::debug!("Worker disabled, using archive");
        }

        let text = self.archive.fetch_lyrics(&candidate.url).await?;
        if text.trim().is_empty() {
            return Err(Error::FallbackFailed(ArchiveError::ParseFailure {
                url: candidate.url,
            }));
        }

        let record = LyricsRecord::new(artist, song, text);
        if let Err(e) = self.store.upsert_lyrics(&record).await {
            tracing::warn!(
                artist = %artist,
                song = %song,
                error = %e,
                "Failed to store archived lyrics"
            );
        }

        tracing::info!(artist = %artist, song = %song, "Lyrics acquired from archive");
        Ok(record.lyrics_text)
    }

    /// Cache lookup; failures degrade to a miss
    async fn cached(&self, artist: &str, song: &str) -> Option<String> {
        match self.store.get_lyrics(artist, song).await {
            Ok(Some(record)) if !record.lyrics_text.trim().is_empty() => Some(record.lyrics_text),
            Ok(_) => None,
            Err(e) => {
                let e = Error::CacheLookup(e.to_string());
                tracing::warn!(artist = %artist, song = %song, error = %e, "Treating as cache miss");
                None
            }
        }
    }
}

//! # lyrics-dl
//!
//! Backend library that acquires song lyrics for a chat bot.
//!
//! ## Pipeline
//!
//! A request for `(artist, song)` goes through:
//! - **Cache** - previously acquired lyrics are served from SQLite
//! - **Search** - the lyrics search API picks the song's page
//! - **Worker** - a standalone scraper process is asked for the page via a shared job queue
//! - **Archive** - when no worker helps, an archived snapshot of the page is scraped
//!
//! A per-user rolling quota ([`RateLimiter`]) is exposed for the calling command layer.
//!
//! ## Quick Start
//!
//! ```no_run
//! use lyrics_dl::{Config, LyricsFetcher};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.search.access_token = Some("token".to_string());
//!
//!     let fetcher = LyricsFetcher::new(config).await?;
//!
//!     fetcher.rate_limiter().check("user-1").await?;
//!     let lyrics = fetcher.get_lyrics("Artist", "Song").await?;
//!     fetcher.rate_limiter().record_success("user-1").await?;
//!
//!     println!("{lyrics}");
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Web archive fallback scraping
pub mod archive;
/// Configuration types
pub mod config;
/// Database persistence layer
pub mod db;
/// Error types
pub mod error;
/// Acquisition pipeline
pub mod orchestrator;
/// Worker queue transport
pub mod queue;
/// Per-user request quota
pub mod rate_limiter;
/// Retry logic with exponential backoff
pub mod retry;
/// Lyrics page search
pub mod search;
/// Persistent store abstraction
pub mod store;
/// Core types
pub mod types;
/// Standalone worker job coordination
pub mod worker;

// unwrap/expect are acceptable in test fakes
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use archive::{ArchivalScraper, LyricsArchive, parse_lyrics};
pub use config::Config;
pub use db::Database;
pub use error::{ArchiveError, DatabaseError, Error, QueueError, Result, SearchError, WorkerError};
pub use orchestrator::LyricsFetcher;
pub use queue::QueueTransport;
pub use rate_limiter::RateLimiter;
pub use search::{LyricsSearch, SearchClient};
pub use store::PersistentStore;
pub use types::{
    ArchiveSnapshot, JobId, LyricsRecord, LyricsRequestJob, LyricsRequestMessage,
    SearchCandidate, SentMessage, UserRateLimitState,
};
pub use worker::{WorkerDispatch, WorkerJobCoordinator};

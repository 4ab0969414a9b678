//! Database layer for lyrics-dl
//!
//! Handles SQLite persistence for cached lyrics, worker jobs, rate limit state and the
//! worker queue. The same database file is opened by the standalone worker process, which
//! is how the two sides coordinate.
//!
//! ## Submodules
//!
//! Methods on [`Database`] are organized by domain:
//! - [`migrations`] - Database lifecycle, schema migrations
//! - [`lyrics`] - Lyrics cache
//! - [`jobs`] - Worker job state
//! - [`rate_limits`] - Per-user request counters
//! - [`queue`] - Queue table implementing [`QueueTransport`](crate::queue::QueueTransport)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, sqlite::SqlitePool};

use crate::error::Result;
use crate::store::PersistentStore;
use crate::types::{JobId, LyricsRecord, LyricsRequestJob, UserRateLimitState};

mod jobs;
mod lyrics;
mod migrations;
mod queue;
mod rate_limits;

/// Lyrics record from database
#[derive(Debug, Clone, FromRow)]
pub struct LyricsRow {
    /// Record identifier
    pub record_id: String,
    /// Artist name
    pub artist_name: String,
    /// Song name
    pub song_name: String,
    /// Lyric text
    pub lyrics_text: String,
    /// Unix timestamp when the record was created
    pub created_at: i64,
}

impl From<LyricsRow> for LyricsRecord {
    fn from(row: LyricsRow) -> Self {
        Self {
            record_id: row.record_id,
            artist_name: row.artist_name,
            song_name: row.song_name,
            lyrics_text: row.lyrics_text,
            created_at: from_unix(row.created_at),
        }
    }
}

/// Worker job record from database
#[derive(Debug, Clone, FromRow)]
pub struct JobRow {
    /// Job identifier
    pub job_id: String,
    /// Lyrics page handed to the worker
    pub source_url: String,
    /// Unix timestamp when the job was created
    pub created_at: i64,
    /// Worker claimed the message
    pub worker_acknowledged: bool,
    /// Worker asked for the archive fallback
    pub fallback_requested: bool,
    /// Worker finished and stored a result
    pub is_completed: bool,
    /// Lyrics record written by the worker
    pub result_record_id: Option<String>,
}

impl From<JobRow> for LyricsRequestJob {
    fn from(row: JobRow) -> Self {
        Self {
            job_id: JobId(row.job_id),
            source_url: row.source_url,
            created_at: from_unix(row.created_at),
            worker_acknowledged: row.worker_acknowledged,
            fallback_requested: row.fallback_requested,
            is_completed: row.is_completed,
            result_record_id: row.result_record_id,
        }
    }
}

/// Rate limit record from database
#[derive(Debug, Clone, FromRow)]
pub struct RateLimitRow {
    /// User identifier
    pub user_id: String,
    /// Successful acquisitions in the current window
    pub current_count: i64,
    /// Unix timestamp anchoring the rolling window
    pub last_request_at: i64,
}

impl From<RateLimitRow> for UserRateLimitState {
    fn from(row: RateLimitRow) -> Self {
        Self {
            user_id: row.user_id,
            current_count: u32::try_from(row.current_count).unwrap_or(u32::MAX),
            last_request_timestamp: from_unix(row.last_request_at),
        }
    }
}

fn from_unix(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or_default()
}

/// Database handle for lyrics-dl
pub struct Database {
    pool: SqlitePool,
}

#[async_trait]
impl PersistentStore for Database {
    async fn get_lyrics(&self, artist: &str, song: &str) -> Result<Option<LyricsRecord>> {
        Database::get_lyrics(self, artist, song).await
    }

    async fn get_lyrics_by_id(&self, record_id: &str) -> Result<Option<LyricsRecord>> {
        Database::get_lyrics_by_id(self, record_id).await
    }

    async fn upsert_lyrics(&self, record: &LyricsRecord) -> Result<()> {
        Database::upsert_lyrics(self, record).await
    }

    async fn get_job(&self, job_id: &JobId) -> Result<Option<LyricsRequestJob>> {
        Database::get_job(self, job_id).await
    }

    async fn upsert_job(&self, job: &LyricsRequestJob) -> Result<()> {
        Database::upsert_job(self, job).await
    }

    async fn delete_job(&self, job_id: &JobId) -> Result<()> {
        Database::delete_job(self, job_id).await
    }

    async fn get_rate_limit(&self, user_id: &str) -> Result<Option<UserRateLimitState>> {
        Database::get_rate_limit(self, user_id).await
    }

    async fn upsert_rate_limit(&self, state: &UserRateLimitState) -> Result<()> {
        Database::upsert_rate_limit(self, state).await
    }
}

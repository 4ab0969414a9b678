//! Persistent store seam
//!
//! The acquisition pipeline only talks to storage through [`PersistentStore`]. The
//! shipped implementation is [`Database`](crate::db::Database); tests substitute
//! in-memory implementations that count calls.
//!
//! Every write is a single "insert, else replace" upsert keyed on the document's
//! natural key, so concurrent writers for the same key converge on the last write.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{JobId, LyricsRecord, LyricsRequestJob, UserRateLimitState};

/// Keyed document store shared with the standalone worker
#[async_trait]
pub trait PersistentStore: Send + Sync {
    /// Look up cached lyrics by exact `(artist, song)`
    async fn get_lyrics(&self, artist: &str, song: &str) -> Result<Option<LyricsRecord>>;

    /// Look up cached lyrics by record id
    async fn get_lyrics_by_id(&self, record_id: &str) -> Result<Option<LyricsRecord>>;

    /// Insert a lyrics record, replacing any record with the same `(artist, song)`
    async fn upsert_lyrics(&self, record: &LyricsRecord) -> Result<()>;

    /// Read a worker job
    async fn get_job(&self, job_id: &JobId) -> Result<Option<LyricsRequestJob>>;

    /// Insert a worker job, replacing any job with the same id
    async fn upsert_job(&self, job: &LyricsRequestJob) -> Result<()>;

    /// Remove a worker job (no-op if it does not exist)
    async fn delete_job(&self, job_id: &JobId) -> Result<()>;

    /// Read a user's rate limit state
    async fn get_rate_limit(&self, user_id: &str) -> Result<Option<UserRateLimitState>>;

    /// Insert a user's rate limit state, replacing the previous one
    async fn upsert_rate_limit(&self, state: &UserRateLimitState) -> Result<()>;
}

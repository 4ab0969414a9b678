//! Core types for lyrics-dl

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier for a worker job
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a fresh random job id
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for JobId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cached lyrics for one `(artist, song)` pair
///
/// The key is the exact artist and song strings as requested; no case or punctuation
/// normalization is applied anywhere.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsRecord {
    /// Identifier referenced by [`LyricsRequestJob::result_record_id`]
    pub record_id: String,
    /// Artist name (key part)
    pub artist_name: String,
    /// Song name (key part)
    pub song_name: String,
    /// Full lyric text, never empty
    pub lyrics_text: String,
    /// When the record was created
    pub created_at: DateTime<Utc>,
}

impl LyricsRecord {
    /// Build a new record with a generated id
    pub fn new(artist: &str, song: &str, lyrics_text: String) -> Self {
        Self {
            record_id: uuid::Uuid::new_v4().to_string(),
            artist_name: artist.to_string(),
            song_name: song.to_string(),
            lyrics_text,
            created_at: Utc::now(),
        }
    }
}

/// Shared job state between the requester and the standalone worker
///
/// The requester creates the row with every flag false; only the worker flips flags.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsRequestJob {
    /// Job identifier
    pub job_id: JobId,
    /// Lyrics page the worker should scrape
    pub source_url: String,
    /// When the requester created the job
    pub created_at: DateTime<Utc>,
    /// Set by the worker when it claims the queue message
    pub worker_acknowledged: bool,
    /// Set by the worker when it wants the requester to use the archive fallback
    pub fallback_requested: bool,
    /// Set by the worker once the result record is written
    pub is_completed: bool,
    /// Record id of the lyrics the worker stored
    pub result_record_id: Option<String>,
}

impl LyricsRequestJob {
    /// Build a freshly created job with all flags cleared
    pub fn new(job_id: JobId, source_url: &str) -> Self {
        Self {
            job_id,
            source_url: source_url.to_string(),
            created_at: Utc::now(),
            worker_acknowledged: false,
            fallback_requested: false,
            is_completed: false,
            result_record_id: None,
        }
    }
}

/// Per-user request counter for the rolling window
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRateLimitState {
    /// User identifier from the calling surface
    pub user_id: String,
    /// Successful acquisitions in the current window
    pub current_count: u32,
    /// Anchor of the rolling window
    pub last_request_timestamp: DateTime<Utc>,
}

impl UserRateLimitState {
    /// State for a user's very first request
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            current_count: 0,
            last_request_timestamp: now,
        }
    }
}

/// A resolved web archive snapshot (not persisted)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveSnapshot {
    /// Direct URL of the archived copy
    pub snapshot_url: String,
    /// Capture time
    pub timestamp: DateTime<Utc>,
    /// Whether the archive reports the snapshot as retrievable
    pub available: bool,
}

/// The search hit chosen as the lyrics page
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchCandidate {
    /// Lyrics page URL
    pub url: String,
    /// Song title as reported by the search index
    pub title: String,
    /// Primary artist as reported by the search index
    pub artist_name: Option<String>,
}

/// Queue payload consumed by the standalone worker
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LyricsRequestMessage {
    /// Job the worker must update
    pub job_id: JobId,
    /// Requested artist
    pub artist: String,
    /// Requested song
    pub song: String,
    /// Lyrics page to scrape
    pub source_url: String,
}

/// Handle to a published queue message
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentMessage {
    /// Transport-assigned message id
    pub message_id: String,
    /// Receipt required to delete the message
    pub receipt_handle: String,
}

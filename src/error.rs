//! Error types for lyrics-dl
//!
//! This module provides the typed failure taxonomy for the acquisition pipeline:
//! - Domain-specific error types (search, worker, archive, queue, database)
//! - Classification helpers the orchestrator uses to pick the next fallback stage
//! - Machine-readable error codes for the presentation layer

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type alias for lyrics-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for lyrics-dl
///
/// This is the primary error type used throughout the library. Expected branch outcomes
/// (no search hit, worker asked for fallback, archive exhausted) are dedicated variants so
/// callers can `match` on them rather than inspect messages.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "search.access_token")
        key: Option<String>,
    },

    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// Cache lookup failed (non-fatal, the orchestrator treats it as a miss)
    #[error("cache lookup failed: {0}")]
    CacheLookup(String),

    /// Search stage failed (terminal)
    #[error("search failed: {0}")]
    SearchFailed(#[from] SearchError),

    /// Worker stage failed
    #[error("worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Archive fallback failed (terminal, last fallback exhausted)
    #[error("fallback failed: {0}")]
    FallbackFailed(#[from] ArchiveError),

    /// Queue transport error
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// User exhausted their request quota
    #[error("rate limit exceeded for user {user_id}, resets at {reset_at}")]
    RateLimitExceeded {
        /// The user that hit the limit
        user_id: String,
        /// When the rolling window expires and requests are accepted again
        reset_at: DateTime<Utc>,
    },

    /// Upstream returned a non-success HTTP status
    #[error("HTTP {status} from {url}")]
    Http {
        /// Response status code
        status: u16,
        /// Requested URL
        url: String,
    },

    /// Network error
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Database-related errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to connect to database
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),
}

/// Search stage errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SearchError {
    /// The search index returned zero hits
    #[error("no results for \"{query}\"")]
    NoResults {
        /// The combined artist + song query
        query: String,
    },

    /// Hits exist but none is a song with complete lyrics
    #[error("no song with complete lyrics among {hits} hits for \"{query}\"")]
    NoSongsFound {
        /// The combined artist + song query
        query: String,
        /// Number of hits inspected
        hits: usize,
    },
}

/// Worker job errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// No worker claimed the job within the grace period
    #[error("job {job_id} was not acknowledged by a worker")]
    NotAcknowledged {
        /// The abandoned job
        job_id: String,
    },

    /// The worker asked the requester to use the archive fallback
    #[error("worker requested fallback for job {job_id}")]
    FallbackRequested {
        /// The job the worker gave up on
        job_id: String,
    },

    /// The worker completed but the referenced record has no text
    #[error("worker completed job {job_id} without lyrics")]
    LyricsEmpty {
        /// The completed job
        job_id: String,
    },

    /// The job was acknowledged but did not finish before the overall deadline
    #[error("job {job_id} timed out after {elapsed_secs}s")]
    TimedOut {
        /// The stalled job
        job_id: String,
        /// Seconds spent waiting
        elapsed_secs: u64,
    },

    /// The job record vanished while the requester still owned it
    #[error("job {job_id} disappeared from the store")]
    JobMissing {
        /// The missing job
        job_id: String,
    },
}

impl WorkerError {
    /// Whether the orchestrator should continue with the archive fallback
    pub fn triggers_fallback(&self) -> bool {
        matches!(
            self,
            WorkerError::NotAcknowledged { .. }
                | WorkerError::FallbackRequested { .. }
                | WorkerError::LyricsEmpty { .. }
        )
    }
}

/// Archive fallback errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ArchiveError {
    /// No usable snapshot even after requesting a fresh capture
    #[error("no recent snapshot available for {url}")]
    NoSnapshotAvailable {
        /// The page that could not be resolved
        url: String,
    },

    /// The capture job did not finish within the polling budget
    #[error("archive job {job_id} did not finish within {budget_secs}s")]
    ArchiveTimeout {
        /// Capture job id
        job_id: String,
        /// Polling budget in seconds
        budget_secs: u64,
    },

    /// The archive service refused or failed the capture
    #[error("archive request rejected for {url}: {reason}")]
    ArchiveRequestRejected {
        /// The page submitted for capture
        url: String,
        /// Why the request was considered rejected
        reason: String,
    },

    /// The snapshot markup had no usable lyrics
    #[error("could not parse lyrics from {url}")]
    ParseFailure {
        /// The snapshot that failed to parse
        url: String,
    },
}

/// Queue transport errors
#[derive(Debug, Error)]
pub enum QueueError {
    /// Publishing a message failed
    #[error("failed to send message: {0}")]
    SendFailed(String),

    /// Deleting a message failed
    #[error("failed to delete message {message_id}: {reason}")]
    DeleteFailed {
        /// Message that could not be deleted
        message_id: String,
        /// Underlying failure
        reason: String,
    },
}

impl Error {
    /// Machine-readable error code for the presentation layer
    ///
    /// The calling command layer distinguishes at least rate-limited, no-search-results,
    /// lyrics-fetch-failed and unknown errors.
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::RateLimitExceeded { .. } => "rate_limited",
            Error::SearchFailed(_) => "no_search_results",
            Error::FallbackFailed(_) | Error::Worker(_) => "lyrics_fetch_failed",
            Error::Config { .. }
            | Error::Database(_)
            | Error::Sqlx(_)
            | Error::CacheLookup(_)
            | Error::Queue(_)
            | Error::Http { .. }
            | Error::Network(_)
            | Error::Serialization(_)
            | Error::Other(_) => "unknown_error",
        }
    }

    /// Whether this error should send the orchestrator down the archive fallback
    pub fn triggers_fallback(&self) -> bool {
        matches!(self, Error::Worker(e) if e.triggers_fallback())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_three_worker_outcomes_trigger_fallback() {
        let job_id = "job-1".to_string();
        let cases = [
            (
                WorkerError::NotAcknowledged {
                    job_id: job_id.clone(),
                },
                true,
            ),
            (
                WorkerError::FallbackRequested {
                    job_id: job_id.clone(),
                },
                true,
            ),
            (
                WorkerError::LyricsEmpty {
                    job_id: job_id.clone(),
                },
                true,
            ),
            (
                WorkerError::TimedOut {
                    job_id: job_id.clone(),
                    elapsed_secs: 60,
                },
                false,
            ),
            (WorkerError::JobMissing { job_id }, false),
        ];

        for (err, expected) in cases {
            assert_eq!(
                Error::from(err.clone()).triggers_fallback(),
                expected,
                "{err:?} fallback classification"
            );
        }
    }

    #[test]
    fn non_worker_errors_never_trigger_fallback() {
        let search = Error::from(SearchError::NoResults {
            query: "a b".to_string(),
        });
        let archive = Error::from(ArchiveError::NoSnapshotAvailable {
            url: "https://example/lyrics".to_string(),
        });

        assert!(!search.triggers_fallback());
        assert!(!archive.triggers_fallback());
        assert!(!Error::Other("boom".to_string()).triggers_fallback());
    }

    #[test]
    fn error_codes_distinguish_user_visible_outcomes() {
        let rate_limited = Error::RateLimitExceeded {
            user_id: "u1".to_string(),
            reset_at: Utc::now(),
        };
        let no_results = Error::from(SearchError::NoSongsFound {
            query: "a b".to_string(),
            hits: 3,
        });
        let fetch_failed = Error::from(ArchiveError::ParseFailure {
            url: "https://web.archive.org/web/1/x".to_string(),
        });
        let unknown = Error::Http {
            status: 500,
            url: "https://api.example/search".to_string(),
        };

        assert_eq!(rate_limited.error_code(), "rate_limited");
        assert_eq!(no_results.error_code(), "no_search_results");
        assert_eq!(fetch_failed.error_code(), "lyrics_fetch_failed");
        assert_eq!(unknown.error_code(), "unknown_error");
    }

    #[test]
    fn display_includes_context() {
        let err = Error::from(ArchiveError::ArchiveTimeout {
            job_id: "spn2-abc".to_string(),
            budget_secs: 300,
        });
        let msg = err.to_string();
        assert!(msg.contains("spn2-abc"), "message should name the job: {msg}");
        assert!(msg.contains("300"), "message should name the budget: {msg}");
    }
}

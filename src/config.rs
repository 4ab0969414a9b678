//! Configuration types for lyrics-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::{path::PathBuf, time::Duration};

/// Lyrics search API configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Base URL of the search API (default: "https://api.genius.com")
    #[serde(default = "default_search_base_url")]
    pub base_url: String,

    /// Bearer token sent with every search request
    #[serde(default)]
    pub access_token: Option<String>,

    /// Per-request timeout (default: 10 seconds)
    #[serde(default = "default_search_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: default_search_base_url(),
            access_token: None,
            timeout: default_search_timeout(),
        }
    }
}

/// Web archive fallback configuration
///
/// The defaults target the Wayback Machine availability and Save Page Now endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArchiveConfig {
    /// Snapshot availability endpoint
    #[serde(default = "default_availability_url")]
    pub availability_url: String,

    /// Capture submission endpoint (form POST)
    #[serde(default = "default_save_url")]
    pub save_url: String,

    /// Capture job status endpoint; the job id is appended as a path segment
    #[serde(default = "default_status_url")]
    pub status_url: String,

    /// Prefix used to synthesize snapshot URLs as `{prefix}/{timestamp}/{page}`
    #[serde(default = "default_snapshot_base_url")]
    pub snapshot_base_url: String,

    /// Archive account access key (sent as `LOW access:secret` when both keys are set)
    #[serde(default)]
    pub access_key: Option<String>,

    /// Archive account secret key
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Snapshots older than this are treated as absent (default: 30 days)
    #[serde(default = "default_max_snapshot_age", with = "duration_serde")]
    pub max_snapshot_age: Duration,

    /// Interval between capture job status polls (default: 15 seconds)
    #[serde(default = "default_archive_poll_interval", with = "duration_serde")]
    pub poll_interval: Duration,

    /// Total time allowed for a capture job (default: 5 minutes)
    #[serde(default = "default_archive_poll_budget", with = "duration_serde")]
    pub poll_budget: Duration,

    /// Per-request timeout for archive HTTP calls (default: 30 seconds)
    #[serde(default = "default_archive_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            availability_url: default_availability_url(),
            save_url: default_save_url(),
            status_url: default_status_url(),
            snapshot_base_url: default_snapshot_base_url(),
            access_key: None,
            secret_key: None,
            max_snapshot_age: default_max_snapshot_age(),
            poll_interval: default_archive_poll_interval(),
            poll_budget: default_archive_poll_budget(),
            request_timeout: default_archive_request_timeout(),
        }
    }
}

/// Standalone worker job configuration
///
/// Intervals are expressed in milliseconds since the grace period and poll interval
/// are short compared to the other timeouts.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Dispatch jobs to the standalone worker before falling back (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Time the worker has to claim a message before the job is abandoned (default: 5s)
    #[serde(default = "default_ack_grace_period", with = "duration_ms_serde")]
    pub ack_grace_period: Duration,

    /// Interval between job state polls (default: 1s)
    #[serde(default = "default_worker_poll_interval", with = "duration_ms_serde")]
    pub poll_interval: Duration,

    /// Overall deadline for one job, measured from dispatch (default: 60s)
    #[serde(default = "default_job_timeout", with = "duration_ms_serde")]
    pub job_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ack_grace_period: default_ack_grace_period(),
            poll_interval: default_worker_poll_interval(),
            job_timeout: default_job_timeout(),
        }
    }
}

/// Per-user request quota configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Successful acquisitions allowed per window (default: 10)
    #[serde(default = "default_max_requests")]
    pub max_requests: u32,

    /// Rolling window anchored on the user's last request (default: 24 hours)
    #[serde(default = "default_rate_limit_window", with = "duration_serde")]
    pub window: Duration,

    /// Users that bypass the limiter entirely
    #[serde(default)]
    pub exempt_users: Vec<String>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window: default_rate_limit_window(),
            exempt_users: Vec::new(),
        }
    }
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database shared with the standalone worker (default: "./lyrics.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 1 second)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 30 seconds)
    #[serde(default = "default_max_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for LyricsFetcher
///
/// Fields are organized into sub-configs, one per pipeline stage:
/// - [`search`](SearchConfig) - lyrics search API
/// - [`archive`](ArchiveConfig) - web archive fallback
/// - [`worker`](WorkerConfig) - standalone worker dispatch
/// - [`rate_limit`](RateLimitConfig) - per-user quota
/// - [`persistence`](PersistenceConfig) - shared SQLite store
/// - [`retry`](RetryConfig) - transient HTTP failure handling
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Lyrics search API
    #[serde(default)]
    pub search: SearchConfig,

    /// Web archive fallback
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Standalone worker dispatch
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Per-user request quota
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Shared SQLite store
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// Transient HTTP failure handling
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Check cross-field constraints that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("search.base_url", &self.search.base_url),
            ("archive.availability_url", &self.archive.availability_url),
            ("archive.save_url", &self.archive.save_url),
            ("archive.status_url", &self.archive.status_url),
            ("archive.snapshot_base_url", &self.archive.snapshot_base_url),
        ] {
            if let Err(e) = url::Url::parse(value) {
                return Err(config_error(key, format!("invalid URL '{}': {}", value, e)));
            }
        }

        if self.archive.access_key.is_some() != self.archive.secret_key.is_some() {
            return Err(config_error(
                "archive.access_key",
                "access_key and secret_key must be set together".to_string(),
            ));
        }

        if self.archive.poll_interval.is_zero() {
            return Err(config_error(
                "archive.poll_interval",
                "must be greater than zero".to_string(),
            ));
        }

        if self.worker.poll_interval.is_zero() {
            return Err(config_error(
                "worker.poll_interval",
                "must be greater than zero".to_string(),
            ));
        }

        if self.worker.job_timeout <= self.worker.ack_grace_period {
            return Err(config_error(
                "worker.job_timeout",
                format!(
                    "must exceed ack_grace_period ({:?})",
                    self.worker.ack_grace_period
                ),
            ));
        }

        if self.rate_limit.max_requests == 0 {
            return Err(config_error(
                "rate_limit.max_requests",
                "must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

fn config_error(key: &str, message: String) -> Error {
    Error::Config {
        message: format!("{}: {}", key, message),
        key: Some(key.to_string()),
    }
}

fn default_search_base_url() -> String {
    "https://api.genius.com".to_string()
}

fn default_search_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_availability_url() -> String {
    "https://archive.org/wayback/available".to_string()
}

fn default_save_url() -> String {
    "https://web.archive.org/save".to_string()
}

fn default_status_url() -> String {
    "https://web.archive.org/save/status".to_string()
}

fn default_snapshot_base_url() -> String {
    "https://web.archive.org/web".to_string()
}

fn default_max_snapshot_age() -> Duration {
    Duration::from_secs(30 * 24 * 60 * 60)
}

fn default_archive_poll_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_archive_poll_budget() -> Duration {
    Duration::from_secs(300) // 5 minutes
}

fn default_archive_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_ack_grace_period() -> Duration {
    Duration::from_secs(5)
}

fn default_worker_poll_interval() -> Duration {
    Duration::from_secs(1)
}

fn default_job_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_max_requests() -> u32 {
    10
}

fn default_rate_limit_window() -> Duration {
    Duration::from_secs(24 * 60 * 60)
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./lyrics.db")
}

fn default_true() -> bool {
    true
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(1)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(30)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

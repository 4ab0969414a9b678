//! Retry logic with exponential backoff
//!
//! The search and archive clients wrap their HTTP calls with [`with_retry`] so a
//! flaky upstream does not immediately surface as a terminal pipeline failure.
//! Only transient failures are retried; typed pipeline outcomes never are.
//!
//! # Example
//!
//! ```no_run
//! use lyrics_dl::retry::with_retry;
//! use lyrics_dl::config::RetryConfig;
//! use lyrics_dl::error::Error;
//!
//! # async fn example() -> Result<(), Error> {
//! let config = RetryConfig::default();
//! let body = with_retry(&config, "search", || async {
//!     Ok::<String, Error>("payload".to_string())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (network timeouts, connection resets, upstream 5xx/429) should
/// return `true`. Everything the pipeline interprets as an outcome returns `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            // Server-side trouble and throttling are worth another attempt
            Error::Http { status, .. } => *status >= 500 || *status == 429,
            Error::Config { .. }
            | Error::Database(_)
            | Error::Sqlx(_)
            | Error::CacheLookup(_)
            | Error::SearchFailed(_)
            | Error::Worker(_)
            | Error::FallbackFailed(_)
            | Error::Queue(_)
            | Error::RateLimitExceeded { .. }
            | Error::Serialization(_)
            | Error::Other(_) => false,
        }
    }
}

/// Run `operation`, retrying transient failures with exponential backoff
///
/// `stage` names the upstream call in log events (`"search"`, `"archive lookup"`, ...).
/// Non-retryable errors return immediately. Returns the last error once `max_attempts`
/// retries are used up.
pub async fn with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    stage: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut delay = config.initial_delay;
    let mut retries = 0;

    loop {
        let err = match operation().await {
            Ok(value) => {
                if retries > 0 {
                    tracing::info!(stage = %stage, retries, "Upstream call recovered after retry");
                }
                return Ok(value);
            }
            Err(e) => e,
        };

        if !err.is_retryable() {
            return Err(err);
        }
        if retries >= config.max_attempts {
            tracing::error!(
                stage = %stage,
                error = %err,
                attempts = retries + 1,
                "Upstream call failed, retries exhausted"
            );
            return Err(err);
        }

        retries += 1;
        let wait = if config.jitter { add_jitter(delay) } else { delay };
        tracing::warn!(
            stage = %stage,
            error = %err,
            retry = retries,
            max_attempts = config.max_attempts,
            wait_ms = wait.as_millis(),
            "Transient upstream failure, backing off"
        );

        tokio::time::sleep(wait).await;
        delay = next_delay(delay, config);
    }
}

/// Grow `current` by the backoff multiplier, capped at `max_delay`
fn next_delay(current: Duration, config: &RetryConfig) -> Duration {
    Duration::try_from_secs_f64(current.as_secs_f64() * config.backoff_multiplier)
        .map_or(config.max_delay, |next| next.min(config.max_delay))
}

/// Add random jitter to a delay to prevent thundering herd
///
/// The actual delay lands between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

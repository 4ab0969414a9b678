//! Per-user request quota over a rolling window
//!
//! Each user has a counter that is incremented after every successful acquisition. The
//! window is anchored on the user's last recorded request rather than on wall-clock
//! midnight: once `now - last_request >= window` the counter starts over.
//!
//! Evaluation and increment are separate on purpose. The calling command layer evaluates
//! before running the pipeline and records the request only once lyrics were obtained, so
//! failed acquisitions never consume quota.

use chrono::{DateTime, TimeDelta, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::config::RateLimitConfig;
use crate::error::{Error, Result};
use crate::store::PersistentStore;
use crate::types::UserRateLimitState;

/// Apply the window reset and report whether another request is allowed
///
/// A user exactly at `max_requests` is rejected.
pub fn evaluate(
    state: &mut UserRateLimitState,
    max_requests: u32,
    window: Duration,
    now: DateTime<Utc>,
) -> bool {
    if now - state.last_request_timestamp >= window_delta(window) {
        state.current_count = 0;
    }
    state.current_count < max_requests
}

/// Record one successful acquisition and move the window anchor to `now`
pub fn increment(state: &mut UserRateLimitState, now: DateTime<Utc>) {
    state.current_count = state.current_count.saturating_add(1);
    state.last_request_timestamp = now;
}

fn window_delta(window: Duration) -> TimeDelta {
    TimeDelta::from_std(window).unwrap_or(TimeDelta::MAX)
}

/// Store-backed rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn PersistentStore>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a rate limiter over the shared store
    pub fn new(store: Arc<dyn PersistentStore>, config: RateLimitConfig) -> Self {
        Self { store, config }
    }

    /// Users on the allow-list bypass the limiter entirely
    pub fn is_exempt(&self, user_id: &str) -> bool {
        self.config.exempt_users.iter().any(|u| u == user_id)
    }

    /// [`evaluate`] with the configured quota and window
    pub fn evaluate(&self, state: &mut UserRateLimitState, now: DateTime<Utc>) -> bool {
        evaluate(state, self.config.max_requests, self.config.window, now)
    }

    /// [`increment`] a user's counter
    pub fn increment(&self, state: &mut UserRateLimitState, now: DateTime<Utc>) {
        increment(state, now);
    }

    /// When the user's current window expires
    pub fn reset_at(&self, state: &UserRateLimitState) -> DateTime<Utc> {
        state
            .last_request_timestamp
            .checked_add_signed(window_delta(self.config.window))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// Gate a request, failing with [`Error::RateLimitExceeded`] when the quota is used up
    ///
    /// Creates the user's state on their first request and persists window resets.
    pub async fn check(&self, user_id: &str) -> Result<()> {
        let now = Utc::now();
        let (mut state, is_new) = self.load_state(user_id, now).await?;
        let count_before = state.current_count;

        let allowed = self.evaluate(&mut state, now);

        if is_new || state.current_count != count_before {
            self.store.upsert_rate_limit(&state).await?;
        }

        if !allowed {
            let reset_at = self.reset_at(&state);
            tracing::info!(
                user_id = %user_id,
                count = state.current_count,
                max_requests = self.config.max_requests,
                reset_at = %reset_at,
                "Rate limit exceeded"
            );
            return Err(Error::RateLimitExceeded {
                user_id: user_id.to_string(),
                reset_at,
            });
        }

        Ok(())
    }

    /// Count a successful acquisition against the user's quota
    pub async fn record_success(&self, user_id: &str) -> Result<()> {
        let now = Utc::now();
        let (mut state, _) = self.load_state(user_id, now).await?;

        // Apply any pending reset so a stale count is not carried into a new window
        self.evaluate(&mut state, now);
        self.increment(&mut state, now);

        self.store.upsert_rate_limit(&state).await?;

        tracing::debug!(
            user_id = %user_id,
            count = state.current_count,
            "Recorded successful request"
        );

        Ok(())
    }

    async fn load_state(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Result<(UserRateLimitState, bool)> {
        Ok(match self.store.get_rate_limit(user_id).await? {
            Some(state) => (state, false),
            None => (UserRateLimitState::new(user_id, now), true),
        })
    }
}

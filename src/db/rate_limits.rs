//! Per-user rate limit counters.

use crate::error::DatabaseError;
use crate::types::UserRateLimitState;
use crate::{Error, Result};

use super::{Database, RateLimitRow};

impl Database {
    /// Get a user's rate limit state
    pub async fn get_rate_limit(&self, user_id: &str) -> Result<Option<UserRateLimitState>> {
        let row = sqlx::query_as::<_, RateLimitRow>(
            r#"
            SELECT user_id, current_count, last_request_at
            FROM user_rate_limits
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get rate limit state: {}",
                e
            )))
        })?;

        Ok(row.map(UserRateLimitState::from))
    }

    /// Insert or replace a user's rate limit state
    pub async fn upsert_rate_limit(&self, state: &UserRateLimitState) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_rate_limits (user_id, current_count, last_request_at)
            VALUES (?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                current_count = excluded.current_count,
                last_request_at = excluded.last_request_at
            "#,
        )
        .bind(&state.user_id)
        .bind(i64::from(state.current_count))
        .bind(state.last_request_timestamp.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert rate limit state: {}",
                e
            )))
        })?;

        Ok(())
    }
}

//! Worker job state shared with the standalone worker.

use crate::error::DatabaseError;
use crate::types::{JobId, LyricsRequestJob};
use crate::{Error, Result};

use super::{Database, JobRow};

impl Database {
    /// Get a worker job by id
    pub async fn get_job(&self, job_id: &JobId) -> Result<Option<LyricsRequestJob>> {
        let row = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT
                job_id, source_url, created_at, worker_acknowledged,
                fallback_requested, is_completed, result_record_id
            FROM lyrics_request_jobs
            WHERE job_id = ?
            "#,
        )
        .bind(job_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get job: {}",
                e
            )))
        })?;

        Ok(row.map(LyricsRequestJob::from))
    }

    /// Insert a worker job, replacing every column if the id exists
    pub async fn upsert_job(&self, job: &LyricsRequestJob) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO lyrics_request_jobs (
                job_id, source_url, created_at, worker_acknowledged,
                fallback_requested, is_completed, result_record_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(job_id) DO UPDATE SET
                source_url = excluded.source_url,
                created_at = excluded.created_at,
                worker_acknowledged = excluded.worker_acknowledged,
                fallback_requested = excluded.fallback_requested,
                is_completed = excluded.is_completed,
                result_record_id = excluded.result_record_id
            "#,
        )
        .bind(job.job_id.as_str())
        .bind(&job.source_url)
        .bind(job.created_at.timestamp())
        .bind(job.worker_acknowledged)
        .bind(job.fallback_requested)
        .bind(job.is_completed)
        .bind(&job.result_record_id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert job: {}",
                e
            )))
        })?;

        Ok(())
    }

    /// Delete a worker job
    pub async fn delete_job(&self, job_id: &JobId) -> Result<()> {
        sqlx::query("DELETE FROM lyrics_request_jobs WHERE job_id = ?")
            .bind(job_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to delete job: {}",
                    e
                )))
            })?;

        Ok(())
    }

    /// Count jobs still present (abandoned jobs indicate a crashed requester)
    pub async fn count_jobs(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM lyrics_request_jobs")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count jobs: {}",
                    e
                )))
            })?;

        Ok(count)
    }
}

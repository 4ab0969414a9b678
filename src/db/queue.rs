//! SQLite-backed queue table consumed by the standalone worker.
//!
//! The worker process opens the same database file, claims rows from `queue_messages`
//! and deletes them once handled.

use async_trait::async_trait;

use crate::error::{DatabaseError, QueueError};
use crate::queue::QueueTransport;
use crate::types::SentMessage;
use crate::{Error, Result};

use super::Database;

impl Database {
    /// Number of messages waiting in the queue table
    pub async fn queued_message_count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM queue_messages")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                Error::Database(DatabaseError::QueryFailed(format!(
                    "Failed to count queue messages: {}",
                    e
                )))
            })?;

        Ok(count)
    }
}

#[async_trait]
impl QueueTransport for Database {
    async fn send(&self, body: &str) -> Result<SentMessage> {
        let sent = SentMessage {
            message_id: uuid::Uuid::new_v4().to_string(),
            receipt_handle: uuid::Uuid::new_v4().to_string(),
        };

        sqlx::query(
            r#"
            INSERT INTO queue_messages (message_id, receipt_handle, body, sent_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(&sent.message_id)
        .bind(&sent.receipt_handle)
        .bind(body)
        .bind(chrono::Utc::now().timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::Queue(QueueError::SendFailed(e.to_string())))?;

        Ok(sent)
    }

    async fn delete(&self, message_id: &str, receipt_handle: &str) -> Result<()> {
        let result =
            sqlx::query("DELETE FROM queue_messages WHERE message_id = ? AND receipt_handle = ?")
                .bind(message_id)
                .bind(receipt_handle)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    Error::Queue(QueueError::DeleteFailed {
                        message_id: message_id.to_string(),
                        reason: e.to_string(),
                    })
                })?;

        if result.rows_affected() == 0 {
            return Err(Error::Queue(QueueError::DeleteFailed {
                message_id: message_id.to_string(),
                reason: "message not found or receipt handle stale".to_string(),
            }));
        }

        Ok(())
    }
}

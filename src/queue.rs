//! Queue transport seam used to hand jobs to the standalone worker

use async_trait::async_trait;

use crate::error::Result;
use crate::types::SentMessage;

/// Message queue consumed by the standalone worker
///
/// The requester only publishes and, when a message goes unclaimed, deletes it again.
/// Receiving is the worker's side of the protocol.
#[async_trait]
pub trait QueueTransport: Send + Sync {
    /// Publish an encoded message body
    async fn send(&self, body: &str) -> Result<SentMessage>;

    /// Delete a previously published message
    async fn delete(&self, message_id: &str, receipt_handle: &str) -> Result<()>;
}

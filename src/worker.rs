//! Standalone worker job coordination
//!
//! The worker is a separate process that scrapes lyrics out-of-band. It is reachable only
//! through shared persisted state: the requester writes a job row, publishes a queue
//! message, and then watches the row until the worker flips one of its flags.
//!
//! ```text
//! Created ──▶ Dispatched ──▶ Acknowledged ──▶ Completed
//!                  │               ├─────────▶ FallbackNeeded
//!                  │               └─────────▶ TimedOut
//!                  └────────▶ NotAcknowledged
//! ```
//!
//! The job row is owned by exactly one coordinator call and is deleted on every exit
//! path, including cancellation of the calling future.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

use crate::config::WorkerConfig;
use crate::error::{Error, Result, WorkerError};
use crate::queue::QueueTransport;
use crate::store::PersistentStore;
use crate::types::{JobId, LyricsRequestJob, LyricsRequestMessage, SentMessage};

/// Primary lyrics source: a job handed to the standalone worker
#[async_trait]
pub trait WorkerDispatch: Send + Sync {
    /// Ask the worker for the lyrics on `source_url`
    async fn request_lyrics(&self, artist: &str, song: &str, source_url: &str) -> Result<String>;
}

/// What the requester reads from a polled job row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum JobObservation {
    /// No worker claimed the message
    Unclaimed,
    /// Claimed, still running
    InProgress,
    /// The worker wants the archive fallback
    FallbackRequested,
    /// The worker stored a result
    Completed,
}

/// Classify a job row after the grace period
pub(crate) fn observe(job: &LyricsRequestJob) -> JobObservation {
    if !job.worker_acknowledged {
        JobObservation::Unclaimed
    } else if job.fallback_requested {
        JobObservation::FallbackRequested
    } else if job.is_completed {
        JobObservation::Completed
    } else {
        JobObservation::InProgress
    }
}

/// Deletes the job row when dropped unless [`finish`](Self::finish) already did
struct JobCleanup {
    store: Arc<dyn PersistentStore>,
    job_id: Option<JobId>,
}

impl JobCleanup {
    fn new(store: Arc<dyn PersistentStore>, job_id: JobId) -> Self {
        Self {
            store,
            job_id: Some(job_id),
        }
    }

    async fn finish(mut self) {
        if let Some(job_id) = self.job_id.take() {
            delete_job_logged(self.store.as_ref(), &job_id).await;
        }
    }
}

impl Drop for JobCleanup {
    fn drop(&mut self) {
        // Only reached when the attempt future was cancelled mid-flight
        if let Some(job_id) = self.job_id.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    let store = self.store.clone();
                    handle.spawn(async move {
                        delete_job_logged(store.as_ref(), &job_id).await;
                    });
                }
                Err(_) => {
                    tracing::warn!(job_id = %job_id, "No runtime to clean up cancelled job");
                }
            }
        }
    }
}

async fn delete_job_logged(store: &dyn PersistentStore, job_id: &JobId) {
    match store.delete_job(job_id).await {
        Ok(()) => tracing::debug!(job_id = %job_id, "Job record deleted"),
        Err(e) => tracing::warn!(job_id = %job_id, error = %e, "Failed to delete job record"),
    }
}

/// Requester side of the worker job protocol
pub struct WorkerJobCoordinator {
    store: Arc<dyn PersistentStore>,
    queue: Arc<dyn QueueTransport>,
    config: WorkerConfig,
}

impl WorkerJobCoordinator {
    /// Create a coordinator over the shared store and queue
    pub fn new(
        store: Arc<dyn PersistentStore>,
        queue: Arc<dyn QueueTransport>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    async fn dispatch_and_wait(&self, message: &LyricsRequestMessage) -> Result<String> {
        let job_id = &message.job_id;
        let body = serde_json::to_string(message)?;

        let sent = self.queue.send(&body).await?;
        let dispatched_at = Instant::now();
        tracing::info!(
            job_id = %job_id,
            message_id = %sent.message_id,
            "Lyrics job dispatched to worker"
        );

        // Give the worker a chance to claim the message before the first poll
        tokio::time::sleep(self.config.ack_grace_period).await;

        loop {
            let job = self.store.get_job(job_id).await?.ok_or_else(|| {
                Error::Worker(WorkerError::JobMissing {
                    job_id: job_id.to_string(),
                })
            })?;

            let observation = observe(&job);
            tracing::debug!(job_id = %job_id, state = ?observation, "Polled worker job");

            match observation {
                JobObservation::Unclaimed => {
                    self.withdraw(&sent).await;
                    tracing::info!(job_id = %job_id, "Worker did not acknowledge job");
                    return Err(Error::Worker(WorkerError::NotAcknowledged {
                        job_id: job_id.to_string(),
                    }));
                }
                JobObservation::FallbackRequested => {
                    tracing::info!(job_id = %job_id, "Worker requested fallback");
                    return Err(Error::Worker(WorkerError::FallbackRequested {
                        job_id: job_id.to_string(),
                    }));
                }
                JobObservation::Completed => return self.read_result(&job).await,
                JobObservation::InProgress => {}
            }

            let elapsed = dispatched_at.elapsed();
            if elapsed >= self.config.job_timeout {
                tracing::warn!(
                    job_id = %job_id,
                    elapsed_ms = elapsed.as_millis(),
                    "Worker job exceeded deadline"
                );
                return Err(Error::Worker(WorkerError::TimedOut {
                    job_id: job_id.to_string(),
                    elapsed_secs: elapsed.as_secs(),
                }));
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// Delete an unclaimed message so a late worker does not pick up an abandoned job
    async fn withdraw(&self, sent: &SentMessage) {
        if let Err(e) = self
            .queue
            .delete(&sent.message_id, &sent.receipt_handle)
            .await
        {
            tracing::warn!(
                message_id = %sent.message_id,
                error = %e,
                "Failed to delete unclaimed queue message"
            );
        }
    }

    async fn read_result(&self, job: &LyricsRequestJob) -> Result<String> {
        let empty = || {
            Error::Worker(WorkerError::LyricsEmpty {
                job_id: job.job_id.to_string(),
            })
        };

        let Some(record_id) = job.result_record_id.as_deref() else {
            return Err(empty());
        };

        match self.store.get_lyrics_by_id(record_id).await? {
            Some(record) if !record.lyrics_text.trim().is_empty() => {
                tracing::info!(job_id = %job.job_id, record_id = %record_id, "Worker delivered lyrics");
                Ok(record.lyrics_text)
            }
            _ => Err(empty()),
        }
    }
}

#[async_trait]
impl WorkerDispatch for WorkerJobCoordinator {
    async fn request_lyrics(&self, artist: &str, song: &str, source_url: &str) -> Result<String> {
        let job = LyricsRequestJob::new(JobId::generate(), source_url);

        // Armed before the insert so a cancellation while it is in flight still cleans up
        let cleanup = JobCleanup::new(self.store.clone(), job.job_id.clone());
        if let Err(e) = self.store.upsert_job(&job).await {
            cleanup.finish().await;
            return Err(e);
        }

        let message = LyricsRequestMessage {
            job_id: job.job_id,
            artist: artist.to_string(),
            song: song.to_string(),
            source_url: source_url.to_string(),
        };

        let result = self.dispatch_and_wait(&message).await;
        cleanup.finish().await;
        result
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MemoryQueue, MemoryStore};
    use crate::types::LyricsRecord;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    const URL: &str = "https://example/lyrics";

    fn fast_config() -> WorkerConfig {
        WorkerConfig {
            enabled: true,
            ack_grace_period: Duration::from_millis(20),
            poll_interval: Duration::from_millis(5),
            job_timeout: Duration::from_millis(150),
        }
    }

    fn coordinator(store: &Arc<MemoryStore>, queue: &Arc<MemoryQueue>) -> WorkerJobCoordinator {
        WorkerJobCoordinator::new(store.clone(), queue.clone(), fast_config())
    }

    #[test]
    fn observe_follows_flag_precedence() {
        let mut job = LyricsRequestJob::new(JobId::from("j"), URL);
        assert_eq!(observe(&job), JobObservation::Unclaimed);

        job.worker_acknowledged = true;
        assert_eq!(observe(&job), JobObservation::InProgress);

        job.is_completed = true;
        assert_eq!(observe(&job), JobObservation::Completed);

        job.fallback_requested = true;
        assert_eq!(observe(&job), JobObservation::FallbackRequested);
    }

    #[tokio::test]
    async fn unacknowledged_job_deletes_message_exactly_once() {
        let store = MemoryStore::new();
        let queue = MemoryQueue::new();

        let result = coordinator(&store, &queue)
            .request_lyrics("Artist A", "Song B", URL)
            .await;

        assert!(
            matches!(
                result,
                Err(Error::Worker(WorkerError::NotAcknowledged { .. }))
            ),
            "got {result:?}"
        );
        assert_eq!(queue.sent_count(), 1);
        assert_eq!(queue.deleted_count(), 1, "exactly one compensating delete");
        let sent = queue.sent.lock().unwrap()[0].0.clone();
        assert_eq!(
            queue.deleted.lock().unwrap()[0],
            (sent.message_id, sent.receipt_handle)
        );
        assert_eq!(store.job_count(), 0, "job must be cleaned up");
        assert_eq!(MemoryStore::count(&store.job_deletes), 1);
    }

    #[tokio::test]
    async fn completed_job_returns_worker_lyrics() {
        let store = MemoryStore::new();
        let worker_store = store.clone();
        let queue = MemoryQueue::with_hook(move |message| {
            let record = LyricsRecord::new(&message.artist, &message.song, "la la la".to_string());
            let record_id = record.record_id.clone();
            worker_store.put_lyrics(record);
            worker_store.update_job(&message.job_id, |job| {
                job.worker_acknowledged = true;
                job.is_completed = true;
                job.result_record_id = Some(record_id);
            });
        });

        let lyrics = coordinator(&store, &queue)
            .request_lyrics("Artist A", "Song B", URL)
            .await
            .unwrap();

        assert_eq!(lyrics, "la la la");
        assert_eq!(queue.deleted_count(), 0, "claimed messages are not withdrawn");
        assert_eq!(store.job_count(), 0);
    }

    #[tokio::test]
    async fn dispatched_message_carries_request_fields() {
        let store = MemoryStore::new();
        let queue = MemoryQueue::new();

        let _ = coordinator(&store, &queue)
            .request_lyrics("Artist A", "Song B", URL)
            .await;

        let body = queue.sent.lock().unwrap()[0].1.clone();
        let message: LyricsRequestMessage = serde_json::from_str(&body).unwrap();
        assert_eq!(message.artist, "Artist A");
        assert_eq!(message.song, "Song B");
        assert_eq!(message.source_url, URL);
        assert!(!message.job_id.as_str().is_empty());
    }

    #[tokio::test]
    async fn fallback_request_is_reported_and_job_removed() {
        let store = MemoryStore::new();
        let worker_store = store.clone();
        let queue = MemoryQueue::with_hook(move |message| {
            worker_store.update_job(&message.job_id, |job| {
                job.worker_acknowledged = true;
                job.fallback_requested = true;
            });
        });

        let result = coordinator(&store, &queue)
            .request_lyrics("Artist A", "Song B", URL)
            .await;

        assert!(matches!(
            result,
            Err(Error::Worker(WorkerError::FallbackRequested { .. }))
        ));
        assert_eq!(queue.deleted_count(), 0);
        assert_eq!(store.job_count(), 0);
    }

    #[tokio::test]
    async fn completed_job_with_blank_record_is_lyrics_empty() {
        let store = MemoryStore::new();
        let worker_store = store.clone();
        let queue = MemoryQueue::with_hook(move |message| {
            let record = LyricsRecord::new(&message.artist, &message.song, "  \n".to_string());
            let record_id = record.record_id.clone();
            worker_store.put_lyrics(record);
            worker_store.update_job(&message.job_id, |job| {
                job.worker_acknowledged = true;
                job.is_completed = true;
                job.result_record_id = Some(record_id);
            });
        });

        let result = coordinator(&store, &queue)
            .request_lyrics("Artist A", "Song B", URL)
            .await;

        assert!(matches!(
            result,
            Err(Error::Worker(WorkerError::LyricsEmpty { .. }))
        ));
    }

    #[tokio::test]
    async fn completed_job_without_record_is_lyrics_empty() {
        let store = MemoryStore::new();
        let worker_store = store.clone();
        let queue = MemoryQueue::with_hook(move |message| {
            worker_store.update_job(&message.job_id, |job| {
                job.worker_acknowledged = true;
                job.is_completed = true;
                job.result_record_id = Some("missing-record".to_string());
            });
        });

        let result = coordinator(&store, &queue)
            .request_lyrics("Artist A", "Song B", URL)
            .await;

        assert!(matches!(
            result,
            Err(Error::Worker(WorkerError::LyricsEmpty { .. }))
        ));
    }

    #[tokio::test]
    async fn stalled_worker_hits_overall_deadline() {
        let store = MemoryStore::new();
        let worker_store = store.clone();
        let queue = MemoryQueue::with_hook(move |message| {
            worker_store.update_job(&message.job_id, |job| job.worker_acknowledged = true);
        });

        let started = Instant::now();
        let result = coordinator(&store, &queue)
            .request_lyrics("Artist A", "Song B", URL)
            .await;

        assert!(
            matches!(result, Err(Error::Worker(WorkerError::TimedOut { .. }))),
            "got {result:?}"
        );
        assert!(started.elapsed() >= Duration::from_millis(150));
        assert_eq!(store.job_count(), 0);
        assert_eq!(queue.deleted_count(), 0);
    }

    #[tokio::test]
    async fn vanished_job_is_job_missing() {
        let store = MemoryStore::new();
        let worker_store = store.clone();
        let queue = MemoryQueue::with_hook(move |message| {
            worker_store.update_job(&message.job_id, |job| job.worker_acknowledged = true);
            let store = worker_store.clone();
            let job_id = message.job_id.clone();
            tokio::spawn(async move {
                let _ = store.delete_job(&job_id).await;
            });
        });

        let result = coordinator(&store, &queue)
            .request_lyrics("Artist A", "Song B", URL)
            .await;

        assert!(matches!(
            result,
            Err(Error::Worker(WorkerError::JobMissing { .. }))
        ));
    }

    #[tokio::test]
    async fn cancellation_during_job_insert_removes_job() {
        let store = MemoryStore::new();
        store.job_upsert_delay_ms.store(50, Ordering::SeqCst);
        let queue = MemoryQueue::new();
        let coordinator = coordinator(&store, &queue);

        let cancelled = tokio::time::timeout(
            Duration::from_millis(10),
            coordinator.request_lyrics("Artist A", "Song B", URL),
        )
        .await;
        assert!(cancelled.is_err(), "attempt should still be inside the job insert");
        assert_eq!(queue.sent_count(), 0, "nothing dispatched before the insert returns");

        for _ in 0..20 {
            if store.job_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(store.job_count(), 0, "committed job row must not be orphaned");
        assert_eq!(MemoryStore::count(&store.job_deletes), 1);
    }

    #[tokio::test]
    async fn cancelled_attempt_still_removes_job() {
        let store = MemoryStore::new();
        let queue = MemoryQueue::new();
        let coordinator = coordinator(&store, &queue);

        let cancelled = tokio::time::timeout(
            Duration::from_millis(5),
            coordinator.request_lyrics("Artist A", "Song B", URL),
        )
        .await;
        assert!(cancelled.is_err(), "attempt should still be in its grace period");

        // The drop guard spawns the delete; let it run
        for _ in 0..20 {
            if store.job_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(store.job_count(), 0, "cancelled job must not be left behind");
    }
}

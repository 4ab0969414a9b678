//! Shared in-memory collaborators for unit tests.
//!
//! Each fake counts the calls made against it so tests can assert exactly which
//! pipeline stages ran.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use std::sync::{Arc, Mutex};

use crate::error::{Error, QueueError, Result};
use crate::queue::QueueTransport;
use crate::store::PersistentStore;
use crate::types::{
    JobId, LyricsRecord, LyricsRequestJob, LyricsRequestMessage, SentMessage, UserRateLimitState,
};

/// In-memory [`PersistentStore`]
#[derive(Default)]
pub(crate) struct MemoryStore {
    lyrics: Mutex<HashMap<(String, String), LyricsRecord>>,
    jobs: Mutex<HashMap<String, LyricsRequestJob>>,
    rate_limits: Mutex<HashMap<String, UserRateLimitState>>,
    pub(crate) lyrics_reads: AtomicUsize,
    pub(crate) lyrics_upserts: AtomicUsize,
    pub(crate) job_upserts: AtomicUsize,
    pub(crate) job_deletes: AtomicUsize,
    pub(crate) fail_lyrics_reads: AtomicBool,
    /// Delay applied after a job row is written, before `upsert_job` returns
    pub(crate) job_upsert_delay_ms: AtomicU64,
}

impl MemoryStore {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn put_lyrics(&self, record: LyricsRecord) {
        self.lyrics.lock().unwrap().insert(
            (record.artist_name.clone(), record.song_name.clone()),
            record,
        );
    }

    pub(crate) fn lyrics(&self, artist: &str, song: &str) -> Option<LyricsRecord> {
        self.lyrics
            .lock()
            .unwrap()
            .get(&(artist.to_string(), song.to_string()))
            .cloned()
    }

    pub(crate) fn job(&self, job_id: &JobId) -> Option<LyricsRequestJob> {
        self.jobs.lock().unwrap().get(job_id.as_str()).cloned()
    }

    /// Apply a worker-side mutation to a job, if it still exists
    pub(crate) fn update_job(&self, job_id: &JobId, f: impl FnOnce(&mut LyricsRequestJob)) {
        if let Some(job) = self.jobs.lock().unwrap().get_mut(job_id.as_str()) {
            f(job);
        }
    }

    pub(crate) fn job_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub(crate) fn rate_limit(&self, user_id: &str) -> Option<UserRateLimitState> {
        self.rate_limits.lock().unwrap().get(user_id).cloned()
    }

    pub(crate) fn put_rate_limit(&self, state: UserRateLimitState) {
        self.rate_limits
            .lock()
            .unwrap()
            .insert(state.user_id.clone(), state);
    }

    pub(crate) fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get_lyrics(&self, artist: &str, song: &str) -> Result<Option<LyricsRecord>> {
        self.lyrics_reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_lyrics_reads.load(Ordering::SeqCst) {
            return Err(Error::Other("store unavailable".to_string()));
        }
        Ok(self.lyrics(artist, song))
    }

    async fn get_lyrics_by_id(&self, record_id: &str) -> Result<Option<LyricsRecord>> {
        Ok(self
            .lyrics
            .lock()
            .unwrap()
            .values()
            .find(|r| r.record_id == record_id)
            .cloned())
    }

    async fn upsert_lyrics(&self, record: &LyricsRecord) -> Result<()> {
        self.lyrics_upserts.fetch_add(1, Ordering::SeqCst);
        self.put_lyrics(record.clone());
        Ok(())
    }

    async fn get_job(&self, job_id: &JobId) -> Result<Option<LyricsRequestJob>> {
        Ok(self.job(job_id))
    }

    async fn upsert_job(&self, job: &LyricsRequestJob) -> Result<()> {
        self.job_upserts.fetch_add(1, Ordering::SeqCst);
        self.jobs
            .lock()
            .unwrap()
            .insert(job.job_id.as_str().to_string(), job.clone());

        let delay_ms = self.job_upsert_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        Ok(())
    }

    async fn delete_job(&self, job_id: &JobId) -> Result<()> {
        self.job_deletes.fetch_add(1, Ordering::SeqCst);
        self.jobs.lock().unwrap().remove(job_id.as_str());
        Ok(())
    }

    async fn get_rate_limit(&self, user_id: &str) -> Result<Option<UserRateLimitState>> {
        Ok(self.rate_limit(user_id))
    }

    async fn upsert_rate_limit(&self, state: &UserRateLimitState) -> Result<()> {
        self.put_rate_limit(state.clone());
        Ok(())
    }
}

type SendHook = Box<dyn Fn(LyricsRequestMessage) + Send + Sync>;

/// In-memory [`QueueTransport`] that can simulate a worker reacting to each message
#[derive(Default)]
pub(crate) struct MemoryQueue {
    pub(crate) sent: Mutex<Vec<(SentMessage, String)>>,
    pub(crate) deleted: Mutex<Vec<(String, String)>>,
    on_send: Option<SendHook>,
}

impl MemoryQueue {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue whose `send` invokes `hook` with the decoded message
    pub(crate) fn with_hook(hook: impl Fn(LyricsRequestMessage) + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            on_send: Some(Box::new(hook)),
            ..Self::default()
        })
    }

    pub(crate) fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub(crate) fn deleted_count(&self) -> usize {
        self.deleted.lock().unwrap().len()
    }
}

#[async_trait]
impl QueueTransport for MemoryQueue {
    async fn send(&self, body: &str) -> Result<SentMessage> {
        let sent = {
            let mut sent = self.sent.lock().unwrap();
            let message = SentMessage {
                message_id: format!("msg-{}", sent.len() + 1),
                receipt_handle: format!("receipt-{}", sent.len() + 1),
            };
            sent.push((message.clone(), body.to_string()));
            message
        };

        if let Some(hook) = &self.on_send {
            let message: LyricsRequestMessage = serde_json::from_str(body)?;
            hook(message);
        }

        Ok(sent)
    }

    async fn delete(&self, message_id: &str, receipt_handle: &str) -> Result<()> {
        let known = self
            .sent
            .lock()
            .unwrap()
            .iter()
            .any(|(m, _)| m.message_id == message_id && m.receipt_handle == receipt_handle);
        if !known {
            return Err(Error::Queue(QueueError::DeleteFailed {
                message_id: message_id.to_string(),
                reason: "unknown message".to_string(),
            }));
        }
        self.deleted
            .lock()
            .unwrap()
            .push((message_id.to_string(), receipt_handle.to_string()));
        Ok(())
    }
}

//! Snapshot availability lookups.

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use serde::Deserialize;

use crate::error::{ArchiveError, Error, Result};
use crate::retry::with_retry;
use crate::types::ArchiveSnapshot;

use super::ArchivalScraper;

/// Wayback timestamps are `YYYYMMDDhhmmss` in UTC
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

#[derive(Debug, Deserialize)]
struct AvailabilityResponse {
    #[serde(default)]
    archived_snapshots: ArchivedSnapshots,
}

#[derive(Debug, Default, Deserialize)]
struct ArchivedSnapshots {
    closest: Option<ClosestSnapshot>,
}

#[derive(Debug, Deserialize)]
struct ClosestSnapshot {
    #[serde(default)]
    available: bool,
    url: String,
    timestamp: String,
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Whether a snapshot is usable as of `now`
pub(crate) fn is_fresh(snapshot: &ArchiveSnapshot, max_age: TimeDelta, now: DateTime<Utc>) -> bool {
    snapshot.available && now - snapshot.timestamp <= max_age
}

impl ArchivalScraper {
    /// Resolve a recent snapshot of `page_url`, capturing one if necessary
    ///
    /// When no fresh snapshot exists and `retried` is false, a capture is requested with
    /// [`archive_now`](Self::archive_now) and resolution is attempted exactly once more.
    pub async fn resolve_snapshot(&self, page_url: &str, retried: bool) -> Result<ArchiveSnapshot> {
        if let Some(snapshot) = self.lookup_fresh_snapshot(page_url).await? {
            return Ok(snapshot);
        }

        if retried {
            return Err(no_snapshot(page_url));
        }

        tracing::info!(url = %page_url, "No recent snapshot, requesting capture");
        let captured = self.archive_now(page_url).await?;
        tracing::debug!(url = %page_url, snapshot = %captured, "Capture finished");

        self.lookup_fresh_snapshot(page_url)
            .await?
            .ok_or_else(|| no_snapshot(page_url))
    }

    /// Query the availability API once and apply the freshness rule
    async fn lookup_fresh_snapshot(&self, page_url: &str) -> Result<Option<ArchiveSnapshot>> {
        let now = Utc::now();
        let snapshot = with_retry(&self.retry, "archive lookup", || {
            self.lookup_snapshot(page_url, now)
        })
        .await?;
        let max_age = TimeDelta::from_std(self.config.max_snapshot_age).unwrap_or(TimeDelta::MAX);

        Ok(snapshot.filter(|s| {
            let fresh = is_fresh(s, max_age, now);
            if !fresh {
                tracing::debug!(
                    url = %page_url,
                    snapshot_timestamp = %s.timestamp,
                    available = s.available,
                    "Ignoring stale or unavailable snapshot"
                );
            }
            fresh
        }))
    }

    async fn lookup_snapshot(
        &self,
        page_url: &str,
        as_of: DateTime<Utc>,
    ) -> Result<Option<ArchiveSnapshot>> {
        let timestamp = as_of.format(TIMESTAMP_FORMAT).to_string();
        let response = self
            .http
            .get(&self.config.availability_url)
            .query(&[("url", page_url), ("timestamp", timestamp.as_str())])
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Http {
                status: response.status().as_u16(),
                url: self.config.availability_url.clone(),
            });
        }

        let body: AvailabilityResponse = response.json().await?;

        Ok(body.archived_snapshots.closest.and_then(|closest| {
            parse_timestamp(&closest.timestamp).map(|timestamp| ArchiveSnapshot {
                snapshot_url: closest.url,
                timestamp,
                available: closest.available,
            })
        }))
    }
}

fn no_snapshot(page_url: &str) -> Error {
    Error::FallbackFailed(ArchiveError::NoSnapshotAvailable {
        url: page_url.to_string(),
    })
}

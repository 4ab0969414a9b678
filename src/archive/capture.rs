//! On-demand page capture ("save page now") and job status polling.

use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use std::time::Instant;

use crate::error::{ArchiveError, Error, Result};
use crate::retry::with_retry;

use super::ArchivalScraper;

// Patterns are literals; compilation cannot fail at runtime
#[allow(clippy::expect_used)]
static JOB_ID_PATTERNS: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"watchJob\(\s*["']([^"']+)["']"#).expect("valid watchJob pattern"),
        Regex::new(r#""job_id"\s*:\s*"([^"]+)""#).expect("valid job_id pattern"),
    ]
});

/// Pull the capture job id out of the submission response body
///
/// The body is an HTML page that embeds the id in a script call, or a JSON object when
/// the service answers in API mode.
pub(crate) fn extract_job_id(body: &str) -> Option<String> {
    JOB_ID_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures(body)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string())
    })
}

#[derive(Debug, Deserialize)]
struct CaptureStatus {
    status: String,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ArchivalScraper {
    /// Request a fresh capture of `page_url` and wait for it to finish
    ///
    /// Returns the synthesized snapshot URL. Fails with
    /// [`ArchiveError::ArchiveRequestRejected`] when no job id can be found or the job
    /// errors, and [`ArchiveError::ArchiveTimeout`] when the polling budget runs out.
    pub async fn archive_now(&self, page_url: &str) -> Result<String> {
        let job_id = self.submit_capture(page_url).await?;
        tracing::info!(url = %page_url, job_id = %job_id, "Archive capture submitted");

        let started = Instant::now();
        loop {
            tokio::time::sleep(self.config.poll_interval).await;

            let status = with_retry(&self.retry, "archive capture status", || {
                self.capture_status(&job_id)
            })
            .await?;
            tracing::debug!(
                job_id = %job_id,
                status = %status.status,
                elapsed_ms = started.elapsed().as_millis(),
                "Polled archive capture"
            );

            match status.status.as_str() {
                "success" => {
                    if let Some(timestamp) = status.timestamp {
                        return Ok(format!(
                            "{}/{}/{}",
                            self.config.snapshot_base_url.trim_end_matches('/'),
                            timestamp,
                            page_url
                        ));
                    }
                }
                "error" => {
                    return Err(Error::FallbackFailed(
                        ArchiveError::ArchiveRequestRejected {
                            url: page_url.to_string(),
                            reason: status
                                .message
                                .unwrap_or_else(|| "capture job failed".to_string()),
                        },
                    ));
                }
                _ => {}
            }

            if started.elapsed() >= self.config.poll_budget {
                tracing::warn!(job_id = %job_id, "Archive capture exceeded polling budget");
                return Err(Error::FallbackFailed(ArchiveError::ArchiveTimeout {
                    job_id,
                    budget_secs: self.config.poll_budget.as_secs(),
                }));
            }
        }
    }

    async fn submit_capture(&self, page_url: &str) -> Result<String> {
        let mut request = self
            .http
            .post(&self.config.save_url)
            .form(&[("url", page_url)])
            .timeout(self.config.request_timeout);
        if let (Some(access), Some(secret)) = (&self.config.access_key, &self.config.secret_key) {
            request = request.header("Authorization", format!("LOW {}:{}", access, secret));
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Error::FallbackFailed(ArchiveError::ArchiveRequestRejected {
                url: page_url.to_string(),
                reason: format!("capture submission returned HTTP {}", status.as_u16()),
            }));
        }

        extract_job_id(&body).ok_or_else(|| {
            Error::FallbackFailed(ArchiveError::ArchiveRequestRejected {
                url: page_url.to_string(),
                reason: "no job id in capture response".to_string(),
            })
        })
    }

    async fn capture_status(&self, job_id: &str) -> Result<CaptureStatus> {
        let url = format!(
            "{}/{}",
            self.config.status_url.trim_end_matches('/'),
            urlencoding::encode(job_id)
        );
        let response = self
            .http
            .get(&url)
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::Http {
                status: response.status().as_u16(),
                url,
            });
        }

        Ok(response.json().await?)
    }
}

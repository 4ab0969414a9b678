//! Lyrics page search
//!
//! Queries the search API with a combined `"{artist} {song}"` string and picks the first
//! hit that is a song with complete lyrics. Upstream ranking is authoritative; hits are
//! never re-ordered.

use async_trait::async_trait;
use serde::Deserialize;

use crate::config::{RetryConfig, SearchConfig};
use crate::error::{Error, Result, SearchError};
use crate::retry::with_retry;
use crate::types::SearchCandidate;

const SONG_HIT_TYPE: &str = "song";
const LYRICS_COMPLETE: &str = "complete";

/// Finds the lyrics page for a song
#[async_trait]
pub trait LyricsSearch: Send + Sync {
    /// Search for the best lyrics page candidate
    async fn search(&self, artist: &str, song: &str) -> Result<SearchCandidate>;
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    response: SearchResponse,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    hits: Vec<SearchHit>,
}

/// One ranked hit from the search API
#[derive(Debug, Clone, Deserialize)]
pub struct SearchHit {
    /// Result type tag (`"song"`, `"album"`, ...)
    #[serde(rename = "type")]
    pub hit_type: String,
    /// Nested result payload
    pub result: HitResult,
}

/// Nested result of a search hit
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HitResult {
    /// Lyrics page URL
    #[serde(default)]
    pub url: Option<String>,
    /// Song title
    #[serde(default)]
    pub title: Option<String>,
    /// Lyrics availability (`"complete"` when the page carries full lyrics)
    #[serde(default)]
    pub lyrics_state: Option<String>,
    /// Primary artist
    #[serde(default)]
    pub primary_artist: Option<PrimaryArtist>,
}

/// Primary artist of a search hit
#[derive(Debug, Clone, Deserialize)]
pub struct PrimaryArtist {
    /// Artist display name
    pub name: String,
}

/// Choose the first song hit with complete lyrics
pub fn select_candidate(
    query: &str,
    hits: &[SearchHit],
) -> std::result::Result<SearchCandidate, SearchError> {
    if hits.is_empty() {
        return Err(SearchError::NoResults {
            query: query.to_string(),
        });
    }

    hits.iter()
        .filter(|hit| hit.hit_type == SONG_HIT_TYPE)
        .filter(|hit| hit.result.lyrics_state.as_deref() == Some(LYRICS_COMPLETE))
        .find_map(|hit| {
            hit.result.url.as_ref().map(|url| SearchCandidate {
                url: url.clone(),
                title: hit.result.title.clone().unwrap_or_default(),
                artist_name: hit.result.primary_artist.as_ref().map(|a| a.name.clone()),
            })
        })
        .ok_or_else(|| SearchError::NoSongsFound {
            query: query.to_string(),
            hits: hits.len(),
        })
}

/// HTTP client for the lyrics search API
pub struct SearchClient {
    http: reqwest::Client,
    config: SearchConfig,
    retry: RetryConfig,
}

impl SearchClient {
    /// Create a search client using a shared HTTP client
    pub fn new(http: reqwest::Client, config: SearchConfig, retry: RetryConfig) -> Self {
        Self {
            http,
            config,
            retry,
        }
    }

    async fn fetch_hits(&self, query: &str) -> Result<Vec<SearchHit>> {
        let url = format!("{}/search", self.config.base_url.trim_end_matches('/'));

        let mut request = self
            .http
            .get(&url)
            .query(&[("q", query)])
            .timeout(self.config.timeout);
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::Http {
                status: response.status().as_u16(),
                url,
            });
        }

        let envelope: SearchEnvelope = response.json().await?;
        Ok(envelope.response.hits)
    }
}

#[async_trait]
impl LyricsSearch for SearchClient {
    async fn search(&self, artist: &str, song: &str) -> Result<SearchCandidate> {
        let query = format!("{} {}", artist, song);

        let hits = with_retry(&self.retry, "search", || self.fetch_hits(&query)).await?;
        let candidate = select_candidate(&query, &hits)?;

        tracing::debug!(
            query = %query,
            hits = hits.len(),
            url = %candidate.url,
            "Selected lyrics page"
        );

        Ok(candidate)
    }
}

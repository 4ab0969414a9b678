//! Shared fixtures for lyrics-dl integration tests

use chrono::Utc;
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use lyrics_dl::Config;
use lyrics_dl::config::{ArchiveConfig, PersistenceConfig, RetryConfig, SearchConfig, WorkerConfig};

/// Lyrics page URL returned by the mocked search API
pub const PAGE_URL: &str = "https://example/lyrics";

/// Archived lyrics page with two containers
pub const LYRICS_PAGE: &str = r#"<html><body>
<div data-lyrics-container="true">line1</div>
<div class="ad">buy now</div>
<div data-lyrics-container="true">line2</div>
</body></html>"#;

/// Config pointing every upstream at `server` with short worker intervals
pub fn test_config(server: &MockServer, database_path: &Path) -> Config {
    Config {
        search: SearchConfig {
            base_url: server.uri(),
            access_token: Some("test-token".to_string()),
            timeout: Duration::from_secs(5),
        },
        archive: ArchiveConfig {
            availability_url: format!("{}/wayback/available", server.uri()),
            save_url: format!("{}/save", server.uri()),
            status_url: format!("{}/save/status", server.uri()),
            snapshot_base_url: format!("{}/web", server.uri()),
            poll_interval: Duration::from_millis(10),
            poll_budget: Duration::from_millis(200),
            ..ArchiveConfig::default()
        },
        worker: WorkerConfig {
            enabled: true,
            ack_grace_period: Duration::from_millis(400),
            poll_interval: Duration::from_millis(10),
            job_timeout: Duration::from_secs(2),
        },
        persistence: PersistenceConfig {
            database_path: database_path.to_path_buf(),
        },
        retry: RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        },
        ..Config::default()
    }
}

/// Search API answering with a single complete song hit on [`PAGE_URL`]
pub async fn mount_search(server: &MockServer, expected_calls: u64) {
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": {"hits": [
                {"type": "song", "result": {
                    "url": PAGE_URL,
                    "title": "Song B",
                    "lyrics_state": "complete",
                    "primary_artist": {"name": "Artist A"}
                }}
            ]}
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// Availability API reporting a day-old snapshot, plus the snapshot page itself
pub async fn mount_fresh_snapshot(server: &MockServer, expected_lookups: u64) {
    let timestamp = (Utc::now() - chrono::TimeDelta::days(1))
        .format("%Y%m%d%H%M%S")
        .to_string();

    Mock::given(method("GET"))
        .and(path("/wayback/available"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "archived_snapshots": {"closest": {
                "available": true,
                "url": format!("{}/web/{}/{}", server.uri(), timestamp, PAGE_URL),
                "timestamp": timestamp
            }}
        })))
        .expect(expected_lookups)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path_regex("^/web/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(LYRICS_PAGE))
        .mount(server)
        .await;
}

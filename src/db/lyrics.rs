//! Lyrics cache CRUD operations.

use crate::error::DatabaseError;
use crate::types::LyricsRecord;
use crate::{Error, Result};

use super::{Database, LyricsRow};

impl Database {
    /// Get cached lyrics by exact artist and song name
    pub async fn get_lyrics(&self, artist: &str, song: &str) -> Result<Option<LyricsRecord>> {
        let row = sqlx::query_as::<_, LyricsRow>(
            r#"
            SELECT record_id, artist_name, song_name, lyrics_text, created_at
            FROM lyrics
            WHERE artist_name = ? AND song_name = ?
            "#,
        )
        .bind(artist)
        .bind(song)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get lyrics: {}",
                e
            )))
        })?;

        Ok(row.map(LyricsRecord::from))
    }

    /// Get cached lyrics by record id
    pub async fn get_lyrics_by_id(&self, record_id: &str) -> Result<Option<LyricsRecord>> {
        let row = sqlx::query_as::<_, LyricsRow>(
            r#"
            SELECT record_id, artist_name, song_name, lyrics_text, created_at
            FROM lyrics
            WHERE record_id = ?
            "#,
        )
        .bind(record_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to get lyrics by id: {}",
                e
            )))
        })?;

        Ok(row.map(LyricsRecord::from))
    }

    /// Insert lyrics, replacing the whole record if the `(artist, song)` key exists
    pub async fn upsert_lyrics(&self, record: &LyricsRecord) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO lyrics (artist_name, song_name, record_id, lyrics_text, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(artist_name, song_name) DO UPDATE SET
                record_id = excluded.record_id,
                lyrics_text = excluded.lyrics_text,
                created_at = excluded.created_at
            "#,
        )
        .bind(&record.artist_name)
        .bind(&record.song_name)
        .bind(&record.record_id)
        .bind(&record.lyrics_text)
        .bind(record.created_at.timestamp())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            Error::Database(DatabaseError::QueryFailed(format!(
                "Failed to upsert lyrics: {}",
                e
            )))
        })?;

        Ok(())
    }
}

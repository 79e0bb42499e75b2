//! Test utilities and fixtures for tunebridge tests.
//!
//! This module provides common test helpers, mock factories, and
//! database utilities to reduce boilerplate in tests.
//!
//! # Example
//!
//! ```ignore
//! use tunebridge::test_utils::{temp_db, mock_local_song};
//!
//! #[tokio::test]
//! async fn test_something() {
//!     let (library, _dir) = temp_db().await;
//!     let stored = library.add_many(vec![mock_local_song("Song")]).await.unwrap();
//!     // ... test logic
//! }
//! ```

use std::path::PathBuf;

use async_trait::async_trait;
use tempfile::TempDir;

use crate::db::{SongRepository, SqliteLibrary};
use crate::error::PersistenceError;
use crate::model::{Song, SongId, SongSource, SongUpdate};

/// Creates a temporary library database for testing.
///
/// The database is created in a temporary directory that is automatically
/// cleaned up when the returned `TempDir` is dropped. Migrations are run
/// automatically.
///
/// # Returns
///
/// A tuple of (library, temp directory handle).
/// Keep the TempDir alive for the duration of your test.
pub async fn temp_db() -> (SqliteLibrary, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp directory");
    let db_path = dir.path().join("test.db");

    let pool = crate::db::init_db(&crate::db::db_url(&db_path))
        .await
        .expect("Failed to initialize test database");

    (SqliteLibrary::new(pool), dir)
}

/// A not-yet-stored local song backed by a non-existent file.
///
/// Customize with struct update syntax or plain field assignment.
pub fn mock_local_song(title: &str) -> Song {
    let mut song = Song::new(
        SongId::new("local:new"),
        title,
        "Test Artist",
        "Test Album",
        SongSource::LocalFile(PathBuf::from(format!("/test/music/{title}.mp3"))),
    );
    song.duration = 180.0;
    song
}

/// A remote search result with a playable URL.
pub fn mock_remote_song(id: u64, title: &str) -> Song {
    let mut song = Song::new(
        SongId::netease(id),
        title,
        "Remote Artist",
        "Remote Album",
        SongSource::Url(format!("http://m7.example.com/{id}.mp3")),
    );
    song.duration = 240.0;
    song
}

/// A song with a fixed id, for queue and store tests that never persist.
pub fn song_with_id(id: &str) -> Song {
    Song::new(
        SongId::new(id),
        format!("Song {id}"),
        "Test Artist",
        "Test Album",
        SongSource::Url(format!("http://m7.example.com/{id}.mp3")),
    )
}

/// Library store whose every operation fails.
pub struct FailingLibrary;

impl FailingLibrary {
    fn error() -> PersistenceError {
        PersistenceError::Unavailable("database is locked".to_string())
    }
}

#[async_trait]
impl SongRepository for FailingLibrary {
    async fn add_many(&self, _songs: Vec<Song>) -> Result<Vec<Song>, PersistenceError> {
        Err(Self::error())
    }

    async fn list_all(&self) -> Result<Vec<Song>, PersistenceError> {
        Err(Self::error())
    }

    async fn get(&self, _id: &SongId) -> Result<Option<Song>, PersistenceError> {
        Err(Self::error())
    }

    async fn update(&self, _id: &SongId, _update: &SongUpdate) -> Result<bool, PersistenceError> {
        Err(Self::error())
    }

    async fn upsert(&self, _song: &Song) -> Result<(), PersistenceError> {
        Err(Self::error())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_temp_db_creates_working_database() {
        let (library, _dir) = temp_db().await;

        // Should be able to query
        let songs = library.list_all().await.unwrap();
        assert!(songs.is_empty());
    }

    #[test]
    fn test_mock_songs() {
        let local = mock_local_song("Song");
        assert!(matches!(local.source, SongSource::LocalFile(_)));
        assert_eq!(local.duration, 180.0);

        let remote = mock_remote_song(42, "Remote");
        assert_eq!(remote.id.netease_id(), Some(42));
    }

    #[tokio::test]
    async fn test_failing_library() {
        let result = FailingLibrary.list_all().await;
        assert!(matches!(result, Err(PersistenceError::Unavailable(_))));
    }
}

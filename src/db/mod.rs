//! Persistent library store.
//!
//! Uses SQLx with SQLite for lightweight, embedded storage of [`Song`]
//! records. The store is reached through the [`SongRepository`] trait so the
//! player can be tested against in-memory or failing implementations.
//!
//! # Example
//!
//! ```ignore
//! use tunebridge::db::{init_db, SqliteLibrary, SongRepository};
//!
//! let pool = init_db("sqlite:library.db").await?;
//! let library = SqliteLibrary::new(pool);
//! let songs = library.list_all().await?;
//! ```

use async_trait::async_trait;
use sqlx::migrate::MigrateDatabase;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::path::PathBuf;

use crate::error::PersistenceError;
use crate::model::{Song, SongId, SongSource, SongUpdate};

/// Default database filename.
pub const DEFAULT_DB_NAME: &str = "tunebridge.db";

/// Build a SQLite database URL from a path.
pub fn db_url(path: &std::path::Path) -> String {
    format!("sqlite:{}", path.display())
}

/// Initialize the database connection pool and run migrations.
///
/// Creates the database file if it doesn't exist.
pub async fn init_db(db_url: &str) -> Result<SqlitePool, PersistenceError> {
    if !sqlx::Sqlite::database_exists(db_url).await.unwrap_or(false) {
        sqlx::Sqlite::create_database(db_url).await?;
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(db_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;

    Ok(pool)
}

/// Durable song table. Every failure is a [`PersistenceError`].
#[async_trait]
pub trait SongRepository: Send + Sync {
    /// Insert imported songs, assigning each a fresh `local:<n>` id.
    ///
    /// Returns the songs as stored, ids included.
    async fn add_many(&self, songs: Vec<Song>) -> Result<Vec<Song>, PersistenceError>;

    /// All stored songs in insertion order.
    async fn list_all(&self) -> Result<Vec<Song>, PersistenceError>;

    /// Look up one song.
    async fn get(&self, id: &SongId) -> Result<Option<Song>, PersistenceError>;

    /// Apply the present fields of `update` to the song with `id`.
    ///
    /// Returns `false` when no song has that id.
    async fn update(&self, id: &SongId, update: &SongUpdate) -> Result<bool, PersistenceError>;

    /// Insert or replace a song under its own id (liked search results).
    async fn upsert(&self, song: &Song) -> Result<(), PersistenceError>;
}

/// Raw `songs` row.
#[derive(Debug, Clone, sqlx::FromRow)]
struct SongRow {
    id: String,
    title: String,
    artist: String,
    album: String,
    duration: f64,
    file_path: Option<String>,
    url: Option<String>,
    remote_cover_url: Option<String>,
    lyrics: Option<String>,
    liked: bool,
    is_live: bool,
}

impl From<SongRow> for Song {
    fn from(row: SongRow) -> Self {
        let source = match (row.file_path, row.url) {
            (Some(path), _) => SongSource::LocalFile(PathBuf::from(path)),
            (None, Some(url)) => SongSource::Url(url),
            (None, None) => SongSource::Unresolved,
        };
        Song {
            id: SongId::new(row.id),
            title: row.title,
            artist: row.artist,
            album: row.album,
            duration: row.duration,
            source,
            remote_cover_url: row.remote_cover_url,
            lyrics: row.lyrics,
            liked: row.liked,
            is_live: row.is_live,
        }
    }
}

/// Split a source into its `(file_path, url)` columns.
fn source_columns(source: &SongSource) -> (Option<String>, Option<&str>) {
    match source {
        SongSource::LocalFile(path) => (Some(path.to_string_lossy().into_owned()), None),
        SongSource::Url(url) => (None, Some(url.as_str())),
        SongSource::Unresolved => (None, None),
    }
}

const SELECT_SONGS: &str = "SELECT id, title, artist, album, duration, file_path, url, \
     remote_cover_url, lyrics, liked, is_live FROM songs";

/// SQLite-backed [`SongRepository`].
#[derive(Debug, Clone)]
pub struct SqliteLibrary {
    pool: SqlitePool,
}

impl SqliteLibrary {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Open (creating if needed) the library at `path`.
    pub async fn open(path: &std::path::Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| PersistenceError::Unavailable(e.to_string()))?;
        }
        let pool = init_db(&db_url(path)).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl SongRepository for SqliteLibrary {
    async fn add_many(&self, songs: Vec<Song>) -> Result<Vec<Song>, PersistenceError> {
        let added_at = chrono::Utc::now().to_rfc3339();
        let mut tx = self.pool.begin().await?;
        let mut stored = Vec::with_capacity(songs.len());

        for mut song in songs {
            let (file_path, url) = source_columns(&song.source);
            let (id,): (String,) = sqlx::query_as(
                r#"
                INSERT INTO songs (id, title, artist, album, duration, file_path, url,
                                   remote_cover_url, lyrics, liked, is_live, added_at)
                VALUES ('local:' || (SELECT COALESCE(MAX(rowid), 0) + 1 FROM songs),
                        ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                RETURNING id
                "#,
            )
            .bind(&song.title)
            .bind(&song.artist)
            .bind(&song.album)
            .bind(song.duration)
            .bind(file_path)
            .bind(url)
            .bind(&song.remote_cover_url)
            .bind(&song.lyrics)
            .bind(song.liked)
            .bind(song.is_live)
            .bind(&added_at)
            .fetch_one(&mut *tx)
            .await?;

            song.id = SongId::new(id);
            stored.push(song);
        }

        tx.commit().await?;
        tracing::debug!("Added {} songs to library", stored.len());
        Ok(stored)
    }

    async fn list_all(&self) -> Result<Vec<Song>, PersistenceError> {
        let rows = sqlx::query_as::<_, SongRow>(&format!("{SELECT_SONGS} ORDER BY rowid"))
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Song::from).collect())
    }

    async fn get(&self, id: &SongId) -> Result<Option<Song>, PersistenceError> {
        let row = sqlx::query_as::<_, SongRow>(&format!("{SELECT_SONGS} WHERE id = ?"))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Song::from))
    }

    async fn update(&self, id: &SongId, update: &SongUpdate) -> Result<bool, PersistenceError> {
        let result = sqlx::query(
            r#"
            UPDATE songs SET
                liked = COALESCE(?, liked),
                remote_cover_url = COALESCE(?, remote_cover_url),
                lyrics = COALESCE(?, lyrics)
            WHERE id = ?
            "#,
        )
        .bind(update.liked)
        .bind(&update.remote_cover_url)
        .bind(&update.lyrics)
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn upsert(&self, song: &Song) -> Result<(), PersistenceError> {
        let (file_path, url) = source_columns(&song.source);
        sqlx::query(
            r#"
            INSERT INTO songs (id, title, artist, album, duration, file_path, url,
                               remote_cover_url, lyrics, liked, is_live, added_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                artist = excluded.artist,
                album = excluded.album,
                duration = excluded.duration,
                file_path = excluded.file_path,
                url = excluded.url,
                remote_cover_url = excluded.remote_cover_url,
                lyrics = excluded.lyrics,
                liked = excluded.liked,
                is_live = excluded.is_live
            "#,
        )
        .bind(song.id.as_str())
        .bind(&song.title)
        .bind(&song.artist)
        .bind(&song.album)
        .bind(song.duration)
        .bind(file_path)
        .bind(url)
        .bind(&song.remote_cover_url)
        .bind(&song.lyrics)
        .bind(song.liked)
        .bind(song.is_live)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_local_song, mock_remote_song, temp_db};

    #[tokio::test]
    async fn test_init_db_creates_database() {
        let temp_dir = tempfile::tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let pool = init_db(&db_url(&db_path)).await.expect("Failed to init db");
        assert!(db_path.exists());

        let songs = SqliteLibrary::new(pool).list_all().await.unwrap();
        assert!(songs.is_empty());
    }

    #[tokio::test]
    async fn test_add_many_assigns_local_ids() {
        let (library, _dir) = temp_db().await;

        let stored = library
            .add_many(vec![mock_local_song("a"), mock_local_song("b")])
            .await
            .unwrap();

        assert_eq!(stored[0].id.as_str(), "local:1");
        assert_eq!(stored[1].id.as_str(), "local:2");

        let all = library.list_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].title, "a");
        assert!(matches!(all[1].source, SongSource::LocalFile(_)));
    }

    #[tokio::test]
    async fn test_update_only_touches_present_fields() {
        let (library, _dir) = temp_db().await;
        let mut song = mock_local_song("Song");
        song.lyrics = Some("[00:01.00]keep me".to_string());
        let stored = library.add_many(vec![song]).await.unwrap();
        let id = stored[0].id.clone();

        let found = library
            .update(
                &id,
                &SongUpdate {
                    remote_cover_url: Some("https://img.example.com/c.jpg".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(found);

        let reloaded = library.get(&id).await.unwrap().unwrap();
        assert_eq!(
            reloaded.remote_cover_url.as_deref(),
            Some("https://img.example.com/c.jpg")
        );
        assert_eq!(reloaded.lyrics.as_deref(), Some("[00:01.00]keep me"));
        assert!(!reloaded.liked);
    }

    #[tokio::test]
    async fn test_update_missing_song_reports_not_found() {
        let (library, _dir) = temp_db().await;
        let found = library
            .update(&SongId::new("local:99"), &SongUpdate::liked(true))
            .await
            .unwrap();
        assert!(!found);
    }

    #[tokio::test]
    async fn test_upsert_keeps_provider_id() {
        let (library, _dir) = temp_db().await;
        let mut song = mock_remote_song(186016, "Remote");
        song.liked = true;

        library.upsert(&song).await.unwrap();
        song.title = "Renamed".to_string();
        library.upsert(&song).await.unwrap();

        let all = library.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, SongId::netease(186016));
        assert_eq!(all[0].title, "Renamed");
        assert!(all[0].liked);
    }
}

//! Library import (scan a folder, read tags, store the songs) and the
//! album view over the stored songs.

use crate::db::SongRepository;
use crate::error::PersistenceError;
use crate::model::Song;
use crate::{metadata, scanner};
use futures::StreamExt;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Name of the leading group that collects liked songs.
pub const FAVORITES: &str = "Favorites";

/// Scans `root` for audio files and adds them all to the library.
///
/// Returns the stored songs with their assigned ids. Tag reading runs on
/// blocking threads, a few files at a time.
pub async fn import_folder(
    library: &dyn SongRepository,
    root: PathBuf,
) -> Result<Vec<Song>, PersistenceError> {
    tracing::info!("Importing music from {:?}", root);

    let songs: Vec<Song> = scanner::scan(root)
        .map(|path| async move {
            tokio::task::spawn_blocking(move || metadata::song_from_file(&path)).await
        })
        .buffered(8)
        .filter_map(|joined| async move {
            match joined {
                Ok(song) => Some(song),
                Err(e) => {
                    tracing::warn!("Tag reader task failed: {}", e);
                    None
                }
            }
        })
        .collect()
        .await;

    if songs.is_empty() {
        tracing::info!("No audio files found");
        return Ok(Vec::new());
    }

    let stored = library.add_many(songs).await?;
    tracing::info!("Imported {} songs", stored.len());
    Ok(stored)
}

// ============================================================================
// Album view
// ============================================================================

/// Songs sharing an album name, or the liked-songs group.
#[derive(Debug, Clone, PartialEq)]
pub struct AlbumGroup {
    pub name: String,
    /// Artist of the first song seen; "Various Artists" for favorites
    pub artist: String,
    pub cover: Option<String>,
    pub songs: Vec<Song>,
    pub is_favorites: bool,
}

/// Group library songs by album, sorted by album name.
///
/// When any song is liked, a [`FAVORITES`] group holding all liked songs
/// comes first. Liked songs also stay in their own album.
pub fn group_albums(songs: &[Song]) -> Vec<AlbumGroup> {
    let mut albums: BTreeMap<(String, String), AlbumGroup> = BTreeMap::new();
    for song in songs {
        let name = if song.album.is_empty() {
            metadata::UNKNOWN_ALBUM.to_string()
        } else {
            song.album.clone()
        };
        let group = albums
            .entry((name.to_lowercase(), name.clone()))
            .or_insert_with(|| AlbumGroup {
                name,
                artist: if song.artist.is_empty() {
                    metadata::UNKNOWN_ARTIST.to_string()
                } else {
                    song.artist.clone()
                },
                cover: song.remote_cover_url.clone(),
                songs: Vec::new(),
                is_favorites: false,
            });
        group.songs.push(song.clone());
    }

    let liked: Vec<Song> = songs.iter().filter(|s| s.liked).cloned().collect();
    let mut groups = Vec::with_capacity(albums.len() + 1);
    if !liked.is_empty() {
        groups.push(AlbumGroup {
            name: FAVORITES.to_string(),
            artist: "Various Artists".to_string(),
            cover: None,
            songs: liked,
            is_favorites: true,
        });
    }
    groups.extend(albums.into_values());
    groups
}

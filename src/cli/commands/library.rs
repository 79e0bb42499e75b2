//! Library import, listing and like commands.

use std::path::Path;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::db::SongRepository;
use crate::error::Error;
use crate::library;
use crate::model::{Song, SongId};
use crate::player::{PlayerStore, format_time};

use super::open_library;

/// Import every audio file under `path`
pub fn cmd_import(rt: &Runtime, config: &Config, path: &Path) -> anyhow::Result<()> {
    rt.block_on(async {
        let library = open_library(config).await?;
        println!("Importing from: {}", path.display());

        let stored = library::import_folder(&library, path.to_path_buf()).await?;
        for song in &stored {
            println!("  + {}", song_line(song));
        }
        println!("\nImport complete. Added {} songs.", stored.len());
        anyhow::Ok(())
    })
}

/// List library songs
pub fn cmd_list(rt: &Runtime, config: &Config, liked_only: bool) -> anyhow::Result<()> {
    rt.block_on(async {
        let library = open_library(config).await?;
        let songs = library.list_all().await?;

        let mut shown = 0;
        for song in songs.iter().filter(|s| !liked_only || s.liked) {
            println!("{}", song_line(song));
            shown += 1;
        }
        if shown == 0 {
            println!("No songs.");
        }
        anyhow::Ok(())
    })
}

/// List library songs grouped by album, favorites first
pub fn cmd_albums(rt: &Runtime, config: &Config) -> anyhow::Result<()> {
    rt.block_on(async {
        let library = open_library(config).await?;
        let groups = library::group_albums(&library.list_all().await?);
        if groups.is_empty() {
            println!("No songs.");
            return Ok(());
        }

        for group in &groups {
            let marker = if group.is_favorites { "♥" } else { "" };
            println!(
                "\n{}{} - {} ({} songs)",
                marker,
                group.name,
                group.artist,
                group.songs.len()
            );
            for song in &group.songs {
                println!("  {}", song_line(song));
            }
        }
        anyhow::Ok(())
    })
}

/// Flip the liked flag of a library song
pub fn cmd_like(rt: &Runtime, config: &Config, id: &str) -> anyhow::Result<()> {
    rt.block_on(async {
        let library = Arc::new(open_library(config).await?);
        let id = SongId::new(id);
        let song = library
            .get(&id)
            .await?
            .ok_or_else(|| Error::SongNotFound(id.to_string()))?;

        let mut store = PlayerStore::new(library);
        store.load_library().await?;
        let liked = store.toggle_like(&song).await?;

        println!(
            "{} {}",
            if liked { "♥ Liked" } else { "♡ Unliked" },
            song_line(&song)
        );
        anyhow::Ok(())
    })
}

/// One-line summary of a song.
pub(crate) fn song_line(song: &Song) -> String {
    let marker = if song.liked { "♥" } else { " " };
    let length = if song.is_live {
        "live".to_string()
    } else {
        format_time(song.duration)
    };
    format!(
        "{} {:<12} {} - {} [{}] ({})",
        marker, song.id, song.title, song.artist, song.album, length
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_local_song, song_with_id};

    #[test]
    fn test_song_line() {
        let mut song = mock_local_song("Blue");
        song.liked = true;
        let line = song_line(&song);
        assert!(line.starts_with("♥ local:new"));
        assert!(line.contains("Blue - Test Artist [Test Album] (3:00)"));
    }

    #[test]
    fn test_song_line_live() {
        let mut song = song_with_id("station:abc");
        song.is_live = true;
        assert!(song_line(&song).ends_with("(live)"));
    }
}

//! Remote search, play URL, metadata match and lyrics commands.

use std::collections::HashSet;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::db::SongRepository;
use crate::enrichment::{
    LyricLine, MatchMode, SearchService, active_line, enrich, parse_lyrics,
};
use crate::error::Error;
use crate::model::{MetadataPatch, SongId, SongUpdate};
use crate::player::format_time;

use super::library::song_line;
use super::{music_api, open_library};

/// Search the music service for playable songs
pub fn cmd_search(
    rt: &Runtime,
    config: &Config,
    query: &str,
    page: u32,
    limit: u32,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let library = open_library(config).await?;
        let liked: HashSet<SongId> = library
            .list_all()
            .await?
            .into_iter()
            .filter(|s| s.liked)
            .map(|s| s.id)
            .collect();

        let service = SearchService::new(music_api(config)?);
        let songs = service.search(query, page, limit, &liked).await?;

        if songs.is_empty() {
            println!("No playable results for \"{}\".", query);
            return Ok(());
        }
        for song in &songs {
            println!("{}", song_line(song));
        }
        println!("\nPage {}: {} songs.", page.max(1), songs.len());
        anyhow::Ok(())
    })
}

/// Look up the playable URL of one remote song
pub fn cmd_url(rt: &Runtime, config: &Config, id: u64) -> anyhow::Result<()> {
    rt.block_on(async {
        let service = SearchService::new(music_api(config)?);
        match service.play_url(id).await? {
            Some(url) => println!("{}", url),
            None => println!("✗ No playable URL for {}.", id),
        }
        anyhow::Ok(())
    })
}

/// Find cover art and lyrics for a library song
pub fn cmd_match(rt: &Runtime, config: &Config, id: &str, write: bool) -> anyhow::Result<()> {
    rt.block_on(async {
        let library = open_library(config).await?;
        let id = SongId::new(id);
        let song = library
            .get(&id)
            .await?
            .ok_or_else(|| Error::SongNotFound(id.to_string()))?;

        println!("Matching: {} - {}", song.title, song.artist);
        let api = music_api(config)?;
        let patch = match found_patch(enrich(api.as_ref(), &song, MatchMode::Requested).await) {
            Ok(Some(patch)) => patch,
            Ok(None) => {
                println!("✗ No match found.");
                return Ok(());
            }
            Err(e) => {
                if e.is_network() {
                    println!("✗ Music service unreachable at {}", config.proxy.base_url);
                }
                return Err(e.into());
            }
        };

        println!("✓ Match found!");
        if let Some(ref cover) = patch.remote_cover_url {
            println!("  Cover:  {}", cover);
        }
        if let Some(ref lyrics) = patch.lyrics {
            println!("  Lyrics: {} timed lines", parse_lyrics(lyrics).len());
        }

        if write {
            library.update(&song.id, &SongUpdate::from(&patch)).await?;
            println!("✓ Saved to library");
        }
        anyhow::Ok(())
    })
}

/// Print the lyrics of a remote song
pub fn cmd_lyrics(
    rt: &Runtime,
    config: &Config,
    id: u64,
    at: Option<f64>,
    translation: bool,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let pair = music_api(config)?.lyrics(id).await?;
        let text = if translation {
            pair.translation
        } else {
            pair.original
        };

        let lines = parse_lyrics(&text);
        if lines.is_empty() {
            println!("No lyrics for {}.", id);
            return Ok(());
        }

        match at {
            Some(time) => match active_line(&lines, time) {
                Some(index) => println!("{}", lyric_line(&lines[index])),
                None => println!("(no line at {})", format_time(time)),
            },
            None => {
                for line in &lines {
                    println!("{}", lyric_line(line));
                }
            }
        }
        anyhow::Ok(())
    })
}

/// A requested match that found nothing is an answer, not a failure.
fn found_patch(
    result: Result<Option<MetadataPatch>, Error>,
) -> Result<Option<MetadataPatch>, Error> {
    match result {
        Err(Error::NoMatch { .. }) => Ok(None),
        other => other,
    }
}

fn lyric_line(line: &LyricLine) -> String {
    format!("[{}] {}", format_time(line.time), line.text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::traits::mocks::MockMusicApi;
    use crate::error::NetworkError;
    use crate::test_utils::mock_local_song;

    #[tokio::test]
    async fn test_requested_match_without_results_is_no_match() {
        let api = MockMusicApi::empty();
        let song = mock_local_song("Nothing Like It");
        let result = found_patch(enrich(&api, &song, MatchMode::Requested).await);
        assert!(matches!(result, Ok(None)));
    }

    #[test]
    fn test_found_patch_keeps_failures() {
        let result = found_patch(Err(NetworkError::Transport("refused".to_string()).into()));
        assert!(result.unwrap_err().is_network());
    }

    #[test]
    fn test_lyric_line() {
        let line = LyricLine {
            time: 75.5,
            text: "Hello".to_string(),
        };
        assert_eq!(lyric_line(&line), "[1:15] Hello");
    }
}

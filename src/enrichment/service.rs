//! Enrichment service - matches songs against the remote music service
//!
//! This is the high-level API for enriching songs and searching:
//! 1. Keyword search for `"{title} {artist}"`, first result only
//! 2. Album art and lyrics lookups for that result, run concurrently
//! 3. A [`MetadataPatch`] holding only what was actually found
//!
//! Playable search lives here too since it shares the same lookups.

use std::collections::HashSet;
use std::sync::Arc;

use crate::enrichment::domain::RemoteTrack;
use crate::enrichment::traits::MusicApi;
use crate::error::{Error, NetworkError};
use crate::model::{MetadataPatch, Song, SongId, SongSource};

/// Candidates fetched per requested search result, to make up for
/// unplayable ones being filtered out.
const SEARCH_OVERFETCH: u32 = 3;

/// Who asked for a match, which decides how failures are reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Background match on song change: failures and no-match stay silent
    Automatic,
    /// User asked for it: no-match and failures are surfaced
    Requested,
}

/// Whether a song is missing cover art or lyrics. Live streams never are.
pub fn needs_enrichment(song: &Song) -> bool {
    !song.is_live && (song.remote_cover_url.is_none() || song.lyrics.is_none())
}

/// Match a title/artist pair against the remote service.
///
/// Returns `Ok(None)` when the search has no result or the result has
/// neither album art nor lyrics. A failure of only one of the two detail
/// lookups still yields what the other found.
pub async fn match_metadata(
    api: &dyn MusicApi,
    title: &str,
    artist: &str,
) -> Result<Option<MetadataPatch>, NetworkError> {
    let query = match_query(title, artist);

    let Some(track) = api.search(&query, 1, 0).await?.into_iter().next() else {
        tracing::debug!("No search result for \"{}\"", query);
        return Ok(None);
    };

    let (detail, lyrics) = futures::join!(api.song_detail(track.id), api.lyrics(track.id));

    let (detail, lyrics) = match (detail, lyrics) {
        (Err(e), Err(_)) => return Err(e),
        (detail, lyrics) => (
            detail.unwrap_or_else(|e| {
                tracing::warn!("Detail lookup for {} failed: {}", track.id, e);
                None
            }),
            lyrics.map(Some).unwrap_or_else(|e| {
                tracing::warn!("Lyrics lookup for {} failed: {}", track.id, e);
                None
            }),
        ),
    };

    let patch = MetadataPatch {
        remote_cover_url: detail.and_then(|d| d.album_cover_url),
        lyrics: lyrics.map(|l| l.original).filter(|text| !text.is_empty()),
    };

    if patch.is_empty() {
        tracing::debug!("Match for \"{}\" had no cover or lyrics", query);
        Ok(None)
    } else {
        Ok(Some(patch))
    }
}

/// Match a song, reporting failures according to `mode`.
pub async fn enrich(
    api: &dyn MusicApi,
    song: &Song,
    mode: MatchMode,
) -> Result<Option<MetadataPatch>, Error> {
    match (match_metadata(api, &song.title, &song.artist).await, mode) {
        (Ok(Some(patch)), _) => Ok(Some(patch)),
        (Ok(None), MatchMode::Automatic) => Ok(None),
        (Ok(None), MatchMode::Requested) => Err(Error::NoMatch {
            query: match_query(&song.title, &song.artist),
        }),
        (Err(e), MatchMode::Automatic) => {
            tracing::debug!("Background match for {} failed: {}", song.id, e);
            Ok(None)
        }
        (Err(e), MatchMode::Requested) => Err(e.into()),
    }
}

fn match_query(title: &str, artist: &str) -> String {
    format!("{title} {artist}")
}

/// Keyword search that only returns songs with a playable URL.
pub struct SearchService {
    api: Arc<dyn MusicApi>,
}

impl SearchService {
    pub fn new(api: Arc<dyn MusicApi>) -> Self {
        Self { api }
    }

    /// One page of playable results, at most `limit` long.
    ///
    /// Songs whose id is in `liked` come back already liked.
    pub async fn search(
        &self,
        query: &str,
        page: u32,
        limit: u32,
        liked: &HashSet<SongId>,
    ) -> Result<Vec<Song>, NetworkError> {
        let fetch_limit = limit.saturating_mul(SEARCH_OVERFETCH);
        let offset = page.max(1).saturating_sub(1).saturating_mul(fetch_limit);

        let tracks = self.api.search(query, fetch_limit, offset).await?;
        if tracks.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<u64> = tracks.iter().map(|t| t.id).collect();
        let mut urls = self.api.song_urls(&ids).await?;

        let songs: Vec<Song> = tracks
            .into_iter()
            .filter_map(|track| {
                let url = urls.remove(&track.id)?;
                let mut song = track_to_song(track, SongSource::Url(url));
                song.liked = liked.contains(&song.id);
                Some(song)
            })
            .take(limit as usize)
            .collect();

        tracing::debug!(
            "Search \"{}\" page {}: {} of {} candidates playable",
            query,
            page,
            songs.len(),
            ids.len()
        );
        Ok(songs)
    }

    /// Playable URL for one remote track, if it has one.
    pub async fn play_url(&self, id: u64) -> Result<Option<String>, NetworkError> {
        let mut urls = self.api.song_urls(&[id]).await?;
        Ok(urls.remove(&id))
    }
}

/// Song for a remote track.
pub fn track_to_song(track: RemoteTrack, source: SongSource) -> Song {
    let artist = track.artist_line();
    let mut song = Song::new(
        SongId::netease(track.id),
        track.name,
        artist,
        track.album.unwrap_or_else(|| "Unknown Album".to_string()),
        source,
    );
    song.remote_cover_url = track.cover_url;
    song.duration = track.duration_ms.map_or(0.0, |ms| ms as f64 / 1000.0);
    song
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::traits::mocks::{remote_track, MockMusicApi};
    use crate::test_utils::mock_local_song;

    fn timeout() -> NetworkError {
        NetworkError::Timeout {
            url: "http://localhost:3000/netease/api/search/get/web".to_string(),
        }
    }

    #[tokio::test]
    async fn test_match_uses_first_result_only() {
        let api = MockMusicApi::with_tracks(vec![
            remote_track(10, "Song", &["Artist"]),
            remote_track(11, "Song", &["Artist"]),
        ])
        .cover(10, "https://img.example.com/10.jpg")
        .cover(11, "https://img.example.com/11.jpg")
        .lyric_text(10, "[00:01.00]Hi");

        let patch = match_metadata(&api, "Song", "Artist").await.unwrap().unwrap();
        assert_eq!(
            patch.remote_cover_url.as_deref(),
            Some("https://img.example.com/10.jpg")
        );
        assert_eq!(patch.lyrics.as_deref(), Some("[00:01.00]Hi"));

        let searches = api.searches.lock().unwrap();
        assert_eq!(searches[0], ("Song Artist".to_string(), 1, 0));
    }

    #[tokio::test]
    async fn test_match_cover_only() {
        let api = MockMusicApi::with_tracks(vec![remote_track(10, "Song", &["Artist"])])
            .cover(10, "https://img.example.com/10.jpg");

        let patch = match_metadata(&api, "Song", "Artist").await.unwrap().unwrap();
        assert!(patch.remote_cover_url.is_some());
        assert!(patch.lyrics.is_none());
    }

    #[tokio::test]
    async fn test_match_nothing_found() {
        let api = MockMusicApi::empty();
        assert!(match_metadata(&api, "Song", "Artist").await.unwrap().is_none());

        // A result with neither cover nor lyrics is not a match either
        let api = MockMusicApi::with_tracks(vec![remote_track(10, "Song", &["Artist"])]);
        assert!(match_metadata(&api, "Song", "Artist").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_tolerates_one_failed_lookup() {
        let mut api = MockMusicApi::with_tracks(vec![remote_track(10, "Song", &["Artist"])])
            .lyric_text(10, "[00:01.00]Hi");
        api.detail_error = Some(timeout());

        let patch = match_metadata(&api, "Song", "Artist").await.unwrap().unwrap();
        assert!(patch.remote_cover_url.is_none());
        assert!(patch.lyrics.is_some());
    }

    #[tokio::test]
    async fn test_match_both_lookups_failed() {
        let mut api = MockMusicApi::with_tracks(vec![remote_track(10, "Song", &["Artist"])]);
        api.detail_error = Some(timeout());
        api.lyrics_error = Some(timeout());

        let result = match_metadata(&api, "Song", "Artist").await;
        assert!(matches!(result, Err(NetworkError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_automatic_mode_is_silent() {
        let song = mock_local_song("Song");

        let api = MockMusicApi::failing(timeout());
        assert!(enrich(&api, &song, MatchMode::Automatic).await.unwrap().is_none());

        let api = MockMusicApi::empty();
        assert!(enrich(&api, &song, MatchMode::Automatic).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_requested_mode_surfaces_failures() {
        let song = mock_local_song("Song");

        let api = MockMusicApi::failing(timeout());
        let err = enrich(&api, &song, MatchMode::Requested).await.unwrap_err();
        assert!(err.is_network());

        let api = MockMusicApi::empty();
        let err = enrich(&api, &song, MatchMode::Requested).await.unwrap_err();
        assert!(matches!(err, Error::NoMatch { .. }));
    }

    #[test]
    fn test_needs_enrichment() {
        let mut song = mock_local_song("Song");
        assert!(needs_enrichment(&song));

        song.remote_cover_url = Some("https://img.example.com/1.jpg".to_string());
        assert!(needs_enrichment(&song));

        song.lyrics = Some("[00:01.00]Hi".to_string());
        assert!(!needs_enrichment(&song));

        let mut live = mock_local_song("Station");
        live.is_live = true;
        assert!(!needs_enrichment(&live));
    }

    #[tokio::test]
    async fn test_search_filters_unplayable_and_truncates() {
        let tracks = (1..=6)
            .map(|id| remote_track(id, &format!("Song {id}"), &["A", "B"]))
            .collect();
        let api = Arc::new(
            MockMusicApi::with_tracks(tracks)
                .url(2, "http://m7.example.com/2.mp3")
                .url(3, "http://m7.example.com/3.mp3")
                .url(5, "http://m7.example.com/5.mp3"),
        );
        let service = SearchService::new(api.clone());

        let liked: HashSet<SongId> = [SongId::netease(3)].into_iter().collect();
        let songs = service.search("song", 1, 2, &liked).await.unwrap();

        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].id, SongId::netease(2));
        assert_eq!(songs[1].id, SongId::netease(3));
        assert!(!songs[0].liked);
        assert!(songs[1].liked);
        assert_eq!(songs[0].artist, "A, B");
        assert_eq!(songs[0].duration, 200.0);
        assert_eq!(
            songs[0].source,
            SongSource::Url("http://m7.example.com/2.mp3".to_string())
        );

        // One batched URL lookup for all six candidates
        assert_eq!(
            *api.url_batches.lock().unwrap(),
            vec![vec![1u64, 2, 3, 4, 5, 6]]
        );
        assert_eq!(api.searches.lock().unwrap()[0], ("song".to_string(), 6, 0));
    }

    #[tokio::test]
    async fn test_search_page_offset() {
        let api = Arc::new(MockMusicApi::empty());
        let service = SearchService::new(api.clone());

        let songs = service.search("song", 3, 10, &HashSet::new()).await.unwrap();
        assert!(songs.is_empty());
        assert_eq!(api.searches.lock().unwrap()[0], ("song".to_string(), 30, 60));
        // Nothing to check playability for
        assert!(api.url_batches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_network_error_propagates() {
        let service = SearchService::new(Arc::new(MockMusicApi::failing(timeout())));
        let result = service.search("song", 1, 10, &HashSet::new()).await;
        assert!(matches!(result, Err(NetworkError::Timeout { .. })));
    }

    #[tokio::test]
    async fn test_play_url() {
        let api = Arc::new(MockMusicApi::empty().url(7, "http://m7.example.com/7.mp3"));
        let service = SearchService::new(api);
        assert_eq!(
            service.play_url(7).await.unwrap().as_deref(),
            Some("http://m7.example.com/7.mp3")
        );
        assert!(service.play_url(8).await.unwrap().is_none());
    }

    #[test]
    fn test_track_to_song_defaults() {
        let track = RemoteTrack {
            id: 1,
            name: "Untitled".to_string(),
            artists: vec![],
            album: None,
            cover_url: None,
            duration_ms: None,
        };
        let song = track_to_song(track, SongSource::Unresolved);
        assert_eq!(song.artist, "Unknown");
        assert_eq!(song.album, "Unknown Album");
        assert_eq!(song.duration, 0.0);
        assert_eq!(song.id.as_str(), "netease:1");
    }
}

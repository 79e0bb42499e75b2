//! Internal domain models for remote lookups.
//!
//! These types are OUR types - they don't change when the music service or
//! the radio directory change their responses. DTOs are converted into these
//! via the adapters.

/// A candidate track returned by a keyword search.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteTrack {
    /// Provider track id
    pub id: u64,
    pub name: String,
    /// Credited artist names, in provider order
    pub artists: Vec<String>,
    pub album: Option<String>,
    pub cover_url: Option<String>,
    /// Milliseconds, if the provider reported it
    pub duration_ms: Option<u64>,
}

impl RemoteTrack {
    /// Artists joined for display, or "Unknown".
    pub fn artist_line(&self) -> String {
        if self.artists.is_empty() {
            "Unknown".to_string()
        } else {
            self.artists.join(", ")
        }
    }
}

/// Per-track detail lookup result.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackDetail {
    pub id: u64,
    /// Album art URL
    pub album_cover_url: Option<String>,
}

/// Time-coded lyric blocks for one track. Empty strings mean "none".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LyricsPair {
    pub original: String,
    pub translation: String,
}

/// A region (state/province) in the radio directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region {
    pub name: String,
    pub station_count: u32,
}

/// A live station from the radio directory.
#[derive(Debug, Clone, PartialEq)]
pub struct Station {
    pub uuid: String,
    pub name: String,
    pub region: Option<String>,
    pub favicon: Option<String>,
    /// Stream URL after the directory resolved playlists/redirects
    pub stream_url: String,
    pub click_count: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artist_line() {
        let mut track = RemoteTrack {
            id: 1,
            name: "Song".to_string(),
            artists: vec!["A".to_string(), "B".to_string()],
            album: None,
            cover_url: None,
            duration_ms: None,
        };
        assert_eq!(track.artist_line(), "A, B");

        track.artists.clear();
        assert_eq!(track.artist_line(), "Unknown");
    }
}

//! Music service Data Transfer Objects
//!
//! These types match what the upstream API returns through the proxy.
//! DO NOT use these types outside the netease module - convert to domain types.
//!
//! Endpoints used:
//! - `/api/search/get/web` -> [`SearchResponse`]
//! - `/api/song/enhance/player/url` -> [`SongUrlResponse`]
//! - `/api/song/detail/` -> [`SongDetailResponse`]
//! - `/api/song/lyric` -> [`LyricResponse`]
//!
//! Example search response:
//! ```json
//! {
//!   "result": {
//!     "songs": [{
//!       "id": 186016,
//!       "name": "Song Title",
//!       "artists": [{"id": 6452, "name": "Artist"}],
//!       "album": {"id": 18905, "name": "Album", "picUrl": "http://p1.music.126.net/x.jpg"},
//!       "duration": 269000
//!     }],
//!     "songCount": 1
//!   },
//!   "code": 200
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Keyword search response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchResponse {
    pub result: Option<SearchResult>,
    pub code: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    #[serde(default)]
    pub songs: Vec<Song>,
    pub song_count: Option<u32>,
}

/// Track as returned by search and detail endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Song {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    pub album: Option<Album>,
    /// Milliseconds
    pub duration: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Artist {
    pub id: Option<u64>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: Option<u64>,
    pub name: Option<String>,
    pub pic_url: Option<String>,
}

/// Playable URL lookup response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SongUrlResponse {
    #[serde(default)]
    pub data: Vec<SongUrl>,
    pub code: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SongUrl {
    pub id: u64,
    /// Absent for restricted or unavailable tracks
    pub url: Option<String>,
    pub br: Option<u32>,
}

/// Detail lookup response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SongDetailResponse {
    #[serde(default)]
    pub songs: Vec<Song>,
    pub code: Option<i32>,
}

/// Lyric lookup response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LyricResponse {
    /// Original lyrics
    pub lrc: Option<LyricBlock>,
    /// Translated lyrics
    pub tlyric: Option<LyricBlock>,
    pub code: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LyricBlock {
    pub lyric: Option<String>,
}

/// Error body the forwarding proxy sends when it can't reach upstream
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProxyErrorBody {
    pub error: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub target: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search_response() {
        let json = r#"{
            "result": {
                "songs": [{
                    "id": 186016,
                    "name": "Song Title",
                    "artists": [{"id": 6452, "name": "Artist", "img1v1Url": "ignored"}],
                    "album": {"id": 18905, "name": "Album", "picUrl": "http://p1.music.126.net/x.jpg"},
                    "duration": 269000,
                    "fee": 8
                }],
                "songCount": 1
            },
            "code": 200
        }"#;

        let response: SearchResponse = serde_json::from_str(json).unwrap();
        let songs = response.result.unwrap().songs;
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].artists[0].name, "Artist");
        assert_eq!(
            songs[0].album.as_ref().unwrap().pic_url.as_deref(),
            Some("http://p1.music.126.net/x.jpg")
        );
    }

    #[test]
    fn test_parse_empty_search_result() {
        let response: SearchResponse = serde_json::from_str(r#"{"result": {}, "code": 200}"#).unwrap();
        assert!(response.result.unwrap().songs.is_empty());

        let response: SearchResponse = serde_json::from_str(r#"{"code": 400}"#).unwrap();
        assert!(response.result.is_none());
    }

    #[test]
    fn test_parse_url_response_with_missing_url() {
        let json = r#"{"data": [{"id": 1, "url": null, "br": 0}, {"id": 2, "url": "http://m7.music.126.net/a.mp3", "br": 320000}], "code": 200}"#;
        let response: SongUrlResponse = serde_json::from_str(json).unwrap();
        assert!(response.data[0].url.is_none());
        assert_eq!(response.data[1].br, Some(320000));
    }

    #[test]
    fn test_parse_lyric_response_without_translation() {
        let json = r#"{"lrc": {"version": 3, "lyric": "[00:01.50]Hello"}, "code": 200}"#;
        let response: LyricResponse = serde_json::from_str(json).unwrap();
        assert_eq!(
            response.lrc.unwrap().lyric.as_deref(),
            Some("[00:01.50]Hello")
        );
        assert!(response.tlyric.is_none());
    }

    #[test]
    fn test_parse_proxy_error_body() {
        let json = r#"{"error": "Proxy Error", "message": "timeout of 0ms exceeded", "target": "http://music.163.com/api/song/lyric"}"#;
        let body: ProxyErrorBody = serde_json::from_str(json).unwrap();
        assert_eq!(body.error, "Proxy Error");
        assert!(body.target.ends_with("/api/song/lyric"));
    }
}

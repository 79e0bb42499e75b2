//! Core data models shared by the library, the player and the remote lookups.
//!
//! A [`Song`] is either persisted (imported from disk, or liked from a search)
//! or transient (a search result or radio station in a queue). Its [`SongId`]
//! carries the namespace it came from so ids never collide across sources:
//!
//! - `local:<n>` - assigned by the library store on import
//! - `netease:<n>` - assigned by the remote music service
//! - `station:<uuid>` - assigned by the radio directory

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Stable song identifier, unique within whichever collection holds it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(String);

impl SongId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Id for a song from the remote music service.
    pub fn netease(id: u64) -> Self {
        Self(format!("netease:{id}"))
    }

    /// Id for a radio station.
    pub fn station(uuid: &str) -> Self {
        Self(format!("station:{uuid}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Provider id if this song came from the remote music service.
    pub fn netease_id(&self) -> Option<u64> {
        self.0.strip_prefix("netease:")?.parse().ok()
    }

    pub fn is_local(&self) -> bool {
        self.0.starts_with("local:")
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0)
    }
}

impl From<&str> for SongId {
    fn from(raw: &str) -> Self {
        Self(raw.to_string())
    }
}

/// Where the audio for a song comes from. Exactly one per song.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SongSource {
    /// File in the local library
    LocalFile(PathBuf),
    /// Direct URL (search result or live stream)
    Url(String),
    /// Remote song whose playable URL has not been looked up yet
    Unresolved,
}

/// A song in the library, a queue, or a search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Seconds; 0 for live streams
    pub duration: f64,
    pub source: SongSource,
    pub remote_cover_url: Option<String>,
    /// Raw time-coded lyric text
    pub lyrics: Option<String>,
    pub liked: bool,
    /// Live radio stream
    pub is_live: bool,
}

impl Song {
    /// A song with only descriptive fields filled in.
    pub fn new(
        id: SongId,
        title: impl Into<String>,
        artist: impl Into<String>,
        album: impl Into<String>,
        source: SongSource,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            artist: artist.into(),
            album: album.into(),
            duration: 0.0,
            source,
            remote_cover_url: None,
            lyrics: None,
            liked: false,
            is_live: false,
        }
    }

    /// Merge the fields a metadata lookup actually found.
    pub fn apply_patch(&mut self, patch: &MetadataPatch) {
        if let Some(ref url) = patch.remote_cover_url {
            self.remote_cover_url = Some(url.clone());
        }
        if let Some(ref lyrics) = patch.lyrics {
            self.lyrics = Some(lyrics.clone());
        }
    }
}

/// Enrichment fields found by a remote match. Absent means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataPatch {
    pub remote_cover_url: Option<String>,
    pub lyrics: Option<String>,
}

impl MetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.remote_cover_url.is_none() && self.lyrics.is_none()
    }
}

/// Fields an update-by-id may change on a stored song.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SongUpdate {
    pub liked: Option<bool>,
    pub remote_cover_url: Option<String>,
    pub lyrics: Option<String>,
}

impl SongUpdate {
    pub fn liked(liked: bool) -> Self {
        Self {
            liked: Some(liked),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.liked.is_none() && self.remote_cover_url.is_none() && self.lyrics.is_none()
    }
}

impl From<&MetadataPatch> for SongUpdate {
    fn from(patch: &MetadataPatch) -> Self {
        Self {
            liked: None,
            remote_cover_url: patch.remote_cover_url.clone(),
            lyrics: patch.lyrics.clone(),
        }
    }
}

//! Audio file tag reading for library import.
//!
//! Uses the lofty crate for format-independent metadata access. Only the
//! descriptive fields a [`Song`] needs are read; cover art stays in the file.

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::Accessor;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::{Song, SongId, SongSource};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Descriptive tags read from one file.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Seconds
    pub duration: f64,
}

/// File name used when a tag is missing or unreadable.
fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn read(path: &Path) -> Result<TrackMetadata> {
    let tagged_file = Probe::open(path)
        .map_err(|e| Error::metadata(path, format!("failed to open for probing: {e}")))?
        .read()
        .map_err(|e| Error::metadata(path, format!("failed to read tags: {e}")))?;

    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    let title = tag
        .and_then(|t| t.title().map(|s| s.to_string()))
        .unwrap_or_else(|| file_name(path));

    let artist = tag
        .and_then(|t| t.artist().map(|s| s.to_string()))
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

    let album = tag
        .and_then(|t| t.album().map(|s| s.to_string()))
        .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

    let duration = tagged_file.properties().duration().as_secs_f64();

    Ok(TrackMetadata {
        title,
        artist,
        album,
        duration,
    })
}

/// Build an unsaved library song for `path`.
///
/// Files whose tags can't be parsed are still imported under their file name.
pub fn song_from_file(path: &Path) -> Song {
    let meta = match read(path) {
        Ok(meta) => meta,
        Err(e) => {
            tracing::warn!("{}", e);
            TrackMetadata {
                title: file_name(path),
                artist: "Unknown".to_string(),
                album: "Unknown".to_string(),
                duration: 0.0,
            }
        }
    };

    let mut song = Song::new(
        // Replaced by the library store on insert
        SongId::new("local:new"),
        meta.title,
        meta.artist,
        meta.album,
        SongSource::LocalFile(path.to_path_buf()),
    );
    song.duration = meta.duration;
    song
}

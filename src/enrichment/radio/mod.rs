//! Internet radio directory.
//!
//! Lists the regions of a country and the live stations in a region, and
//! turns a station into a playable live [`Song`].

mod adapter;
mod client;
pub mod dto;

pub use client::RadioBrowserClient;

use crate::enrichment::domain::Station;
use crate::model::{Song, SongId, SongSource};

/// Album shown for every live station.
pub const LIVE_ALBUM: &str = "Live Radio";

/// Live song for a station. `fallback_artist` stands in when the station
/// has no region.
pub fn station_song(station: &Station, fallback_artist: &str) -> Song {
    let artist = station
        .region
        .clone()
        .unwrap_or_else(|| fallback_artist.to_string());

    let mut song = Song::new(
        SongId::station(&station.uuid),
        station.name.clone(),
        artist,
        LIVE_ALBUM,
        SongSource::Url(station.stream_url.clone()),
    );
    song.remote_cover_url = station.favicon.clone();
    song.is_live = true;
    song
}

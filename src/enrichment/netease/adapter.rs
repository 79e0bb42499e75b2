//! Adapter layer: convert music service DTOs to domain models
//!
//! This is the ONLY place where DTO types are converted to domain types.

use std::collections::HashMap;

use super::dto;
use crate::enrichment::domain::{LyricsPair, RemoteTrack, TrackDetail};

/// Convert a search response to candidate tracks, keeping provider order.
pub fn to_tracks(response: dto::SearchResponse) -> Vec<RemoteTrack> {
    response
        .result
        .map(|r| r.songs)
        .unwrap_or_default()
        .into_iter()
        .map(to_track)
        .collect()
}

fn to_track(song: dto::Song) -> RemoteTrack {
    let (album, cover_url) = match song.album {
        Some(album) => (album.name, album.pic_url),
        None => (None, None),
    };

    RemoteTrack {
        id: song.id,
        name: song.name,
        artists: song
            .artists
            .into_iter()
            .map(|a| a.name)
            .filter(|name| !name.is_empty())
            .collect(),
        album,
        cover_url,
        duration_ms: song.duration,
    }
}

/// Map track ids to playable URLs, dropping tracks without one.
pub fn to_url_map(response: dto::SongUrlResponse) -> HashMap<u64, String> {
    response
        .data
        .into_iter()
        .filter_map(|item| match item.url {
            Some(url) if !url.is_empty() => Some((item.id, url)),
            _ => None,
        })
        .collect()
}

/// First song of a detail response.
pub fn to_detail(response: dto::SongDetailResponse) -> Option<TrackDetail> {
    response.songs.into_iter().next().map(|song| TrackDetail {
        id: song.id,
        album_cover_url: song.album.and_then(|a| a.pic_url),
    })
}

pub fn to_lyrics(response: dto::LyricResponse) -> LyricsPair {
    let block_text = |block: Option<dto::LyricBlock>| {
        block.and_then(|b| b.lyric).unwrap_or_default()
    };

    LyricsPair {
        original: block_text(response.lrc),
        translation: block_text(response.tlyric),
    }
}

//! Trait definitions for external API clients.
//!
//! These traits enable dependency injection and mocking for tests.
//! Production code uses the real client implementations, while tests
//! can substitute mock implementations.
//!
//! # Example
//!
//! ```ignore
//! use tunebridge::enrichment::traits::MusicApi;
//!
//! // In production code:
//! async fn first_hit(api: &dyn MusicApi, query: &str) -> Option<RemoteTrack> {
//!     api.search(query, 1, 0).await.ok()?.into_iter().next()
//! }
//!
//! // In tests:
//! let api = MockMusicApi::with_tracks(vec![...]);
//! ```

use std::collections::HashMap;

use async_trait::async_trait;

use super::domain::{LyricsPair, Region, RemoteTrack, Station, TrackDetail};
use crate::error::NetworkError;

/// Remote music service lookups.
///
/// Implement this trait to create mock implementations for testing.
#[async_trait]
pub trait MusicApi: Send + Sync {
    /// Keyword search, in provider order.
    async fn search(
        &self,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RemoteTrack>, NetworkError>;

    /// Playable URLs for a batch of track ids. Unplayable ids are absent.
    async fn song_urls(&self, ids: &[u64]) -> Result<HashMap<u64, String>, NetworkError>;

    /// Per-track detail (album art).
    async fn song_detail(&self, id: u64) -> Result<Option<TrackDetail>, NetworkError>;

    /// Time-coded lyric text.
    async fn lyrics(&self, id: u64) -> Result<LyricsPair, NetworkError>;
}

/// Internet radio directory lookups.
#[async_trait]
pub trait RadioApi: Send + Sync {
    async fn regions(&self, country: &str) -> Result<Vec<Region>, NetworkError>;

    async fn stations(
        &self,
        country_code: &str,
        region: &str,
        limit: u32,
    ) -> Result<Vec<Station>, NetworkError>;
}

// Implement traits for real clients

#[async_trait]
impl MusicApi for super::netease::NeteaseClient {
    async fn search(
        &self,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RemoteTrack>, NetworkError> {
        self.search(query, limit, offset).await
    }

    async fn song_urls(&self, ids: &[u64]) -> Result<HashMap<u64, String>, NetworkError> {
        self.song_urls(ids).await
    }

    async fn song_detail(&self, id: u64) -> Result<Option<TrackDetail>, NetworkError> {
        self.song_detail(id).await
    }

    async fn lyrics(&self, id: u64) -> Result<LyricsPair, NetworkError> {
        self.lyrics(id).await
    }
}

#[async_trait]
impl RadioApi for super::radio::RadioBrowserClient {
    async fn regions(&self, country: &str) -> Result<Vec<Region>, NetworkError> {
        self.regions(country).await
    }

    async fn stations(
        &self,
        country_code: &str,
        region: &str,
        limit: u32,
    ) -> Result<Vec<Station>, NetworkError> {
        self.stations(country_code, region, limit).await
    }
}

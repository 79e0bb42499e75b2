//! Remote lookups and metadata enrichment.
//!
//! # Architecture
//!
//! This module follows a clean separation between:
//! - **Domain models** (`domain.rs`) - Internal types that represent our business logic
//! - **API DTOs** (`netease/dto.rs`, `radio/dto.rs`) - Exact API response shapes
//! - **Adapters** - Convert DTOs to domain models
//! - **Clients** - HTTP clients for the music service proxy and the radio directory
//! - **Traits** (`traits.rs`) - Seams for injecting mock clients in tests
//! - **Service** - Metadata matching and playable search
//! - **Lyrics** - Time-coded lyric parsing
//!
//! # Usage
//!
//! ```ignore
//! use enrichment::{match_metadata, NeteaseClient};
//!
//! let client = NeteaseClient::new(&config.proxy)?;
//! if let Some(patch) = match_metadata(&client, "Song", "Artist").await? {
//!     println!("cover: {:?}", patch.remote_cover_url);
//! }
//! ```

pub mod domain;
pub mod lyrics;
pub mod netease;
pub mod radio;
pub mod service;
pub mod traits;

pub use lyrics::{LyricLine, active_line, parse_lyrics};
pub use netease::NeteaseClient;
pub use radio::RadioBrowserClient;
pub use service::{MatchMode, SearchService, enrich, match_metadata, needs_enrichment};
pub use traits::{MusicApi, RadioApi};

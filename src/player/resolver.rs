//! Source resolution - turns a song into a URL the backend can play.

use std::path::{Component, Path};
use std::sync::Arc;

use async_trait::async_trait;

use crate::enrichment::traits::MusicApi;
use crate::error::ResolutionError;
use crate::model::{Song, SongSource};

/// Produces a playable URL for a song.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    async fn resolve(&self, song: &Song) -> Result<String, ResolutionError>;
}

/// Resolver for every source kind the library and search produce.
///
/// - Local files must still be readable and become `file://` URLs
/// - Direct URLs pass through
/// - Unresolved remote songs are looked up when a music API is available
#[derive(Default)]
pub struct DefaultResolver {
    api: Option<Arc<dyn MusicApi>>,
}

impl DefaultResolver {
    pub fn new(api: Option<Arc<dyn MusicApi>>) -> Self {
        Self { api }
    }

    async fn resolve_remote(&self, song: &Song) -> Result<String, ResolutionError> {
        let missing = || ResolutionError::MissingUrl(song.id.to_string());

        let (Some(id), Some(api)) = (song.id.netease_id(), self.api.as_ref()) else {
            return Err(missing());
        };

        let mut urls = api
            .song_urls(&[id])
            .await
            .map_err(ResolutionError::Lookup)?;
        urls.remove(&id).ok_or_else(missing)
    }
}

#[async_trait]
impl SourceResolver for DefaultResolver {
    async fn resolve(&self, song: &Song) -> Result<String, ResolutionError> {
        match &song.source {
            SongSource::LocalFile(path) => {
                let unavailable = |source| ResolutionError::FileUnavailable {
                    path: path.clone(),
                    source,
                };
                tokio::fs::File::open(path).await.map_err(unavailable)?;
                let absolute = tokio::fs::canonicalize(path).await.map_err(unavailable)?;
                Ok(file_url(&absolute))
            }
            SongSource::Url(url) => Ok(url.clone()),
            SongSource::Unresolved => self.resolve_remote(song).await,
        }
    }
}

/// `file://` URL for an absolute path, each segment percent-encoded.
pub fn file_url(path: &Path) -> String {
    let segments: Vec<String> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => {
                Some(urlencoding::encode(&part.to_string_lossy()).into_owned())
            }
            _ => None,
        })
        .collect();
    format!("file:///{}", segments.join("/"))
}

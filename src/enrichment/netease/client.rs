//! Music service HTTP client
//!
//! Every request goes through the same-origin forwarding proxy, which adds
//! the referer/origin/region headers the upstream service insists on. The
//! proxy can be deployed two ways:
//!
//! - prefix routing: `{base_url}/api/search/get/web?s=...`
//! - a single handler: `{base_url}?path=/api/search/get/web&s=...`
//!
//! [`ProxyConfig::path_in_query`] picks the second form.
//!
//! All requests share one bounded timeout; expiry surfaces as
//! [`NetworkError::Timeout`].

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use super::{adapter, dto};
use crate::config::ProxyConfig;
use crate::enrichment::domain::{LyricsPair, RemoteTrack, TrackDetail};
use crate::error::NetworkError;

const SEARCH_PATH: &str = "/api/search/get/web";
const SONG_URL_PATH: &str = "/api/song/enhance/player/url";
const DETAIL_PATH: &str = "/api/song/detail/";
const LYRIC_PATH: &str = "/api/song/lyric";

/// Music service client
pub struct NeteaseClient {
    http_client: reqwest::Client,
    base_url: String,
    bitrate: u32,
    path_in_query: bool,
}

impl NeteaseClient {
    /// Create a client for the configured proxy.
    pub fn new(config: &ProxyConfig) -> Result<Self, NetworkError> {
        let http_client = reqwest::Client::builder()
            .gzip(true)
            .timeout(config.timeout())
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .build()
            .map_err(|e| NetworkError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bitrate: config.bitrate,
            path_in_query: config.path_in_query,
        })
    }

    /// Keyword search, in provider order.
    pub async fn search(
        &self,
        query: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<RemoteTrack>, NetworkError> {
        let response: dto::SearchResponse = self
            .get_json(
                SEARCH_PATH,
                &[
                    ("s", query.to_string()),
                    ("type", "1".to_string()),
                    ("limit", limit.to_string()),
                    ("offset", offset.to_string()),
                    ("total", "true".to_string()),
                ],
            )
            .await?;
        Ok(adapter::to_tracks(response))
    }

    /// Playable URLs for a batch of tracks at the configured bitrate.
    ///
    /// Tracks without a URL are left out of the map.
    pub async fn song_urls(&self, ids: &[u64]) -> Result<HashMap<u64, String>, NetworkError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let response: dto::SongUrlResponse = self
            .get_json(
                SONG_URL_PATH,
                &[("ids", id_list(ids)), ("br", self.bitrate.to_string())],
            )
            .await?;
        Ok(adapter::to_url_map(response))
    }

    pub async fn song_detail(&self, id: u64) -> Result<Option<TrackDetail>, NetworkError> {
        let response: dto::SongDetailResponse = self
            .get_json(
                DETAIL_PATH,
                &[("id", id.to_string()), ("ids", id_list(&[id]))],
            )
            .await?;
        Ok(adapter::to_detail(response))
    }

    /// Original and translated time-coded lyrics.
    pub async fn lyrics(&self, id: u64) -> Result<LyricsPair, NetworkError> {
        let response: dto::LyricResponse = self
            .get_json(
                LYRIC_PATH,
                &[
                    ("os", "pc".to_string()),
                    ("id", id.to_string()),
                    ("lv", "-1".to_string()),
                    ("kv", "-1".to_string()),
                    ("tv", "-1".to_string()),
                ],
            )
            .await?;
        Ok(adapter::to_lyrics(response))
    }

    /// URL and query pairs for an upstream path.
    fn request_target(&self, path: &str, query: &[(&str, String)]) -> (String, Vec<(String, String)>) {
        let mut params: Vec<(String, String)> = Vec::with_capacity(query.len() + 1);
        let url = if self.path_in_query {
            params.push(("path".to_string(), path.to_string()));
            self.base_url.clone()
        } else {
            format!("{}{}", self.base_url, path)
        };
        params.extend(query.iter().map(|(k, v)| (k.to_string(), v.clone())));
        (url, params)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, NetworkError> {
        let (url, params) = self.request_target(path, query);

        let response = self
            .http_client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| NetworkError::from_reqwest(e, &url))?;

        let status = response.status();
        if !status.is_success() {
            // The proxy reports its own transport failures as JSON
            if let Ok(body) = response.json::<dto::ProxyErrorBody>().await {
                return Err(NetworkError::Proxy {
                    error: body.error,
                    message: body.message,
                    target: body.target,
                });
            }
            return Err(NetworkError::Status {
                status: status.as_u16(),
                url,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| NetworkError::from_reqwest(e, &url))
    }
}

/// `[1,2,3]` - the id list form the upstream API expects.
fn id_list(ids: &[u64]) -> String {
    let joined = ids
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",");
    format!("[{joined}]")
}

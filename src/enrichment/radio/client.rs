//! Radio directory HTTP client (radio-browser).

use serde::de::DeserializeOwned;

use super::{adapter, dto};
use crate::config::RadioConfig;
use crate::enrichment::domain::{Region, Station};
use crate::error::NetworkError;

/// Radio directory client
pub struct RadioBrowserClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl RadioBrowserClient {
    pub fn new(config: &RadioConfig, timeout: std::time::Duration) -> Result<Self, NetworkError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
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
        })
    }

    /// Regions of a country, blank names removed, sorted by name.
    pub async fn regions(&self, country: &str) -> Result<Vec<Region>, NetworkError> {
        let url = format!(
            "{}/json/states/{}",
            self.base_url,
            urlencoding::encode(country)
        );
        let entries: Vec<dto::StateEntry> = self.get_json(&url, &[]).await?;
        Ok(adapter::to_regions(entries))
    }

    /// Most-clicked stations of a region first.
    pub async fn stations(
        &self,
        country_code: &str,
        region: &str,
        limit: u32,
    ) -> Result<Vec<Station>, NetworkError> {
        let url = format!("{}/json/stations/search", self.base_url);
        let entries: Vec<dto::StationEntry> = self
            .get_json(
                &url,
                &[
                    ("limit", limit.to_string()),
                    ("countrycode", country_code.to_string()),
                    ("state", region.to_string()),
                    ("order", "clickcount".to_string()),
                    ("reverse", "true".to_string()),
                ],
            )
            .await?;
        Ok(adapter::to_stations(entries))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, NetworkError> {
        let response = self
            .http_client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| NetworkError::from_reqwest(e, url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| NetworkError::from_reqwest(e, url))
    }
}

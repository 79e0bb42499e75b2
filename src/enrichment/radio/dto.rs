//! Radio directory Data Transfer Objects
//!
//! Field names follow the directory's flat lowercase JSON.
//! DO NOT use these types outside the radio module - convert to domain types.
//!
//! Example station:
//! ```json
//! {
//!   "stationuuid": "9617a958-0601-11e8-ae97-52543be04c81",
//!   "name": "Beijing Music Radio",
//!   "url": "http://example.com/listen.pls",
//!   "url_resolved": "http://example.com/live.mp3",
//!   "favicon": "http://example.com/logo.png",
//!   "state": "Beijing",
//!   "clickcount": 812
//! }
//! ```

use serde::{Deserialize, Serialize};

/// Entry of `/json/states/{country}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StateEntry {
    #[serde(default)]
    pub name: String,
    pub country: Option<String>,
    #[serde(default)]
    pub stationcount: u32,
}

/// Entry of `/json/stations/search`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StationEntry {
    pub stationuuid: String,
    #[serde(default)]
    pub name: String,
    pub url: Option<String>,
    pub url_resolved: Option<String>,
    pub favicon: Option<String>,
    pub state: Option<String>,
    #[serde(default)]
    pub clickcount: u32,
}

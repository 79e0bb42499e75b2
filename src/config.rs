//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\tunebridge\config.toml
//! - macOS: ~/Library/Application Support/tunebridge/config.toml
//! - Linux: ~/.config/tunebridge/config.toml
//!
//! Every section is optional in the file; missing keys fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Forwarding proxy for the music service
    pub proxy: ProxyConfig,

    /// Internet radio directory
    pub radio: RadioConfig,

    /// Library storage and enrichment
    pub library: LibraryConfig,

    /// Playback defaults
    pub playback: PlaybackConfig,
}

/// Forwarding proxy settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Base URL the upstream API paths are appended to
    pub base_url: String,

    /// Bounded wait for every proxied request
    pub timeout_secs: u64,

    /// Requested bitrate for playable URL lookups
    pub bitrate: u32,

    /// Send the upstream path as a `path` query parameter to a single
    /// handler instead of appending it to `base_url`
    pub path_in_query: bool,
}

impl ProxyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/netease".to_string(),
            timeout_secs: 15,
            bitrate: 320_000,
            path_in_query: false,
        }
    }
}

/// Radio directory settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioConfig {
    pub base_url: String,

    /// Country name used for the region listing
    pub country: String,

    /// ISO country code used for the station search
    pub country_code: String,

    /// Region selected when none is given
    pub default_region: String,

    /// Maximum stations returned per region
    pub station_limit: u32,
}

impl Default for RadioConfig {
    fn default() -> Self {
        Self {
            base_url: "https://de1.api.radio-browser.info".to_string(),
            country: "China".to_string(),
            country_code: "CN".to_string(),
            default_region: "Beijing".to_string(),
            station_limit: 100,
        }
    }
}

/// Library settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Database file (defaults to the data directory)
    pub db_path: Option<PathBuf>,

    /// Silently look up cover art and lyrics for songs missing them
    pub auto_match: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            auto_match: true,
        }
    }
}

/// Playback settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Last volume level (0.0 - 1.0)
    pub volume: f32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { volume: 1.0 }
    }
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tunebridge"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Resolve the library database path, honoring the config override.
pub fn db_path(config: &Config) -> PathBuf {
    if let Some(ref path) = config.library.db_path {
        return path.clone();
    }
    dirs::data_dir()
        .map(|d| d.join("tunebridge").join(crate::db::DEFAULT_DB_NAME))
        .unwrap_or_else(|| PathBuf::from(crate::db::DEFAULT_DB_NAME))
}

/// Load configuration from disk
///
/// Returns default config if file doesn't exist or can't be parsed.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };

    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to disk
///
/// Creates the config directory if it doesn't exist.
pub fn save(config: &Config) -> Result<PathBuf, ConfigError> {
    let dir = config_dir().ok_or(ConfigError::NoConfigDir)?;
    let path = dir.join("config.toml");

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::CreateDir(dir.clone(), e))?;

    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write to temp, then rename
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, &path)
        .map_err(|e| ConfigError::Rename(temp_path, path.clone(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(path)
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

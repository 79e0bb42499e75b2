//! Application-wide error types.
//!
//! Library modules return one of the specific error kinds below so callers
//! can decide what to surface and what to contain. The CLI uses `anyhow`
//! on top of these for convenient propagation.
//!
//! # Kinds
//!
//! - [`ResolutionError`]: no playable source could be obtained for a song
//! - [`NetworkError`]: timeout or transport failure reaching the proxy or radio directory
//! - [`PersistenceError`]: a durable library store operation failed
//! - [`PlaybackBackendError`]: audio output or streaming failed beyond recovery
//!
//! [`Error`] aggregates all of them for code that just wants to propagate.

use std::path::PathBuf;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level application error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Playback error: {0}")]
    PlaybackBackend(#[from] PlaybackBackendError),

    /// Explicit match request found nothing usable
    #[error("No match found for \"{query}\"")]
    NoMatch { query: String },

    /// Song id not present in the library or queue
    #[error("Song not found: {0}")]
    SongNotFound(String),

    #[error("Metadata error for {path}: {message}")]
    Metadata { path: PathBuf, message: String },
}

impl Error {
    /// Create a metadata error.
    pub fn metadata(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Metadata {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Whether this error is a failure to reach a remote service.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

/// No playable source could be obtained for a song.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// Remote song without a known URL
    #[error("no playable URL for song {0}")]
    MissingUrl(String),

    /// Local file is gone or no longer readable
    #[error("cannot open {path}: {source}")]
    FileUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Looking up the play URL of a remote song failed
    #[error("play URL lookup failed: {0}")]
    Lookup(#[source] NetworkError),
}

/// Failure reaching the forwarding proxy or another remote service.
#[derive(Debug, Clone, thiserror::Error)]
pub enum NetworkError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("failed to decode response: {0}")]
    Decode(String),

    /// The proxy answered with its own `{error, message, target}` body
    #[error("{error}: {message} (target {target})")]
    Proxy {
        error: String,
        message: String,
        target: String,
    },
}

impl NetworkError {
    /// Classify a reqwest failure.
    pub fn from_reqwest(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                url: url.to_string(),
            }
        } else if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// A durable library store operation failed.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("library store unavailable: {0}")]
    Unavailable(String),
}

/// An audio backend or streaming session failed beyond recovery.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlaybackBackendError {
    #[error("fatal streaming error: {0}")]
    Fatal(String),

    #[error("could not attach stream: {0}")]
    Attach(String),

    /// No usable output device or stream
    #[error("audio output unavailable: {0}")]
    Output(String),

    /// The source could not be opened or decoded
    #[error("cannot decode source: {0}")]
    Decode(String),
}

//! Audio backend seams.
//!
//! The engine never talks to an output device directly. It drives an
//! [`AudioBackend`] (a media-element-like object that plays one source at a
//! time) and, for adaptive manifests the backend can't play natively, a
//! [`StreamingSession`] created by a [`StreamingFactory`].
//!
//! Backends report progress back as [`BackendEvent`]s; streaming sessions
//! report failures as [`StreamingError`]s. Both are fed to the engine by the
//! runtime.

use crate::error::PlaybackBackendError;

/// The backend refused to start playback (no user gesture yet, for example).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("play rejected: {0}")]
pub struct PlayRejected(pub String);

/// A single-source audio output.
pub trait AudioBackend: Send {
    /// Point the backend at a playable URL. Playback does not start.
    fn set_source(&mut self, url: &str);

    /// Drop the current source and stop producing sound.
    fn clear_source(&mut self);

    fn has_source(&self) -> bool;

    fn play(&mut self) -> Result<(), PlayRejected>;

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Current position in seconds.
    fn position(&self) -> f64;

    fn seek(&mut self, secs: f64);

    /// Volume level (0.0 - 1.0).
    fn set_volume(&mut self, volume: f32);

    /// Whether adaptive manifests can be assigned with `set_source` directly.
    fn supports_native_manifest(&self) -> bool;
}

/// Progress reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendEvent {
    /// Position advanced
    TimeUpdate,
    /// Source metadata loaded; seconds
    DurationKnown(f64),
    /// Reached the end of the source
    Ended,
}

/// Broad class of a streaming failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingErrorKind {
    Network,
    Media,
    Other,
}

/// Failure reported by a streaming session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamingError {
    pub kind: StreamingErrorKind,
    /// Non-fatal errors are handled inside the session
    pub fatal: bool,
    pub details: String,
}

/// An adaptive-streaming session attached to a backend.
pub trait StreamingSession: Send {
    /// Try to recover from a media decoding error in place.
    fn recover_media_error(&mut self);

    /// Detach from the backend and release everything.
    fn destroy(&mut self);
}

/// Creates streaming sessions for manifests the backend can't play itself.
pub trait StreamingFactory: Send {
    /// Load `url` and attach the resulting stream to `backend`.
    fn attach(
        &mut self,
        url: &str,
        backend: &mut dyn AudioBackend,
    ) -> Result<Box<dyn StreamingSession>, PlaybackBackendError>;
}

/// How a resolved URL is handed to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Through a streaming session
    Streaming,
    /// Manifest assigned directly; the backend handles it
    NativeManifest,
    /// Plain file or progressive stream
    Direct,
}

/// Whether `url` points at an adaptive manifest (`.m3u8`).
pub fn is_manifest_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.to_ascii_lowercase().ends_with(".m3u8")
}

/// Pick how to deliver `url` to a backend with the given manifest support.
pub fn choose_delivery(url: &str, native_manifest: bool) -> DeliveryMode {
    match (is_manifest_url(url), native_manifest) {
        (true, false) => DeliveryMode::Streaming,
        (true, true) => DeliveryMode::NativeManifest,
        (false, _) => DeliveryMode::Direct,
    }
}

/// In-memory backend and streaming doubles for tests.
#[cfg(test)]
pub mod mocks {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Everything a [`MockBackend`] was asked to do, shared with the test.
    #[derive(Debug, Default)]
    pub struct BackendLog {
        pub source: Option<String>,
        pub paused: bool,
        pub position: f64,
        pub volume: f32,
        pub seeks: Vec<f64>,
        pub plays: usize,
        pub pauses: usize,
        pub sources_set: Vec<String>,
        pub clears: usize,
        /// Reject every `play()` call
        pub reject_play: bool,
        pub native_manifest: bool,
    }

    /// Backend that records calls instead of producing sound.
    pub struct MockBackend {
        pub log: Arc<Mutex<BackendLog>>,
    }

    impl MockBackend {
        pub fn new() -> (Self, Arc<Mutex<BackendLog>>) {
            let log = Arc::new(Mutex::new(BackendLog {
                paused: true,
                volume: 1.0,
                ..Default::default()
            }));
            (
                Self {
                    log: Arc::clone(&log),
                },
                log,
            )
        }
    }

    impl AudioBackend for MockBackend {
        fn set_source(&mut self, url: &str) {
            let mut log = self.log.lock().unwrap();
            log.source = Some(url.to_string());
            log.sources_set.push(url.to_string());
            log.position = 0.0;
            log.paused = true;
        }

        fn clear_source(&mut self) {
            let mut log = self.log.lock().unwrap();
            log.source = None;
            log.clears += 1;
            log.paused = true;
        }

        fn has_source(&self) -> bool {
            self.log.lock().unwrap().source.is_some()
        }

        fn play(&mut self) -> Result<(), PlayRejected> {
            let mut log = self.log.lock().unwrap();
            log.plays += 1;
            if log.reject_play {
                return Err(PlayRejected("user gesture required".to_string()));
            }
            log.paused = false;
            Ok(())
        }

        fn pause(&mut self) {
            let mut log = self.log.lock().unwrap();
            log.pauses += 1;
            log.paused = true;
        }

        fn is_paused(&self) -> bool {
            self.log.lock().unwrap().paused
        }

        fn position(&self) -> f64 {
            self.log.lock().unwrap().position
        }

        fn seek(&mut self, secs: f64) {
            let mut log = self.log.lock().unwrap();
            log.seeks.push(secs);
            log.position = secs;
        }

        fn set_volume(&mut self, volume: f32) {
            self.log.lock().unwrap().volume = volume;
        }

        fn supports_native_manifest(&self) -> bool {
            self.log.lock().unwrap().native_manifest
        }
    }

    /// What the streaming doubles were asked to do.
    #[derive(Debug, Default)]
    pub struct StreamingLog {
        pub attached: Vec<String>,
        pub recoveries: usize,
        pub destroyed: usize,
        /// Fail the next `attach` with this message
        pub fail_attach: Option<String>,
    }

    pub struct MockStreamingFactory {
        pub log: Arc<Mutex<StreamingLog>>,
    }

    impl MockStreamingFactory {
        pub fn new() -> (Self, Arc<Mutex<StreamingLog>>) {
            let log = Arc::new(Mutex::new(StreamingLog::default()));
            (
                Self {
                    log: Arc::clone(&log),
                },
                log,
            )
        }
    }

    impl StreamingFactory for MockStreamingFactory {
        fn attach(
            &mut self,
            url: &str,
            backend: &mut dyn AudioBackend,
        ) -> Result<Box<dyn StreamingSession>, PlaybackBackendError> {
            let mut log = self.log.lock().unwrap();
            if let Some(message) = log.fail_attach.take() {
                return Err(PlaybackBackendError::Attach(message));
            }
            log.attached.push(url.to_string());
            // A real session feeds the backend through a generated source
            backend.set_source(&format!("blob:{url}"));
            Ok(Box::new(MockSession {
                log: Arc::clone(&self.log),
            }))
        }
    }

    struct MockSession {
        log: Arc<Mutex<StreamingLog>>,
    }

    impl StreamingSession for MockSession {
        fn recover_media_error(&mut self) {
            self.log.lock().unwrap().recoveries += 1;
        }

        fn destroy(&mut self) {
            self.log.lock().unwrap().destroyed += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_manifest_url() {
        assert!(is_manifest_url("https://live.example.com/stream/index.m3u8"));
        assert!(is_manifest_url("https://live.example.com/INDEX.M3U8?token=abc"));
        assert!(!is_manifest_url("https://m7.example.com/song.mp3"));
        assert!(!is_manifest_url("https://example.com/get?file=list.m3u8.mp3"));
        assert!(!is_manifest_url("https://example.com/play?format=.m3u8x"));
    }

    #[test]
    fn test_choose_delivery() {
        let manifest = "https://live.example.com/index.m3u8";
        assert_eq!(choose_delivery(manifest, false), DeliveryMode::Streaming);
        assert_eq!(choose_delivery(manifest, true), DeliveryMode::NativeManifest);
        assert_eq!(
            choose_delivery("file:///music/a.mp3", false),
            DeliveryMode::Direct
        );
    }
}

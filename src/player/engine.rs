//! Playback engine - binds the current song to one audio backend.
//!
//! # States
//!
//! ```text
//!            song changes                 resolved
//!   Idle ───────────────────► Loading ─────────────► Attached
//!    ▲                          │  ▲                    │
//!    │   resolution failed      │  └── song changes ────┘
//!    └──────────────────────────┘
//! ```
//!
//! Resolution is asynchronous and owned by the caller: a song change yields
//! a [`PendingLoad`], and the caller reports back through
//! [`PlaybackEngine::complete_load`]. Each load carries a generation so a
//! result for a song that is no longer current is discarded.
//!
//! Play/pause never triggers resolution; it only starts or stops the
//! attached source.

use super::backend::{
    AudioBackend, BackendEvent, DeliveryMode, StreamingError, StreamingErrorKind,
    StreamingFactory, StreamingSession, choose_delivery,
};
use super::state::{Action, Origin, PlayerState, StateChange};
use crate::error::{PlaybackBackendError, ResolutionError};
use crate::model::{Song, SongId};

/// A user seek is pushed to the backend only beyond this distance, so
/// position reports that round-trip through the store never cause a seek.
pub const SEEK_THRESHOLD_SECS: f64 = 1.0;

/// Where the engine is in binding the current song.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineState {
    /// No source attached
    Idle,
    /// Waiting for a source URL
    Loading { song_id: SongId, generation: u64 },
    /// Source attached; the backend plays or pauses it per the store
    Attached {
        song_id: SongId,
        url: String,
        mode: DeliveryMode,
    },
}

/// A song whose playable URL must be resolved before it can be attached.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingLoad {
    pub song: Song,
    pub generation: u64,
}

/// Drives an [`AudioBackend`] from player state changes.
pub struct PlaybackEngine<B: AudioBackend> {
    backend: B,
    streaming: Option<Box<dyn StreamingFactory>>,
    session: Option<Box<dyn StreamingSession>>,
    state: EngineState,
    generation: u64,
}

impl<B: AudioBackend> PlaybackEngine<B> {
    /// Create an engine. Without a streaming factory, manifests the backend
    /// can't play natively are assigned directly anyway.
    pub fn new(backend: B, streaming: Option<Box<dyn StreamingFactory>>) -> Self {
        Self {
            backend,
            streaming,
            session: None,
            state: EngineState::Idle,
            generation: 0,
        }
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Id of the song being loaded or attached.
    pub fn song_id(&self) -> Option<&SongId> {
        match &self.state {
            EngineState::Idle => None,
            EngineState::Loading { song_id, .. } | EngineState::Attached { song_id, .. } => {
                Some(song_id)
            }
        }
    }

    /// React to a batch of store changes.
    ///
    /// Returns a load to resolve when the current song changed identity, or
    /// when a source was lost and the song is played again.
    pub fn on_state_change(
        &mut self,
        state: &PlayerState,
        changes: &[StateChange],
    ) -> Option<PendingLoad> {
        let mut load = None;

        for change in changes {
            if self.state == EngineState::Idle && retries_load(change, state) {
                if let Some(pending) = self.sync_song(state) {
                    load = Some(pending);
                }
                continue;
            }
            match change {
                StateChange::CurrentSong => {
                    if let Some(pending) = self.sync_song(state) {
                        load = Some(pending);
                    }
                }
                StateChange::Playing => self.sync_playing(state.is_playing),
                StateChange::CurrentTime(Origin::User) => self.sync_seek(state.current_time),
                StateChange::Volume => self.backend.set_volume(state.volume),
                _ => {}
            }
        }

        load
    }

    /// Attach the resolved source for `load`, if it is still wanted.
    pub fn complete_load(
        &mut self,
        load: PendingLoad,
        result: Result<String, ResolutionError>,
        state: &PlayerState,
    ) {
        let current = matches!(
            &self.state,
            EngineState::Loading { song_id, generation }
                if *generation == load.generation && *song_id == load.song.id
        );
        if !current {
            tracing::debug!(
                "Discarding stale resolution for {} (generation {})",
                load.song.id,
                load.generation
            );
            return;
        }

        let url = match result {
            Ok(url) => url,
            Err(e) => {
                tracing::error!("Cannot play {}: {}", load.song.id, e);
                self.state = EngineState::Idle;
                return;
            }
        };

        let mode = choose_delivery(&url, self.backend.supports_native_manifest());
        let mode = self.attach(&url, mode);
        tracing::debug!("Attached {} ({:?})", load.song.id, mode);

        self.state = EngineState::Attached {
            song_id: load.song.id,
            url,
            mode,
        };
        self.backend.set_volume(state.volume);
        if state.is_playing {
            self.try_play();
        }
    }

    /// Translate a backend event into store actions.
    pub fn handle_backend_event(&mut self, event: BackendEvent) -> Vec<Action> {
        if !matches!(self.state, EngineState::Attached { .. }) {
            tracing::trace!("Ignoring {:?} without an attached source", event);
            return Vec::new();
        }

        match event {
            BackendEvent::TimeUpdate => {
                if self.backend.is_paused() {
                    Vec::new()
                } else {
                    vec![Action::SetCurrentTime {
                        secs: self.backend.position(),
                        origin: Origin::Backend,
                    }]
                }
            }
            BackendEvent::DurationKnown(secs) => vec![Action::SetDuration(secs)],
            BackendEvent::Ended => vec![Action::SetIsPlaying(false), Action::NextSong],
        }
    }

    /// Handle a failure reported by the streaming session.
    ///
    /// Network failures fall back to direct playback, media failures are
    /// recovered in place. Anything else detaches the source and is returned
    /// for the caller to report.
    pub fn handle_streaming_error(
        &mut self,
        error: StreamingError,
        state: &PlayerState,
    ) -> Result<(), PlaybackBackendError> {
        if !error.fatal {
            tracing::debug!("Recoverable streaming error: {}", error.details);
            return Ok(());
        }
        let Some(session) = self.session.as_mut() else {
            tracing::debug!("Streaming error without a session: {}", error.details);
            return Ok(());
        };

        match error.kind {
            StreamingErrorKind::Network => {
                tracing::warn!(
                    "Streaming network error, falling back to direct playback: {}",
                    error.details
                );
                session.destroy();
                self.session = None;
                if let EngineState::Attached { url, mode, .. } = &mut self.state {
                    self.backend.set_source(url);
                    *mode = DeliveryMode::Direct;
                }
                if state.is_playing {
                    self.try_play();
                }
                Ok(())
            }
            StreamingErrorKind::Media => {
                tracing::warn!("Streaming media error, recovering: {}", error.details);
                session.recover_media_error();
                Ok(())
            }
            StreamingErrorKind::Other => {
                self.teardown();
                self.state = EngineState::Idle;
                Err(PlaybackBackendError::Fatal(error.details))
            }
        }
    }

    fn sync_song(&mut self, state: &PlayerState) -> Option<PendingLoad> {
        let Some(song) = state.current_song() else {
            if self.state != EngineState::Idle {
                self.teardown();
                self.state = EngineState::Idle;
                tracing::debug!("No current song, engine idle");
            }
            return None;
        };

        if self.song_id() == Some(&song.id) {
            return None;
        }

        self.teardown();
        self.generation += 1;
        self.state = EngineState::Loading {
            song_id: song.id.clone(),
            generation: self.generation,
        };
        Some(PendingLoad {
            song: song.clone(),
            generation: self.generation,
        })
    }

    fn sync_playing(&mut self, playing: bool) {
        if !self.backend.has_source() {
            return;
        }
        if playing {
            if self.backend.is_paused() {
                self.try_play();
            }
        } else if !self.backend.is_paused() {
            self.backend.pause();
        }
    }

    fn sync_seek(&mut self, target: f64) {
        if !self.backend.has_source() {
            return;
        }
        if (self.backend.position() - target).abs() > SEEK_THRESHOLD_SECS {
            self.backend.seek(target);
        }
    }

    /// Start playback; a refusal leaves the store's intent as is.
    fn try_play(&mut self) {
        if let Err(e) = self.backend.play() {
            tracing::debug!("Backend refused to play: {}", e);
        }
    }

    /// Hand `url` to the backend and return the mode actually used.
    fn attach(&mut self, url: &str, mode: DeliveryMode) -> DeliveryMode {
        if mode != DeliveryMode::Streaming {
            self.backend.set_source(url);
            return mode;
        }

        let Some(factory) = self.streaming.as_mut() else {
            tracing::debug!("No streaming support, assigning manifest directly");
            self.backend.set_source(url);
            return DeliveryMode::Direct;
        };

        match factory.attach(url, &mut self.backend) {
            Ok(session) => {
                self.session = Some(session);
                DeliveryMode::Streaming
            }
            Err(e) => {
                tracing::warn!("Streaming attach failed, playing directly: {}", e);
                self.backend.set_source(url);
                DeliveryMode::Direct
            }
        }
    }

    fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.destroy();
        }
        if self.backend.has_source() {
            self.backend.pause();
            self.backend.clear_source();
        }
    }
}

/// Whether `change` asks an idle engine to load the current song again.
///
/// The store reports no song change when the same song is replayed, so
/// after a failed load only these signals can bring the source back.
fn retries_load(change: &StateChange, state: &PlayerState) -> bool {
    match change {
        StateChange::Queue | StateChange::CurrentTime(Origin::User) => true,
        StateChange::Playing => state.is_playing,
        _ => false,
    }
}

//! Event loop that ties the store, the engine and the async lookups together.
//!
//! Everything that changes player state arrives as an [`Input`] on one
//! channel and is handled in order on a single task:
//!
//! ```text
//!   caller ──Action──►┐
//!   backend ─Event───►│                 ┌──► PlayerStore ──changes──► PlaybackEngine
//!   resolver ─URL────►├─► PlayerRuntime ┤                                  │
//!   matcher ─Patch───►│                 └──◄── Actions (Origin::Backend) ◄──┘
//!                     ┘
//! ```
//!
//! Source resolution and metadata matching run as spawned tasks that report
//! back through the same channel, so no state is ever shared across tasks.

use std::sync::Arc;

use crossbeam_channel::Receiver;
use tokio::sync::mpsc;

use super::backend::{AudioBackend, BackendEvent, StreamingError};
use super::engine::{PendingLoad, PlaybackEngine};
use super::resolver::SourceResolver;
use super::state::{Action, StateChange};
use super::store::PlayerStore;
use crate::enrichment::service::{MatchMode, enrich, needs_enrichment};
use crate::enrichment::traits::MusicApi;
use crate::error::{Error, ResolutionError};
use crate::model::{MetadataPatch, Song, SongId};

/// Something for the runtime to handle.
#[derive(Debug)]
pub enum Input {
    Action(Action),
    Backend(BackendEvent),
    Streaming(StreamingError),
    /// A spawned resolution finished
    Resolved {
        load: PendingLoad,
        result: Result<String, ResolutionError>,
    },
    ToggleLike(Song),
    /// Match the current song now, surfacing failures
    MatchRequested,
    /// A spawned match finished
    Matched {
        song_id: SongId,
        result: Result<Option<MetadataPatch>, Error>,
    },
    Shutdown,
}

/// Owns the player and processes its inputs one at a time.
pub struct PlayerRuntime<B: AudioBackend> {
    store: PlayerStore,
    engine: PlaybackEngine<B>,
    resolver: Arc<dyn SourceResolver>,
    api: Option<Arc<dyn MusicApi>>,
    auto_match: bool,
    changes: Receiver<Vec<StateChange>>,
    tx: mpsc::UnboundedSender<Input>,
    rx: mpsc::UnboundedReceiver<Input>,
}

impl<B: AudioBackend> PlayerRuntime<B> {
    pub fn new(
        mut store: PlayerStore,
        engine: PlaybackEngine<B>,
        resolver: Arc<dyn SourceResolver>,
    ) -> Self {
        let (changes_tx, changes) = crossbeam_channel::unbounded();
        store.subscribe(move |_, batch, _| {
            if changes_tx.send(batch.to_vec()).is_err() {
                tracing::trace!("Runtime gone, change batch dropped");
            }
        });

        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            store,
            engine,
            resolver,
            api: None,
            auto_match: false,
            changes,
            tx,
            rx,
        }
    }

    /// Enable metadata matching. With `auto_match`, every new current song
    /// missing cover art or lyrics is matched in the background.
    pub fn with_matching(mut self, api: Arc<dyn MusicApi>, auto_match: bool) -> Self {
        self.api = Some(api);
        self.auto_match = auto_match;
        self
    }

    /// A handle for feeding inputs from other tasks.
    pub fn sender(&self) -> mpsc::UnboundedSender<Input> {
        self.tx.clone()
    }

    pub fn store(&self) -> &PlayerStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut PlayerStore {
        &mut self.store
    }

    pub fn engine(&self) -> &PlaybackEngine<B> {
        &self.engine
    }

    /// Process inputs until [`Input::Shutdown`].
    pub async fn run(mut self) {
        tracing::debug!("Player runtime started");
        while let Some(input) = self.rx.recv().await {
            if !self.step(input).await {
                break;
            }
        }
        tracing::debug!("Player runtime stopped");
    }

    /// Handle one input. Returns false on shutdown.
    pub async fn step(&mut self, input: Input) -> bool {
        match input {
            Input::Action(action) => self.store.dispatch(action),
            Input::Backend(event) => {
                for action in self.engine.handle_backend_event(event) {
                    self.store.dispatch(action);
                }
            }
            Input::Streaming(error) => {
                if let Err(e) = self
                    .engine
                    .handle_streaming_error(error, self.store.state())
                {
                    tracing::error!("Playback stopped: {}", e);
                }
            }
            Input::Resolved { load, result } => {
                self.engine.complete_load(load, result, self.store.state());
            }
            Input::ToggleLike(song) => match self.store.toggle_like(&song).await {
                Ok(liked) => tracing::info!("{} {}", if liked { "Liked" } else { "Unliked" }, song.title),
                Err(e) => tracing::warn!("Could not update like for {}: {}", song.id, e),
            },
            Input::MatchRequested => self.spawn_match(MatchMode::Requested),
            Input::Matched { song_id, result } => self.apply_match(song_id, result),
            Input::Shutdown => return false,
        }

        self.sync_engine();
        true
    }

    /// Feed pending store changes to the engine.
    fn sync_engine(&mut self) {
        while let Ok(changes) = self.changes.try_recv() {
            if let Some(load) = self.engine.on_state_change(self.store.state(), &changes) {
                self.spawn_resolve(load);
            }
            if changes.contains(&StateChange::CurrentSong) {
                self.spawn_match(MatchMode::Automatic);
            }
        }
    }

    fn spawn_resolve(&self, load: PendingLoad) {
        let resolver = Arc::clone(&self.resolver);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = resolver.resolve(&load.song).await;
            if tx.send(Input::Resolved { load, result }).is_err() {
                tracing::debug!("Runtime stopped, resolution dropped");
            }
        });
    }

    fn spawn_match(&self, mode: MatchMode) {
        let Some(api) = self.api.clone() else {
            if mode == MatchMode::Requested {
                tracing::warn!("Metadata matching is not configured");
            }
            return;
        };
        let Some(song) = self.store.current_song().cloned() else {
            return;
        };
        if mode == MatchMode::Automatic && !(self.auto_match && needs_enrichment(&song)) {
            return;
        }

        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = enrich(api.as_ref(), &song, mode).await;
            let input = Input::Matched {
                song_id: song.id,
                result,
            };
            if tx.send(input).is_err() {
                tracing::debug!("Runtime stopped, match dropped");
            }
        });
    }

    fn apply_match(&mut self, song_id: SongId, result: Result<Option<MetadataPatch>, Error>) {
        match result {
            Ok(Some(patch)) => {
                tracing::info!("Found metadata for {}", song_id);
                // The save task logs its own failure
                drop(self.store.update_song_metadata(&song_id, patch));
            }
            Ok(None) => tracing::debug!("No metadata found for {}", song_id),
            Err(e) => tracing::warn!("Metadata match for {} failed: {}", song_id, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::traits::mocks::{MockMusicApi, remote_track};
    use crate::player::backend::mocks::{BackendLog, MockBackend, MockStreamingFactory};
    use crate::player::backend::StreamingErrorKind;
    use crate::player::engine::EngineState;
    use crate::player::resolver::DefaultResolver;
    use crate::test_utils::{FailingLibrary, song_with_id, temp_db};
    use std::sync::Mutex;

    fn runtime_with(
        library: Arc<dyn crate::db::SongRepository>,
    ) -> (PlayerRuntime<MockBackend>, Arc<Mutex<BackendLog>>) {
        let (backend, log) = MockBackend::new();
        let (factory, _) = MockStreamingFactory::new();
        let engine = PlaybackEngine::new(backend, Some(Box::new(factory)));
        let runtime = PlayerRuntime::new(
            PlayerStore::new(library),
            engine,
            Arc::new(DefaultResolver::default()),
        );
        (runtime, log)
    }

    fn runtime() -> (PlayerRuntime<MockBackend>, Arc<Mutex<BackendLog>>) {
        runtime_with(Arc::new(FailingLibrary))
    }

    /// Wait for the next spawned task to report back and handle it.
    async fn pump(runtime: &mut PlayerRuntime<MockBackend>) {
        let input = runtime.rx.recv().await.expect("runtime channel open");
        runtime.step(input).await;
    }

    fn current_id(runtime: &PlayerRuntime<MockBackend>) -> String {
        runtime
            .store()
            .current_song()
            .map(|s| s.id.to_string())
            .unwrap_or_default()
    }

    fn abc() -> Vec<Song> {
        vec![song_with_id("a"), song_with_id("b"), song_with_id("c")]
    }

    #[tokio::test]
    async fn test_play_resolves_and_starts_backend() {
        let (mut rt, log) = runtime();
        rt.step(Input::Action(Action::PlaySong {
            song: song_with_id("b"),
            queue: abc(),
        }))
        .await;
        assert!(matches!(rt.engine().state(), EngineState::Loading { .. }));

        pump(&mut rt).await;
        let log = log.lock().unwrap();
        assert_eq!(log.source.as_deref(), Some("http://m7.example.com/b.mp3"));
        assert!(!log.paused);
    }

    #[tokio::test]
    async fn test_ended_advances_with_wraparound() {
        let (mut rt, log) = runtime();
        rt.step(Input::Action(Action::PlaySong {
            song: song_with_id("c"),
            queue: abc(),
        }))
        .await;
        pump(&mut rt).await;

        rt.step(Input::Backend(BackendEvent::Ended)).await;
        assert_eq!(current_id(&rt), "a");
        assert!(!rt.store().state().is_playing);

        pump(&mut rt).await;
        let log = log.lock().unwrap();
        assert_eq!(log.source.as_deref(), Some("http://m7.example.com/a.mp3"));
        assert!(log.paused);
    }

    #[tokio::test]
    async fn test_only_latest_song_is_attached() {
        let (mut rt, log) = runtime();
        rt.step(Input::Action(Action::PlaySong {
            song: song_with_id("a"),
            queue: abc(),
        }))
        .await;
        rt.step(Input::Action(Action::NextSong)).await;

        pump(&mut rt).await;
        pump(&mut rt).await;

        assert_eq!(
            log.lock().unwrap().sources_set,
            vec!["http://m7.example.com/b.mp3".to_string()]
        );
    }

    #[tokio::test]
    async fn test_backend_time_reaches_store() {
        let (mut rt, log) = runtime();
        rt.step(Input::Action(Action::PlaySong {
            song: song_with_id("a"),
            queue: Vec::new(),
        }))
        .await;
        pump(&mut rt).await;

        log.lock().unwrap().position = 12.5;
        rt.step(Input::Backend(BackendEvent::DurationKnown(200.0)))
            .await;
        rt.step(Input::Backend(BackendEvent::TimeUpdate)).await;

        let state = rt.store().state();
        assert_eq!(state.duration, Some(200.0));
        assert_eq!(state.current_time, 12.5);
        assert!(log.lock().unwrap().seeks.is_empty());
    }

    #[tokio::test]
    async fn test_fatal_streaming_error_goes_idle() {
        let (mut rt, _log) = runtime();
        let mut live = song_with_id("live");
        live.source = crate::model::SongSource::Url("https://live.example.com/index.m3u8".to_string());
        rt.step(Input::Action(Action::PlaySong {
            song: live,
            queue: Vec::new(),
        }))
        .await;
        pump(&mut rt).await;

        let keep_running = rt
            .step(Input::Streaming(StreamingError {
                kind: StreamingErrorKind::Other,
                fatal: true,
                details: "internalException".to_string(),
            }))
            .await;
        assert!(keep_running);
        assert_eq!(rt.engine().state(), &EngineState::Idle);
    }

    #[tokio::test]
    async fn test_replay_after_failed_resolution_retries() {
        let (mut rt, log) = runtime();
        let mut song = song_with_id("netease:1");
        song.source = crate::model::SongSource::Unresolved;

        rt.step(Input::Action(Action::PlaySong {
            song: song.clone(),
            queue: Vec::new(),
        }))
        .await;
        // No music service configured, so the lookup fails
        pump(&mut rt).await;
        assert_eq!(rt.engine().state(), &EngineState::Idle);

        rt.step(Input::Action(Action::PlaySong {
            song,
            queue: Vec::new(),
        }))
        .await;
        assert!(matches!(rt.engine().state(), EngineState::Loading { .. }));

        pump(&mut rt).await;
        assert_eq!(rt.engine().state(), &EngineState::Idle);
        assert!(log.lock().unwrap().sources_set.is_empty());
    }

    #[tokio::test]
    async fn test_replay_after_fatal_error_reattaches() {
        let (mut rt, log) = runtime();
        let mut live = song_with_id("live");
        live.source = crate::model::SongSource::Url(
            "https://live.example.com/index.m3u8".to_string(),
        );
        rt.step(Input::Action(Action::PlaySong {
            song: live.clone(),
            queue: Vec::new(),
        }))
        .await;
        pump(&mut rt).await;
        rt.step(Input::Streaming(StreamingError {
            kind: StreamingErrorKind::Other,
            fatal: true,
            details: "internalException".to_string(),
        }))
        .await;
        assert_eq!(rt.engine().state(), &EngineState::Idle);

        rt.step(Input::Action(Action::PlaySong {
            song: live,
            queue: Vec::new(),
        }))
        .await;
        pump(&mut rt).await;

        assert!(matches!(rt.engine().state(), EngineState::Attached { .. }));
        assert_eq!(log.lock().unwrap().sources_set.len(), 2);
    }

    #[tokio::test]
    async fn test_auto_match_patches_current_song() {
        let api = MockMusicApi::with_tracks(vec![remote_track(5, "Song a", &["Test Artist"])])
            .cover(5, "https://img.example.com/5.jpg")
            .lyric_text(5, "[00:01.00]hello");
        let (rt, _log) = runtime();
        let mut rt = rt.with_matching(Arc::new(api), true);

        rt.step(Input::Action(Action::PlaySong {
            song: song_with_id("a"),
            queue: Vec::new(),
        }))
        .await;
        // One resolution, one match
        pump(&mut rt).await;
        pump(&mut rt).await;

        let song = rt.store().current_song().unwrap();
        assert_eq!(
            song.remote_cover_url.as_deref(),
            Some("https://img.example.com/5.jpg")
        );
        assert_eq!(song.lyrics.as_deref(), Some("[00:01.00]hello"));
    }

    #[tokio::test]
    async fn test_auto_match_disabled() {
        let api = Arc::new(MockMusicApi::empty());
        let (rt, _log) = runtime();
        let mut rt = rt.with_matching(api.clone(), false);

        rt.step(Input::Action(Action::PlaySong {
            song: song_with_id("a"),
            queue: Vec::new(),
        }))
        .await;
        pump(&mut rt).await;
        assert_eq!(api.search_count(), 0);
    }

    #[tokio::test]
    async fn test_toggle_like_input() {
        let (library, _dir) = temp_db().await;
        let (mut rt, _log) = runtime_with(Arc::new(library));
        let song = song_with_id("netease:77");

        rt.step(Input::Action(Action::PlaySong {
            song: song.clone(),
            queue: Vec::new(),
        }))
        .await;
        rt.step(Input::ToggleLike(song)).await;

        assert!(rt.store().current_song().unwrap().liked);
        assert_eq!(rt.store().state().library.len(), 1);
    }

    #[tokio::test]
    async fn test_shutdown_stops_run() {
        let (rt, _log) = runtime();
        let tx = rt.sender();
        tx.send(Input::Action(Action::SetVolume(0.5))).unwrap();
        tx.send(Input::Shutdown).unwrap();
        // Returns instead of waiting forever
        rt.run().await;
    }
}

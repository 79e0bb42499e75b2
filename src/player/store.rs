//! Authoritative player state with explicit subscriptions.
//!
//! Every mutation goes through [`PlayerStore::dispatch`]. An action is applied
//! as one transition, then every subscriber sees the resulting
//! [`StateChange`]s before the next action is applied. Subscribers may queue
//! follow-up actions through the [`Dispatcher`] they are handed; those run
//! strictly after the current notification round.
//!
//! Two operations touch persistence:
//! - [`PlayerStore::toggle_like`] persists first and only then mutates
//!   memory, so a failed write never leaves memory ahead of storage
//! - [`PlayerStore::update_song_metadata`] mutates memory first and saves
//!   in a spawned best-effort task

use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use tokio::task::JoinHandle;

use super::state::{Action, Origin, PlayerState, StateChange, View};
use crate::db::SongRepository;
use crate::error::PersistenceError;
use crate::model::{MetadataPatch, Song, SongId, SongUpdate};

/// Handle returned by [`PlayerStore::subscribe`].
pub type SubscriptionId = u64;

type Subscriber = Box<dyn FnMut(&PlayerState, &[StateChange], &Dispatcher) + Send>;

/// Queues actions for the store that owns it.
#[derive(Clone)]
pub struct Dispatcher {
    tx: Sender<Action>,
}

impl Dispatcher {
    /// Queue an action. It is applied after the current notification round.
    pub fn dispatch(&self, action: Action) {
        if self.tx.send(action).is_err() {
            tracing::debug!("Store dropped, action discarded");
        }
    }
}

/// The player state store.
pub struct PlayerStore {
    state: PlayerState,
    library: Arc<dyn SongRepository>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: SubscriptionId,
    tx: Sender<Action>,
    rx: Receiver<Action>,
}

impl PlayerStore {
    pub fn new(library: Arc<dyn SongRepository>) -> Self {
        Self::with_state(library, PlayerState::default())
    }

    pub fn with_state(library: Arc<dyn SongRepository>, state: PlayerState) -> Self {
        let (tx, rx) = unbounded();
        Self {
            state,
            library,
            subscribers: Vec::new(),
            next_subscription: 0,
            tx,
            rx,
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    pub fn current_song(&self) -> Option<&Song> {
        self.state.current_song()
    }

    /// A handle for queueing actions from outside a notification round.
    ///
    /// Queued actions are applied by the next [`dispatch`](Self::dispatch)
    /// or [`process_pending`](Self::process_pending).
    pub fn dispatcher(&self) -> Dispatcher {
        Dispatcher {
            tx: self.tx.clone(),
        }
    }

    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&PlayerState, &[StateChange], &Dispatcher) + Send + 'static,
    {
        let id = self.next_subscription;
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
        self.subscribers.len() != before
    }

    /// Apply an action, plus anything queued before or during it.
    pub fn dispatch(&mut self, action: Action) {
        self.dispatcher().dispatch(action);
        self.process_pending();
    }

    /// Apply every queued action in order.
    pub fn process_pending(&mut self) {
        let dispatcher = self.dispatcher();
        while let Ok(action) = self.rx.try_recv() {
            let changes = apply(&mut self.state, action);
            if changes.is_empty() {
                continue;
            }
            for (_, subscriber) in self.subscribers.iter_mut() {
                subscriber(&self.state, &changes, &dispatcher);
            }
        }
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Play `song`, replacing the queue with `queue`.
    ///
    /// An empty `queue`, or one that does not contain `song`, becomes `[song]`.
    pub fn play_song(&mut self, song: Song, queue: Vec<Song>) {
        self.dispatch(Action::PlaySong { song, queue });
    }

    pub fn next_song(&mut self) {
        self.dispatch(Action::NextSong);
    }

    pub fn prev_song(&mut self) {
        self.dispatch(Action::PrevSong);
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.dispatch(Action::SetVolume(volume));
    }

    pub fn set_current_time(&mut self, secs: f64, origin: Origin) {
        self.dispatch(Action::SetCurrentTime { secs, origin });
    }

    pub fn set_duration(&mut self, secs: f64) {
        self.dispatch(Action::SetDuration(secs));
    }

    pub fn set_is_playing(&mut self, playing: bool) {
        self.dispatch(Action::SetIsPlaying(playing));
    }

    pub fn toggle_full_screen(&mut self) {
        self.dispatch(Action::ToggleFullScreen);
    }

    pub fn set_current_view(&mut self, view: View) {
        self.dispatch(Action::SetCurrentView(view));
    }

    // ========================================================================
    // Persistence-backed operations
    // ========================================================================

    /// Flip the liked flag of `song` and return the new value.
    ///
    /// The flag is persisted first (a song not yet in the library is stored
    /// whole); only after that succeeds is it changed in the queue and the
    /// library list. On error nothing in memory changes.
    pub async fn toggle_like(&mut self, song: &Song) -> Result<bool, PersistenceError> {
        let current = match self.state.find_song(&song.id) {
            Some(known) => known.liked,
            None => self
                .library
                .get(&song.id)
                .await?
                .map_or(song.liked, |stored| stored.liked),
        };
        let liked = !current;

        let found = self
            .library
            .update(&song.id, &SongUpdate::liked(liked))
            .await?;

        if !found {
            let mut stored = self
                .state
                .find_song(&song.id)
                .cloned()
                .unwrap_or_else(|| song.clone());
            stored.liked = liked;
            self.library.upsert(&stored).await?;
            tracing::info!("Added {} to the library", song.id);
        }

        self.dispatch(Action::SetLiked {
            id: song.id.clone(),
            liked,
        });

        if !found && let Err(e) = self.load_library().await {
            tracing::warn!("Failed to reload library after like: {}", e);
        }

        Ok(liked)
    }

    /// Merge `patch` into every in-memory copy of song `id` and save it in
    /// the background.
    ///
    /// Returns the save task, or `None` for an empty patch. A failed save is
    /// logged and otherwise ignored.
    pub fn update_song_metadata(
        &mut self,
        id: &SongId,
        patch: MetadataPatch,
    ) -> Option<JoinHandle<()>> {
        if patch.is_empty() {
            return None;
        }

        let update = SongUpdate::from(&patch);
        self.dispatch(Action::ApplyMetadata {
            id: id.clone(),
            patch,
        });

        let library = Arc::clone(&self.library);
        let id = id.clone();
        Some(tokio::spawn(async move {
            match library.update(&id, &update).await {
                Ok(true) => tracing::debug!("Saved metadata for {}", id),
                Ok(false) => tracing::debug!("{} is not in the library, metadata kept in memory", id),
                Err(e) => tracing::warn!("Failed to save metadata for {}: {}", id, e),
            }
        }))
    }

    /// [`update_song_metadata`](Self::update_song_metadata) for the current song.
    pub fn update_current_song_metadata(&mut self, patch: MetadataPatch) -> Option<JoinHandle<()>> {
        let id = self.state.current_song_id()?.clone();
        self.update_song_metadata(&id, patch)
    }

    /// Replace the library list with what the library store holds.
    pub async fn load_library(&mut self) -> Result<usize, PersistenceError> {
        let songs = self.library.list_all().await?;
        let count = songs.len();
        self.dispatch(Action::SetLibrary(songs));
        Ok(count)
    }

    /// Store new songs, then reload the library list. Returns the stored
    /// songs with their assigned ids.
    pub async fn add_songs_to_library(
        &mut self,
        songs: Vec<Song>,
    ) -> Result<Vec<Song>, PersistenceError> {
        let stored = self.library.add_many(songs).await?;
        self.load_library().await?;
        Ok(stored)
    }
}

/// Apply one action to `state` and report what changed.
fn apply(state: &mut PlayerState, action: Action) -> Vec<StateChange> {
    let mut changes = Vec::new();

    match action {
        Action::PlaySong { song, queue } => {
            let previous = state.current_song_id().cloned();

            let (mut items, position) = match queue.iter().position(|s| s.id == song.id) {
                Some(position) => (queue, position),
                None => (Vec::new(), 0),
            };
            if items.is_empty() {
                items.push(song);
            } else {
                items[position] = song;
            }
            state.queue.replace(items, position);
            changes.push(StateChange::Queue);

            enter_current_song(state, previous, &mut changes);

            if !state.is_playing {
                state.is_playing = true;
                changes.push(StateChange::Playing);
            }
        }
        Action::NextSong => step_queue(state, true, &mut changes),
        Action::PrevSong => step_queue(state, false, &mut changes),
        Action::SetLiked { id, liked } => {
            if update_everywhere(state, &id, |s| s.liked = liked) {
                changes.push(StateChange::SongUpdated(id));
            }
        }
        Action::ApplyMetadata { id, patch } => {
            if update_everywhere(state, &id, |s| s.apply_patch(&patch)) {
                changes.push(StateChange::SongUpdated(id));
            }
        }
        Action::SetVolume(volume) => {
            if volume.is_finite() {
                let volume = volume.clamp(0.0, 1.0);
                if volume != state.volume {
                    state.volume = volume;
                    changes.push(StateChange::Volume);
                }
            }
        }
        Action::SetCurrentTime { secs, origin } => {
            if secs.is_finite() {
                let secs = match state.duration {
                    Some(d) if d > 0.0 => secs.clamp(0.0, d),
                    _ => secs.max(0.0),
                };
                if secs != state.current_time {
                    state.current_time = secs;
                    changes.push(StateChange::CurrentTime(origin));
                }
            }
        }
        Action::SetDuration(secs) => {
            let secs = if secs.is_finite() { secs.max(0.0) } else { 0.0 };
            if state.duration != Some(secs) {
                state.duration = Some(secs);
                changes.push(StateChange::Duration);
            }
        }
        Action::SetIsPlaying(playing) => {
            // Reported even when unchanged so a rejected play can be retried
            state.is_playing = playing;
            changes.push(StateChange::Playing);
        }
        Action::ToggleFullScreen => {
            state.is_full_screen = !state.is_full_screen;
            changes.push(StateChange::FullScreen);
        }
        Action::SetCurrentView(view) => {
            if view != state.current_view {
                state.current_view = view;
                changes.push(StateChange::View);
            }
        }
        Action::SetLibrary(songs) => {
            state.library = songs;
            changes.push(StateChange::Library);
        }
    }

    changes
}

/// Move one song forward or back, wrapping around. No-op when empty.
fn step_queue(state: &mut PlayerState, forward: bool, changes: &mut Vec<StateChange>) {
    if state.queue.is_empty() {
        return;
    }
    let previous = state.current_song_id().cloned();
    if forward {
        state.queue.skip_forward();
    } else {
        state.queue.previous();
    }
    changes.push(StateChange::Queue);
    enter_current_song(state, previous, changes);
}

/// Position bookkeeping after the queue position moved.
///
/// A different song starts from zero with an unknown duration. The same
/// song again is a restart, which shows up as a user seek to zero.
fn enter_current_song(
    state: &mut PlayerState,
    previous: Option<SongId>,
    changes: &mut Vec<StateChange>,
) {
    let same_song = previous.as_ref() == state.current_song_id();

    if same_song {
        if state.current_time != 0.0 {
            state.current_time = 0.0;
            changes.push(StateChange::CurrentTime(Origin::User));
        }
        return;
    }

    changes.push(StateChange::CurrentSong);
    state.current_time = 0.0;
    if state.duration.take().is_some() {
        changes.push(StateChange::Duration);
    }
}

/// Run `f` on every in-memory copy of song `id`.
fn update_everywhere(state: &mut PlayerState, id: &SongId, mut f: impl FnMut(&mut Song)) -> bool {
    let mut touched = state.queue.update_where(id, &mut f);
    for song in state.library.iter_mut().filter(|s| &s.id == id) {
        f(song);
        touched += 1;
    }
    touched > 0
}

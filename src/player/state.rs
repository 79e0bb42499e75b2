//! Player state, actions and change notifications.

use super::queue::Queue;
use crate::model::{MetadataPatch, Song, SongId};

/// Which top-level view the user is looking at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum View {
    #[default]
    Home,
    Library,
    Search,
    Radio,
}

/// Who moved the playback position.
///
/// Only user seeks are pushed to the backend; positions reported by the
/// backend itself are never echoed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Backend,
}

/// Authoritative player state.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    /// User intent; the backend may not actually be producing sound
    pub is_playing: bool,
    pub queue: Queue,
    /// Volume level (0.0 - 1.0)
    pub volume: f32,
    /// Seconds, `None` until the backend reports it
    pub duration: Option<f64>,
    /// Seconds from the start of the current song
    pub current_time: f64,
    pub is_full_screen: bool,
    pub current_view: View,
    /// Songs in the persistent library, in storage order
    pub library: Vec<Song>,
}

impl Default for PlayerState {
    fn default() -> Self {
        Self {
            is_playing: false,
            queue: Queue::new(),
            volume: 1.0,
            duration: None,
            current_time: 0.0,
            is_full_screen: false,
            current_view: View::default(),
            library: Vec::new(),
        }
    }
}

impl PlayerState {
    /// The song at the queue's current position.
    pub fn current_song(&self) -> Option<&Song> {
        self.queue.current()
    }

    pub fn current_song_id(&self) -> Option<&SongId> {
        self.current_song().map(|s| &s.id)
    }

    /// Look a song up in the queue first, then the library.
    pub fn find_song(&self, id: &SongId) -> Option<&Song> {
        self.queue
            .items()
            .iter()
            .chain(self.library.iter())
            .find(|s| &s.id == id)
    }

    /// Get position as a fraction (0.0 - 1.0).
    pub fn position_fraction(&self) -> f64 {
        match self.duration {
            Some(d) if d > 0.0 => (self.current_time / d).clamp(0.0, 1.0),
            _ => 0.0,
        }
    }

    /// Format position as M:SS.
    pub fn position_str(&self) -> String {
        format_time(self.current_time)
    }

    /// Format duration as M:SS.
    pub fn duration_str(&self) -> String {
        format_time(self.duration.unwrap_or(0.0))
    }
}

/// Format seconds as M:SS (minutes are not wrapped into hours).
pub fn format_time(secs: f64) -> String {
    let total = if secs.is_finite() && secs > 0.0 {
        secs.floor() as u64
    } else {
        0
    };
    format!("{}:{:02}", total / 60, total % 60)
}

/// A state transition request.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Make `song` current; `queue` replaces the play queue
    PlaySong { song: Song, queue: Vec<Song> },
    NextSong,
    PrevSong,
    /// Set the liked flag everywhere a song appears. Sent only after the
    /// flag was persisted.
    SetLiked { id: SongId, liked: bool },
    /// Merge found metadata everywhere a song appears
    ApplyMetadata { id: SongId, patch: MetadataPatch },
    SetVolume(f32),
    SetCurrentTime { secs: f64, origin: Origin },
    SetDuration(f64),
    SetIsPlaying(bool),
    ToggleFullScreen,
    SetCurrentView(View),
    SetLibrary(Vec<Song>),
}

/// What a transition changed. Subscribers get these in transition order.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    /// Identity of the current song changed (including to none)
    CurrentSong,
    /// Queue contents or position changed
    Queue,
    Playing,
    CurrentTime(Origin),
    Duration,
    Volume,
    FullScreen,
    View,
    Library,
    /// A song's liked flag or metadata changed in place
    SongUpdated(SongId),
}

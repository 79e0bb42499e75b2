//! Play songs through the native audio output.

use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::db::SongRepository;
use crate::error::Error;
use crate::library::{self, FAVORITES};
use crate::metadata::{UNKNOWN_ALBUM, UNKNOWN_ARTIST};
use crate::model::{Song, SongId, SongSource};
use crate::player::{
    Action, DefaultResolver, Input, NativeBackend, PlaybackEngine, PlayerRuntime, PlayerState,
    PlayerStore, StateChange,
};

use super::library::song_line;
use super::{music_api, open_library};

/// Which songs to queue when no ids are given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueFilter<'a> {
    All,
    Liked,
    Album(&'a str),
}

/// Play songs in order until the queue runs out or Ctrl-C
pub fn cmd_play(
    rt: &Runtime,
    config: &Config,
    ids: &[String],
    filter: QueueFilter<'_>,
    volume: Option<f32>,
) -> anyhow::Result<()> {
    rt.block_on(async {
        let library = Arc::new(open_library(config).await?);
        let queue = play_queue(library.as_ref(), ids, filter).await?;
        let Some(first) = queue.first().cloned() else {
            println!("Nothing to play.");
            return Ok(());
        };

        let api = music_api(config)?;
        let (backend, mut events) = NativeBackend::open()?;
        let mut store = PlayerStore::new(library);
        store.load_library().await?;

        let resolver = Arc::new(DefaultResolver::new(Some(Arc::clone(&api))));
        let mut runtime = PlayerRuntime::new(store, PlaybackEngine::new(backend, None), resolver)
            .with_matching(api, config.library.auto_match);

        let tx = runtime.sender();
        let advance_tx = tx.clone();
        runtime.store_mut().subscribe(move |state, changes, _| {
            if changes.contains(&StateChange::CurrentSong)
                && let Some(song) = state.current_song()
            {
                println!("▶ {}", song_line(song));
            }
            if let Some(input) = advance(state, changes) {
                if matches!(input, Input::Shutdown) {
                    println!("Queue finished.");
                }
                if advance_tx.send(input).is_err() {
                    tracing::debug!("Player stopped before the queue advanced");
                }
            }
        });

        let forward = tx.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if forward.send(Input::Backend(event)).is_err() {
                    break;
                }
            }
        });

        let stop = tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = stop.send(Input::Shutdown);
            }
        });

        println!("Playing {} songs. Press Ctrl-C to stop.", queue.len());
        let volume = volume.unwrap_or(config.playback.volume);
        for action in [
            Action::SetVolume(volume),
            Action::PlaySong { song: first, queue },
        ] {
            tx.send(Input::Action(action))
                .map_err(|_| anyhow::anyhow!("player stopped before starting"))?;
        }

        runtime.run().await;
        anyhow::Ok(())
    })
}

/// Songs to play, in order.
///
/// Ids are looked up in the library; a remote id the library doesn't know
/// is queued unresolved so its URL is fetched when it comes up.
async fn play_queue(
    library: &dyn SongRepository,
    ids: &[String],
    filter: QueueFilter<'_>,
) -> Result<Vec<Song>, Error> {
    if !ids.is_empty() {
        let mut queue = Vec::with_capacity(ids.len());
        for raw in ids {
            let id = SongId::new(raw);
            match library.get(&id).await? {
                Some(song) => queue.push(song),
                None if id.netease_id().is_some() => queue.push(Song::new(
                    id.clone(),
                    id.to_string(),
                    UNKNOWN_ARTIST,
                    UNKNOWN_ALBUM,
                    SongSource::Unresolved,
                )),
                None => return Err(Error::SongNotFound(id.to_string())),
            }
        }
        return Ok(queue);
    }

    let songs = library.list_all().await?;
    let (favorites, name) = match filter {
        QueueFilter::All => return Ok(songs),
        QueueFilter::Liked => (true, FAVORITES),
        QueueFilter::Album(name) => (false, name),
    };
    Ok(library::group_albums(&songs)
        .into_iter()
        .find(|group| group.is_favorites == favorites && group.name.eq_ignore_ascii_case(name))
        .map(|group| group.songs)
        .unwrap_or_default())
}

/// What to do after a song ended and the queue moved on.
///
/// Ending a song leaves the next one paused; keep going unless the queue
/// wrapped back to the start.
fn advance(state: &PlayerState, changes: &[StateChange]) -> Option<Input> {
    if state.is_playing || !changes.contains(&StateChange::Queue) {
        return None;
    }
    match state.queue.current_index() {
        Some(0) => Some(Input::Shutdown),
        Some(_) => Some(Input::Action(Action::SetIsPlaying(true))),
        None => None,
    }
}

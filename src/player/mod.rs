//! Player core: state store, playback engine and the loop driving them.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      PlayerStore (state)                        │
//! │   Queue, play intent, position, volume, library song list      │
//! └────────────────────────────┬────────────────────────────────────┘
//!                              │ StateChange batches
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   PlaybackEngine (imperative)                   │
//! │   Resolves sources, attaches streams, plays/pauses/seeks       │
//! └────────────────────────────┬────────────────────────────────────┘
//!                              │ AudioBackend / StreamingSession
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              Audio output (NativeBackend: cpal)                 │
//! │        Reports time, duration and end back as events           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! [`PlayerRuntime`] owns both halves and serializes every input through
//! one channel. [`NativeBackend`] decodes local files and HTTP sources with
//! symphonia; embedders can supply any other [`AudioBackend`].

pub mod backend;
mod decoder;
mod engine;
mod output;
mod queue;
mod resampler;
mod resolver;
mod runtime;
mod state;
mod store;

pub use backend::{
    AudioBackend, BackendEvent, DeliveryMode, PlayRejected, StreamingError, StreamingErrorKind,
    StreamingFactory, StreamingSession, choose_delivery, is_manifest_url,
};
pub use decoder::{AudioDecoder, DecodedFrame};
pub use engine::{EngineState, PendingLoad, PlaybackEngine, SEEK_THRESHOLD_SECS};
pub use output::{NativeBackend, local_path, url_extension};
pub use queue::Queue;
pub use resolver::{DefaultResolver, SourceResolver, file_url};
pub use runtime::{Input, PlayerRuntime};
pub use state::{Action, Origin, PlayerState, StateChange, View, format_time};
pub use store::{Dispatcher, PlayerStore, SubscriptionId};

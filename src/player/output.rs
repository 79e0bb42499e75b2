//! Native audio output: symphonia decoding into a cpal stream.
//!
//! [`NativeBackend`] is the handle the engine drives. The device, decoder
//! and stream live on a dedicated `audio-output` thread:
//!
//! ```text
//!   NativeBackend ──commands──► output thread ──chunks──► cpal callback
//!        │                          │                          │
//!        └──── shared (paused, position, volume) ◄─────────────┘
//!                                   │
//!                                   └──BackendEvent──► runtime
//! ```
//!
//! Play, pause and volume take effect through the shared state right away,
//! so the engine always reads back what it just set.

use std::io::{Cursor, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError, bounded, unbounded};
use parking_lot::{Mutex, RwLock};
use symphonia::core::io::MediaSource;
use tokio::sync::mpsc;

use super::backend::{AudioBackend, BackendEvent, PlayRejected};
use super::decoder::AudioDecoder;
use super::resampler::{Resampler, remix};
use crate::error::PlaybackBackendError;

/// Position changes smaller than this are not reported.
const TIME_UPDATE_SECS: f64 = 0.25;

/// Remote files up to this size are downloaded whole so they can seek.
const MAX_BUFFERED_BYTES: u64 = 64 * 1024 * 1024;

/// Decoded chunks queued ahead of the device.
const QUEUED_CHUNKS: usize = 8;

/// State read by the audio callback.
#[derive(Debug)]
struct OutputShared {
    paused: bool,
    /// Seconds; start of the chunk being played
    position: f64,
    volume: f32,
}

enum OutputCommand {
    Load(String),
    Clear,
    /// Wake the thread after the shared paused flag was cleared
    Play,
    Seek(f64),
    Shutdown,
}

/// Plays one source at a time on the default output device.
pub struct NativeBackend {
    commands: Sender<OutputCommand>,
    shared: Arc<RwLock<OutputShared>>,
    has_source: bool,
    thread: Option<JoinHandle<()>>,
}

impl NativeBackend {
    /// Open the default output device.
    ///
    /// Returns the backend and the receiving end of its event stream, to be
    /// forwarded to the player runtime.
    pub fn open() -> Result<(Self, mpsc::UnboundedReceiver<BackendEvent>), PlaybackBackendError>
    {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = unbounded();
        let (ready_tx, ready_rx) = bounded(1);
        let shared = Arc::new(RwLock::new(OutputShared {
            paused: true,
            position: 0.0,
            volume: 1.0,
        }));

        let thread_shared = Arc::clone(&shared);
        let thread = thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || {
                let device = match select_device() {
                    Ok(device) => device,
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                OutputThread::new(device, thread_shared, events_tx).run(command_rx);
            })
            .map_err(|e| PlaybackBackendError::Output(e.to_string()))?;

        ready_rx
            .recv()
            .map_err(|_| PlaybackBackendError::Output("audio thread exited".to_string()))??;

        Ok((
            Self {
                commands: command_tx,
                shared,
                has_source: false,
                thread: Some(thread),
            },
            events_rx,
        ))
    }

    fn send(&self, command: OutputCommand) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Audio output thread is gone");
        }
    }
}

impl AudioBackend for NativeBackend {
    fn set_source(&mut self, url: &str) {
        {
            let mut shared = self.shared.write();
            shared.paused = true;
            shared.position = 0.0;
        }
        self.has_source = true;
        self.send(OutputCommand::Load(url.to_string()));
    }

    fn clear_source(&mut self) {
        {
            let mut shared = self.shared.write();
            shared.paused = true;
            shared.position = 0.0;
        }
        self.has_source = false;
        self.send(OutputCommand::Clear);
    }

    fn has_source(&self) -> bool {
        self.has_source
    }

    fn play(&mut self) -> Result<(), PlayRejected> {
        if !self.has_source {
            return Err(PlayRejected("no source".to_string()));
        }
        self.shared.write().paused = false;
        self.send(OutputCommand::Play);
        Ok(())
    }

    fn pause(&mut self) {
        self.shared.write().paused = true;
    }

    fn is_paused(&self) -> bool {
        self.shared.read().paused
    }

    fn position(&self) -> f64 {
        self.shared.read().position
    }

    fn seek(&mut self, secs: f64) {
        self.shared.write().position = secs;
        self.send(OutputCommand::Seek(secs));
    }

    fn set_volume(&mut self, volume: f32) {
        self.shared.write().volume = volume.clamp(0.0, 1.0);
    }

    fn supports_native_manifest(&self) -> bool {
        false
    }
}

impl Drop for NativeBackend {
    fn drop(&mut self) {
        self.send(OutputCommand::Shutdown);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("Audio output thread panicked");
        }
    }
}

// ============================================================================
// Output thread
// ============================================================================

fn select_device() -> Result<Device, PlaybackBackendError> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| PlaybackBackendError::Output("no output device found".to_string()))?;
    let name = device.name().unwrap_or_else(|_| "Unknown".to_string());
    tracing::info!("Using audio device: {}", name);
    Ok(device)
}

/// Interleaved samples at the stream's rate and channel count.
struct AudioChunk {
    samples: Vec<f32>,
    timestamp: f64,
}

/// Everything that belongs to the source being played.
struct ActiveSource {
    url: String,
    decoder: AudioDecoder,
    resampler: Resampler,
    channels: u16,
    chunks_tx: Sender<AudioChunk>,
    /// Kept to drop queued chunks on seek
    chunks_rx: Receiver<AudioChunk>,
    /// Chunk the callback had no room for yet
    pending: Option<AudioChunk>,
    /// Decoder reached the end
    finished: bool,
    ended_reported: bool,
    _stream: Stream,
}

enum Wait {
    /// Nothing to do until a command arrives
    Block,
    /// Waiting on the device to drain or make room
    Poll,
    /// Keep decoding
    Busy,
}

struct OutputThread {
    device: Device,
    shared: Arc<RwLock<OutputShared>>,
    events: mpsc::UnboundedSender<BackendEvent>,
    http: Option<reqwest::blocking::Client>,
    source: Option<ActiveSource>,
    last_reported: f64,
}

impl OutputThread {
    fn new(
        device: Device,
        shared: Arc<RwLock<OutputShared>>,
        events: mpsc::UnboundedSender<BackendEvent>,
    ) -> Self {
        Self {
            device,
            shared,
            events,
            http: None,
            source: None,
            last_reported: 0.0,
        }
    }

    fn run(mut self, commands: Receiver<OutputCommand>) {
        loop {
            let command = match self.wait() {
                Wait::Block => match commands.recv() {
                    Ok(command) => Some(command),
                    Err(_) => break,
                },
                Wait::Poll => match commands.recv_timeout(Duration::from_millis(10)) {
                    Ok(command) => Some(command),
                    Err(RecvTimeoutError::Timeout) => None,
                    Err(RecvTimeoutError::Disconnected) => break,
                },
                Wait::Busy => match commands.try_recv() {
                    Ok(command) => Some(command),
                    Err(TryRecvError::Empty) => None,
                    Err(TryRecvError::Disconnected) => break,
                },
            };

            if let Some(command) = command
                && !self.handle(command)
            {
                break;
            }
            self.pump();
        }
        tracing::debug!("Audio output thread stopped");
    }

    fn wait(&self) -> Wait {
        let Some(source) = &self.source else {
            return Wait::Block;
        };
        if self.shared.read().paused || source.ended_reported {
            Wait::Block
        } else if source.finished || source.pending.is_some() {
            Wait::Poll
        } else {
            Wait::Busy
        }
    }

    /// Returns false on shutdown.
    fn handle(&mut self, command: OutputCommand) -> bool {
        match command {
            OutputCommand::Load(url) => {
                self.source = None;
                self.last_reported = 0.0;
                match self.open_source(&url) {
                    Ok(source) => {
                        let duration = source.decoder.duration();
                        if duration > 0.0 {
                            emit(&self.events, BackendEvent::DurationKnown(duration));
                        }
                        self.source = Some(source);
                    }
                    Err(e) => tracing::error!("Cannot play {}: {}", url, e),
                }
            }
            OutputCommand::Clear => self.source = None,
            OutputCommand::Play => {}
            OutputCommand::Seek(secs) => {
                if let Some(source) = self.source.as_mut() {
                    match source.decoder.seek(secs) {
                        Ok(()) => {
                            source.resampler.reset();
                            source.pending = None;
                            while source.chunks_rx.try_recv().is_ok() {}
                            source.finished = false;
                            source.ended_reported = false;
                            self.last_reported = secs;
                        }
                        Err(e) => tracing::warn!("Seek in {} failed: {}", source.url, e),
                    }
                }
            }
            OutputCommand::Shutdown => return false,
        }
        true
    }

    /// Decode one packet, or report progress and the end of the source.
    fn pump(&mut self) {
        let Some(source) = self.source.as_mut() else {
            return;
        };
        if self.shared.read().paused {
            return;
        }

        let position = self.shared.read().position;
        if (position - self.last_reported).abs() >= TIME_UPDATE_SECS {
            self.last_reported = position;
            emit(&self.events, BackendEvent::TimeUpdate);
        }

        if let Some(chunk) = source.pending.take() {
            if let Err(e) = source.chunks_tx.try_send(chunk) {
                source.pending = Some(e.into_inner());
            }
            return;
        }

        if source.finished {
            if !source.ended_reported && source.chunks_rx.is_empty() {
                source.ended_reported = true;
                tracing::debug!("Finished {}", source.url);
                emit(&self.events, BackendEvent::Ended);
            }
            return;
        }

        match source.decoder.decode_next() {
            Ok(Some(frame)) => {
                let samples = remix(&frame.samples, frame.channels, source.channels);
                let samples = source.resampler.process(&samples);
                if !samples.is_empty() {
                    let chunk = AudioChunk {
                        samples,
                        timestamp: frame.timestamp,
                    };
                    if let Err(e) = source.chunks_tx.try_send(chunk) {
                        source.pending = Some(e.into_inner());
                    }
                }
            }
            Ok(None) => source.finished = true,
            Err(e) => {
                tracing::error!("Decoding {} failed: {}", source.url, e);
                source.finished = true;
            }
        }
    }

    fn open_source(&mut self, url: &str) -> Result<ActiveSource, PlaybackBackendError> {
        let decoder = if let Some(path) = local_path(url) {
            AudioDecoder::open(&path)?
        } else if url.starts_with("http://") || url.starts_with("https://") {
            let media = self.fetch(url)?;
            AudioDecoder::from_source(media, url_extension(url))?
        } else {
            return Err(PlaybackBackendError::Decode(format!("unsupported source {url}")));
        };

        let (config, format) = self.stream_config(decoder.sample_rate(), decoder.channels())?;
        let resampler = Resampler::new(decoder.sample_rate(), config.sample_rate.0, config.channels)?;
        let (chunks_tx, chunks_rx) = bounded(QUEUED_CHUNKS);

        let shared = Arc::clone(&self.shared);
        let callback_rx = chunks_rx.clone();
        let stream = match format {
            SampleFormat::F32 => build_stream::<f32>(&self.device, &config, callback_rx, shared),
            SampleFormat::I16 => build_stream::<i16>(&self.device, &config, callback_rx, shared),
            SampleFormat::U16 => build_stream::<u16>(&self.device, &config, callback_rx, shared),
            other => {
                return Err(PlaybackBackendError::Output(format!(
                    "unsupported sample format {other:?}"
                )));
            }
        }
        .map_err(|e| PlaybackBackendError::Output(e.to_string()))?;
        stream
            .play()
            .map_err(|e| PlaybackBackendError::Output(e.to_string()))?;

        tracing::debug!(
            "Opened {} ({}Hz, {} channels -> {}Hz, {} channels)",
            url,
            decoder.sample_rate(),
            decoder.channels(),
            config.sample_rate.0,
            config.channels
        );

        Ok(ActiveSource {
            url: url.to_string(),
            decoder,
            resampler,
            channels: config.channels,
            chunks_tx,
            chunks_rx,
            pending: None,
            finished: false,
            ended_reported: false,
            _stream: stream,
        })
    }

    /// The device config closest to the source: its own rate and channel
    /// count when supported, otherwise the device default.
    fn stream_config(
        &self,
        sample_rate: u32,
        channels: u16,
    ) -> Result<(StreamConfig, SampleFormat), PlaybackBackendError> {
        if let Ok(mut configs) = self.device.supported_output_configs()
            && let Some(range) = configs.find(|c| {
                c.channels() == channels
                    && c.min_sample_rate().0 <= sample_rate
                    && c.max_sample_rate().0 >= sample_rate
            })
        {
            let config = range.with_sample_rate(cpal::SampleRate(sample_rate));
            return Ok((config.config(), config.sample_format()));
        }

        let config = self
            .device
            .default_output_config()
            .map_err(|e| PlaybackBackendError::Output(e.to_string()))?;
        Ok((config.config(), config.sample_format()))
    }

    /// Download `url`, whole when it is small enough to seek in.
    fn fetch(&mut self, url: &str) -> Result<Box<dyn MediaSource>, PlaybackBackendError> {
        let client = match &self.http {
            Some(client) => client.clone(),
            None => {
                let client = reqwest::blocking::Client::builder()
                    .user_agent(concat!("tunebridge/", env!("CARGO_PKG_VERSION")))
                    .connect_timeout(Duration::from_secs(10))
                    .build()
                    .map_err(|e| PlaybackBackendError::Output(e.to_string()))?;
                self.http = Some(client.clone());
                client
            }
        };

        let response = client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(|e| PlaybackBackendError::Decode(format!("{url}: {e}")))?;

        match response.content_length() {
            Some(len) if len <= MAX_BUFFERED_BYTES => {
                let bytes = response
                    .bytes()
                    .map_err(|e| PlaybackBackendError::Decode(format!("{url}: {e}")))?;
                Ok(Box::new(Cursor::new(bytes.to_vec())))
            }
            len => Ok(Box::new(HttpStream {
                response: Mutex::new(response),
                len,
            })),
        }
    }
}

fn emit(events: &mpsc::UnboundedSender<BackendEvent>, event: BackendEvent) {
    if events.send(event).is_err() {
        tracing::trace!("No one listens to backend events");
    }
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    chunks: Receiver<AudioChunk>,
    shared: Arc<RwLock<OutputShared>>,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut current: Option<(AudioChunk, usize)> = None;

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let (paused, volume) = {
                let state = shared.read();
                (state.paused, state.volume)
            };
            if paused {
                data.fill(T::from_sample(0.0f32));
                return;
            }

            let mut written = 0;
            while written < data.len() {
                if current.is_none() {
                    match chunks.try_recv() {
                        Ok(chunk) => {
                            shared.write().position = chunk.timestamp;
                            current = Some((chunk, 0));
                        }
                        Err(_) => {
                            data[written..].fill(T::from_sample(0.0f32));
                            return;
                        }
                    }
                }

                if let Some((chunk, offset)) = current.as_mut() {
                    let count = (chunk.samples.len() - *offset).min(data.len() - written);
                    for (out, sample) in data[written..written + count]
                        .iter_mut()
                        .zip(&chunk.samples[*offset..*offset + count])
                    {
                        *out = T::from_sample(sample * volume);
                    }
                    *offset += count;
                    written += count;
                    if *offset >= chunk.samples.len() {
                        current = None;
                    }
                }
            }
        },
        |err| tracing::error!("Audio stream error: {}", err),
        None,
    )
}

/// Progressive download read as it arrives. Not seekable.
struct HttpStream {
    response: Mutex<reqwest::blocking::Response>,
    len: Option<u64>,
}

impl Read for HttpStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.response.get_mut().read(buf)
    }
}

impl Seek for HttpStream {
    fn seek(&mut self, _pos: SeekFrom) -> std::io::Result<u64> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "stream is not seekable",
        ))
    }
}

impl MediaSource for HttpStream {
    fn is_seekable(&self) -> bool {
        false
    }

    fn byte_len(&self) -> Option<u64> {
        self.len
    }
}

/// Local path of a `file://` URL.
pub fn local_path(url: &str) -> Option<PathBuf> {
    let encoded = url.strip_prefix("file://")?;
    let decoded = urlencoding::decode(encoded).ok()?;
    Some(PathBuf::from(decoded.into_owned()))
}

/// File extension of a URL path, as a format hint.
pub fn url_extension(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let name = path.rsplit('/').next()?;
    let (_, ext) = name.rsplit_once('.')?;
    (!ext.is_empty() && ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .then_some(ext)
}

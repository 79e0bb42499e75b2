//! Audio decoding with symphonia.
//!
//! Sources are local files or anything else symphonia can read as a
//! [`MediaSource`] (buffered downloads, progressive HTTP streams).

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CODEC_TYPE_NULL, Decoder, DecoderOptions};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader, SeekMode, SeekTo};
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::{Time, TimeBase};

use crate::error::PlaybackBackendError;

/// One packet worth of decoded audio.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    /// Interleaved samples
    pub samples: Vec<f32>,
    pub channels: u16,
    /// Seconds from the start of the source
    pub timestamp: f64,
}

/// Decoder for the first audio track of a source.
pub struct AudioDecoder {
    reader: Box<dyn FormatReader>,
    decoder: Box<dyn Decoder>,
    track_id: u32,
    sample_rate: u32,
    channels: u16,
    duration: f64,
    time_base: Option<TimeBase>,
}

impl AudioDecoder {
    /// Open a local file.
    pub fn open(path: &Path) -> Result<Self, PlaybackBackendError> {
        let file = File::open(path)
            .map_err(|e| PlaybackBackendError::Decode(format!("{}: {}", path.display(), e)))?;
        let extension = path.extension().and_then(|e| e.to_str());
        Self::from_source(Box::new(file), extension)
    }

    /// Probe `source`, using `extension` as a format hint.
    pub fn from_source(
        source: Box<dyn MediaSource>,
        extension: Option<&str>,
    ) -> Result<Self, PlaybackBackendError> {
        let mss = MediaSourceStream::new(source, Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let format_opts = FormatOptions {
            enable_gapless: true,
            ..Default::default()
        };
        let detected = symphonia::default::get_probe()
            .format(&hint, mss, &format_opts, &MetadataOptions::default())
            .map_err(|e| PlaybackBackendError::Decode(e.to_string()))?;
        let reader = detected.format;

        let track = reader
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| PlaybackBackendError::Decode("no audio track".to_string()))?;

        let track_id = track.id;
        let params = track.codec_params.clone();
        let sample_rate = params
            .sample_rate
            .ok_or_else(|| PlaybackBackendError::Decode("unknown sample rate".to_string()))?;
        let channels = params.channels.map(|c| c.count() as u16).unwrap_or(2);

        let time_base = params.time_base;
        let duration = match (params.n_frames, time_base) {
            (Some(frames), Some(tb)) => seconds(tb.calc_time(frames)),
            (Some(frames), None) => frames as f64 / sample_rate as f64,
            // Live streams have no known length
            (None, _) => 0.0,
        };

        let decoder = symphonia::default::get_codecs()
            .make(&params, &DecoderOptions::default())
            .map_err(|e| PlaybackBackendError::Decode(e.to_string()))?;

        Ok(Self {
            reader,
            decoder,
            track_id,
            sample_rate,
            channels,
            duration,
            time_base,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Total length in seconds; 0 when unknown.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Jump to `secs` from the start.
    pub fn seek(&mut self, secs: f64) -> Result<(), PlaybackBackendError> {
        let target = if self.duration > 0.0 {
            secs.clamp(0.0, self.duration)
        } else {
            secs.max(0.0)
        };
        let seek_to = SeekTo::Time {
            time: Time::from(target),
            track_id: Some(self.track_id),
        };

        self.reader
            .seek(SeekMode::Accurate, seek_to)
            .map_err(|e| PlaybackBackendError::Decode(format!("seek failed: {e}")))?;
        self.decoder.reset();
        Ok(())
    }

    /// Decode the next packet of the track. `Ok(None)` at end of stream.
    pub fn decode_next(&mut self) -> Result<Option<DecodedFrame>, PlaybackBackendError> {
        loop {
            let packet = match self.reader.next_packet() {
                Ok(p) => p,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    return Ok(None);
                }
                Err(SymphoniaError::ResetRequired) => {
                    self.decoder.reset();
                    continue;
                }
                Err(e) => return Err(PlaybackBackendError::Decode(e.to_string())),
            };

            if packet.track_id() != self.track_id {
                continue;
            }

            let timestamp = self
                .time_base
                .map(|tb| seconds(tb.calc_time(packet.ts())))
                .unwrap_or(0.0);

            let decoded = match self.decoder.decode(&packet) {
                Ok(d) => d,
                // Corrupt frame, skip it
                Err(SymphoniaError::DecodeError(_)) => continue,
                Err(e) => return Err(PlaybackBackendError::Decode(e.to_string())),
            };

            let signal = *decoded.spec();
            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, signal);
            buffer.copy_interleaved_ref(decoded);

            return Ok(Some(DecodedFrame {
                samples: buffer.samples().to_vec(),
                channels: signal.channels.count() as u16,
                timestamp,
            }));
        }
    }
}

fn seconds(time: Time) -> f64 {
    time.seconds as f64 + time.frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// A 16-bit PCM WAV file of `frames` silent frames.
    fn wav(sample_rate: u32, channels: u16, frames: u32) -> Vec<u8> {
        let block_align = channels * 2;
        let data_len = frames * block_align as u32;
        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(36 + data_len).to_le_bytes());
        out.extend_from_slice(b"WAVEfmt ");
        out.extend_from_slice(&16u32.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes());
        out.extend_from_slice(&channels.to_le_bytes());
        out.extend_from_slice(&sample_rate.to_le_bytes());
        out.extend_from_slice(&(sample_rate * block_align as u32).to_le_bytes());
        out.extend_from_slice(&block_align.to_le_bytes());
        out.extend_from_slice(&16u16.to_le_bytes());
        out.extend_from_slice(b"data");
        out.extend_from_slice(&data_len.to_le_bytes());
        out.resize(out.len() + data_len as usize, 0);
        out
    }

    #[test]
    fn test_decoder_nonexistent_file() {
        let result = AudioDecoder::open(Path::new("/nonexistent/file.mp3"));
        assert!(matches!(result, Err(PlaybackBackendError::Decode(_))));
    }

    #[test]
    fn test_decoder_rejects_garbage() {
        let source = Box::new(Cursor::new(b"not audio at all".to_vec()));
        assert!(AudioDecoder::from_source(source, Some("mp3")).is_err());
    }

    #[test]
    fn test_decode_wav_to_end() {
        let source = Box::new(Cursor::new(wav(8000, 2, 8000)));
        let mut decoder = AudioDecoder::from_source(source, Some("wav")).unwrap();
        assert_eq!(decoder.sample_rate(), 8000);
        assert_eq!(decoder.channels(), 2);
        assert!((decoder.duration() - 1.0).abs() < 1e-6);

        let mut frames = 0;
        while let Some(frame) = decoder.decode_next().unwrap() {
            assert_eq!(frame.channels, 2);
            assert!(frame.samples.iter().all(|s| *s == 0.0));
            frames += frame.samples.len() / 2;
        }
        assert_eq!(frames, 8000);
    }

    #[test]
    fn test_seek_moves_timestamp() {
        let source = Box::new(Cursor::new(wav(8000, 1, 16000)));
        let mut decoder = AudioDecoder::from_source(source, Some("wav")).unwrap();
        decoder.seek(1.0).unwrap();
        let frame = decoder.decode_next().unwrap().unwrap();
        assert!(frame.timestamp >= 0.9);
    }
}

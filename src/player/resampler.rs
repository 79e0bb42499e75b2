//! Sample rate conversion to the output device rate, using rubato.

use rubato::{FftFixedIn, Resampler as _};

use crate::error::PlaybackBackendError;

/// Input frames per resampling pass.
const CHUNK_FRAMES: usize = 1024;

/// Converts interleaved audio between two rates. A pass-through when the
/// rates already match.
pub struct Resampler {
    inner: Option<FftFixedIn<f32>>,
    channels: usize,
    /// Per-channel input waiting for a full chunk
    pending: Vec<Vec<f32>>,
}

impl Resampler {
    pub fn new(
        input_rate: u32,
        output_rate: u32,
        channels: u16,
    ) -> Result<Self, PlaybackBackendError> {
        let channels = usize::from(channels.max(1));
        let inner = if input_rate == output_rate {
            None
        } else {
            tracing::debug!("Resampling {}Hz -> {}Hz", input_rate, output_rate);
            let fft = FftFixedIn::<f32>::new(
                input_rate as usize,
                output_rate as usize,
                CHUNK_FRAMES,
                2,
                channels,
            )
            .map_err(|e| PlaybackBackendError::Output(format!("resampler: {e}")))?;
            Some(fft)
        };

        Ok(Self {
            inner,
            channels,
            pending: vec![Vec::new(); channels],
        })
    }

    pub fn is_passthrough(&self) -> bool {
        self.inner.is_none()
    }

    /// Resample interleaved `input`. Output lags input by up to one chunk.
    pub fn process(&mut self, input: &[f32]) -> Vec<f32> {
        let Some(inner) = self.inner.as_mut() else {
            return input.to_vec();
        };

        for (i, sample) in input.iter().enumerate() {
            self.pending[i % self.channels].push(*sample);
        }

        let mut output = Vec::new();
        while self.pending[0].len() >= CHUNK_FRAMES {
            let chunk: Vec<Vec<f32>> = self
                .pending
                .iter_mut()
                .map(|ch| ch.drain(..CHUNK_FRAMES).collect())
                .collect();

            match inner.process(&chunk, None) {
                Ok(resampled) => interleave_into(&resampled, &mut output),
                Err(e) => tracing::warn!("Resampling failed: {}", e),
            }
        }
        output
    }

    /// Drop buffered input, after a seek.
    pub fn reset(&mut self) {
        for ch in &mut self.pending {
            ch.clear();
        }
        if let Some(inner) = self.inner.as_mut() {
            inner.reset();
        }
    }
}

fn interleave_into(planes: &[Vec<f32>], output: &mut Vec<f32>) {
    let frames = planes.first().map_or(0, Vec::len);
    output.reserve(frames * planes.len());
    for frame in 0..frames {
        for plane in planes {
            output.push(plane[frame]);
        }
    }
}

/// Map interleaved audio from `from` channels to `to` channels.
///
/// Downmixing to mono averages; otherwise channels are repeated in order.
pub fn remix(samples: &[f32], from: u16, to: u16) -> Vec<f32> {
    let (from, to) = (usize::from(from), usize::from(to));
    if from == to || from == 0 || to == 0 {
        return samples.to_vec();
    }

    let mut out = Vec::with_capacity(samples.len() / from * to);
    for frame in samples.chunks_exact(from) {
        if to == 1 {
            out.push(frame.iter().sum::<f32>() / from as f32);
        } else {
            out.extend((0..to).map(|c| frame[c % from]));
        }
    }
    out
}

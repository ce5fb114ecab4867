//! Audio sample-rate conversion using a rubato `FastFixedIn` resampler.
//!
//! ## Design
//!
//! The converter runs in both directions of a voice session, always on a
//! non-RT thread where allocation is allowed:
//!
//! - upstream: cpal captures at the device's native rate (commonly 48 kHz)
//!   and the agent link expects 16 kHz mono;
//! - downstream: the agent sends 24 kHz mono and the output device plays at
//!   its own native rate.
//!
//! When input rate == output rate, `RateConverter` is a passthrough — no
//! rubato session is created at all.
//!
//! ## Usage
//!
//! ```ignore
//! let mut rc = RateConverter::new(48_000, 16_000, 960)?;
//! let out = rc.process(&raw_samples); // Vec<f32> at 16 kHz
//! ```

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use tracing::error;

use crate::error::{Result, TamuError};

/// Converts f32 mono audio from one fixed sample rate to another.
pub struct RateConverter {
    /// `None` when input rate == output rate (passthrough mode).
    resampler: Option<FastFixedIn<f32>>,
    /// Accumulation buffer — holds partial input chunks between calls.
    input_buf: Vec<f32>,
    /// How many input samples rubato expects per process call.
    chunk_size: usize,
    /// Pre-allocated output buffer: `[1][output_frames_max]`.
    output_buf: Vec<Vec<f32>>,
}

impl RateConverter {
    /// Create a new converter.
    ///
    /// # Parameters
    /// - `input_rate`: Sample rate of the incoming audio (Hz).
    /// - `output_rate`: Sample rate to produce (Hz).
    /// - `chunk_size`: Input frame count per rubato call (e.g. `960`).
    ///
    /// # Errors
    /// Returns `TamuError::AudioDevice` if rubato fails to initialise.
    pub fn new(input_rate: u32, output_rate: u32, chunk_size: usize) -> Result<Self> {
        if input_rate == output_rate {
            return Ok(Self {
                resampler: None,
                input_buf: Vec::new(),
                chunk_size,
                output_buf: Vec::new(),
            });
        }

        let ratio = output_rate as f64 / input_rate as f64;

        let resampler = FastFixedIn::<f32>::new(
            ratio,
            1.0, // fixed ratio — no dynamic adjustment
            PolynomialDegree::Cubic,
            chunk_size,
            1, // mono
        )
        .map_err(|e| TamuError::AudioDevice(format!("resampler init: {e}")))?;

        let max_out = resampler.output_frames_max();
        let output_buf = vec![vec![0f32; max_out]; 1];

        tracing::info!(input_rate, output_rate, chunk_size, max_out, "resampling enabled");

        Ok(Self {
            resampler: Some(resampler),
            input_buf: Vec::new(),
            chunk_size,
            output_buf,
        })
    }

    /// Process incoming samples, returning resampled output (may be empty).
    ///
    /// Samples are accumulated internally until a full `chunk_size` block is
    /// available for rubato. Any remainder is kept for the next call.
    ///
    /// In passthrough mode (same rates), input is returned directly.
    pub fn process(&mut self, samples: &[f32]) -> Vec<f32> {
        let Some(ref mut resampler) = self.resampler else {
            return samples.to_vec();
        };

        self.input_buf.extend_from_slice(samples);

        let mut result = Vec::new();

        while self.input_buf.len() >= self.chunk_size {
            let input_slice = &self.input_buf[..self.chunk_size];

            match resampler.process_into_buffer(&[input_slice], &mut self.output_buf, None) {
                Ok((_consumed, produced)) => {
                    result.extend_from_slice(&self.output_buf[0][..produced]);
                }
                Err(e) => {
                    error!("resampler process error: {e}");
                }
            }

            self.input_buf.drain(..self.chunk_size);
        }

        result
    }

    /// Discard any accumulated partial input. Used when the stream is
    /// abandoned mid-chunk, e.g. on playback interruption.
    pub fn reset(&mut self) {
        self.input_buf.clear();
    }

    /// Returns `true` when input rate == output rate (no resampling occurs).
    pub fn is_passthrough(&self) -> bool {
        self.resampler.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn passthrough_identity() {
        let mut rc = RateConverter::new(16_000, 16_000, 960).unwrap();
        assert!(rc.is_passthrough());
        let samples: Vec<f32> = (0..480).map(|i| i as f32 * 0.001).collect();
        let out = rc.process(&samples);
        assert_eq!(out, samples);
    }

    #[test]
    fn downsample_48k_to_16k_correct_length() {
        let mut rc = RateConverter::new(48_000, 16_000, 960).unwrap();
        assert!(!rc.is_passthrough());
        // 960 input samples at 48 kHz → ~320 at 16 kHz
        let samples = vec![0.0f32; 960];
        let out = rc.process(&samples);
        assert!(!out.is_empty(), "expected non-empty output");
        let expected = 320usize;
        assert!(
            (out.len() as isize - expected as isize).unsigned_abs() <= 10,
            "output len={} expected≈{}",
            out.len(),
            expected
        );
    }

    #[test]
    fn upsample_24k_to_48k_preserves_duration() {
        let mut rc = RateConverter::new(24_000, 48_000, 1024).unwrap();
        // One second of agent audio should come out as roughly one second
        // at the output rate.
        let samples = vec![0.1f32; 24_000];
        let out = rc.process(&samples);
        let consumed = 24_000 - (24_000 % 1024);
        assert_relative_eq!(
            out.len() as f64 / consumed as f64,
            2.0,
            epsilon = 0.05
        );
    }

    #[test]
    fn partial_accumulation_returns_empty() {
        let mut rc = RateConverter::new(48_000, 16_000, 960).unwrap();
        // Fewer than chunk_size samples → nothing output yet
        let samples = vec![0.0f32; 500];
        let out = rc.process(&samples);
        assert!(
            out.is_empty(),
            "expected empty output for partial chunk, got {}",
            out.len()
        );
    }

    #[test]
    fn multiple_partial_chunks_accumulate() {
        let mut rc = RateConverter::new(48_000, 16_000, 960).unwrap();
        // Two 500-sample pushes = 1000 total ≥ 960 chunk_size → should produce output
        let out1 = rc.process(&vec![0.0f32; 500]);
        assert!(out1.is_empty());
        let out2 = rc.process(&vec![0.0f32; 500]);
        assert!(!out2.is_empty(), "second push should trigger processing");
    }

    #[test]
    fn reset_discards_partial_input() {
        let mut rc = RateConverter::new(48_000, 16_000, 960).unwrap();
        rc.process(&vec![0.0f32; 500]);
        rc.reset();
        let out = rc.process(&vec![0.0f32; 500]);
        assert!(out.is_empty(), "pending samples should have been discarded");
    }
}

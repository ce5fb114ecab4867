//! Lock-free SPSC ring buffers between the audio callbacks and worker threads.
//!
//! Two rings exist per voice session. The capture ring carries microphone
//! samples from the input callback to the upstream pump; the playback ring
//! carries decoded agent audio from the session task to the output callback.
//! `ringbuf::HeapRb<f32>` gives a wait-free `push_slice`/`pop_slice` safe to
//! call from the real-time audio callbacks.

use ringbuf::{traits::Split, HeapRb};

pub use ringbuf::traits::{Consumer, Observer, Producer};

/// Producer half of a ring — held by whichever side writes samples.
pub type AudioProducer = ringbuf::HeapProd<f32>;

/// Consumer half of a ring — held by whichever side reads samples.
pub type AudioConsumer = ringbuf::HeapCons<f32>;

/// Capture ring capacity: 2^20 f32 samples ≈ 21.8 s at 48 kHz. The upstream
/// pump drains every few milliseconds, so this only has to absorb short
/// stalls in the agent transport.
pub const CAPTURE_RING_CAPACITY: usize = 1 << 20;

/// Playback ring capacity: 2^22 f32 samples ≈ 87 s at 48 kHz. The agent
/// delivers speech faster than real time, so a long answer lands here almost
/// at once and drains at playback speed.
pub const PLAYBACK_RING_CAPACITY: usize = 1 << 22;

/// Create a matched producer/consumer pair for microphone capture.
pub fn create_capture_ring() -> (AudioProducer, AudioConsumer) {
    HeapRb::<f32>::new(CAPTURE_RING_CAPACITY).split()
}

/// Create a matched producer/consumer pair for agent audio playback.
pub fn create_playback_ring() -> (AudioProducer, AudioConsumer) {
    HeapRb::<f32>::new(PLAYBACK_RING_CAPACITY).split()
}

/// A contiguous block of mono PCM samples at a known sample rate.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Mono f32 samples in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g. 16000, 24000, 48000).
    pub sample_rate: u32,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Duration of this chunk in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Reassembles a stream of variably-sized sample slices into fixed-length
/// frames. The upstream protocol sends audio in frames of a fixed sample
/// count, while resampler output arrives in whatever lengths the converter
/// produces.
#[derive(Debug)]
pub struct FrameAccumulator {
    frame_len: usize,
    pending: Vec<f32>,
}

impl FrameAccumulator {
    pub fn new(frame_len: usize) -> Self {
        Self {
            frame_len,
            pending: Vec::with_capacity(frame_len * 2),
        }
    }

    /// Appends samples to the pending buffer.
    pub fn push(&mut self, samples: &[f32]) {
        self.pending.extend_from_slice(samples);
    }

    /// Takes one complete frame off the front, or `None` if fewer than
    /// `frame_len` samples are pending. Call in a loop to drain.
    pub fn next_frame(&mut self) -> Option<Vec<f32>> {
        if self.pending.len() < self.frame_len {
            return None;
        }
        let rest = self.pending.split_off(self.frame_len);
        Some(std::mem::replace(&mut self.pending, rest))
    }

    /// Samples waiting for the next frame boundary.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Discards anything pending. Used on session teardown.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_duration() {
        let chunk = AudioChunk::new(vec![0.0; 24_000], 24_000);
        assert!((chunk.duration_secs() - 1.0).abs() < 1e-9);
        assert!(!chunk.is_empty());
    }

    #[test]
    fn accumulator_assembles_across_pushes() {
        let mut acc = FrameAccumulator::new(4);
        acc.push(&[1.0, 2.0]);
        assert!(acc.next_frame().is_none());
        acc.push(&[3.0, 4.0, 5.0]);

        let frame = acc.next_frame().unwrap();
        assert_eq!(frame, vec![1.0, 2.0, 3.0, 4.0]);
        assert!(acc.next_frame().is_none());
        assert_eq!(acc.pending_len(), 1);
    }

    #[test]
    fn accumulator_drains_multiple_frames() {
        let mut acc = FrameAccumulator::new(3);
        acc.push(&[0.0; 10]);

        let mut frames = 0;
        while acc.next_frame().is_some() {
            frames += 1;
        }
        assert_eq!(frames, 3);
        assert_eq!(acc.pending_len(), 1);
    }

    #[test]
    fn accumulator_clear_discards_pending() {
        let mut acc = FrameAccumulator::new(4);
        acc.push(&[1.0, 2.0, 3.0]);
        acc.clear();
        assert_eq!(acc.pending_len(), 0);
        acc.push(&[9.0; 4]);
        assert_eq!(acc.next_frame().unwrap(), vec![9.0; 4]);
    }

    #[test]
    fn capture_ring_round_trip() {
        let (mut tx, mut rx) = create_capture_ring();
        let wrote = tx.push_slice(&[0.25; 512]);
        assert_eq!(wrote, 512);

        let mut out = vec![0.0f32; 512];
        let read = rx.pop_slice(&mut out);
        assert_eq!(read, 512);
        assert!(out.iter().all(|&s| (s - 0.25).abs() < f32::EPSILON));
    }
}

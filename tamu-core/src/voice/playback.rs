//! Agent speech playback.
//!
//! The agent streams speech faster than real time, so chunks queue ahead of
//! the playhead. Two pieces cooperate here:
//!
//! - [`PlaybackScheduler`] keeps the logical timeline: each chunk starts at
//!   the later of "now" and the previous chunk's end, so consecutive chunks
//!   are gapless and a chunk arriving after the queue drained starts
//!   immediately.
//! - [`SinkHandle`] realizes that timeline through an SPSC ring drained by
//!   the cpal output callback. Samples play strictly in push order, which is
//!   exactly the scheduler's order.
//!
//! An interruption discards everything: the ring is cleared and the
//! scheduler baseline drops back to the clock origin, so whatever the agent
//! says next starts at once.
//!
//! The output callback follows the same real-time rules as capture: no
//! allocation, no locks, no I/O. It only pops the ring and touches atomics.

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    FromSample, SampleFormat, SampleRate, Stream, StreamConfig,
};

use parking_lot::Mutex;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc,
};
use tracing::{debug, warn};

#[cfg(feature = "audio-cpal")]
use tracing::{error, info};

use crate::audio::resample::RateConverter;
use crate::buffering::{AudioChunk, AudioProducer, Producer};
use crate::error::{Result, TamuError};

#[cfg(feature = "audio-cpal")]
use crate::buffering::{create_playback_ring, AudioConsumer, Consumer};

/// Input frames per rubato call on the playback path.
const CONVERT_CHUNK: usize = 1024;

/// Gapless chunk timeline.
///
/// Times are seconds on the playback clock. The baseline starts at the
/// clock origin and [`reset`](Self::reset) drops it back there.
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    next_start: f64,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self { next_start: 0.0 }
    }

    /// Place a chunk of `duration` seconds on the timeline and return its
    /// start time: the later of `now` and the previous chunk's end.
    pub fn schedule(&mut self, now: f64, duration: f64) -> f64 {
        let start = self.next_start.max(now);
        self.next_start = start + duration;
        start
    }

    /// Drop the baseline back to the clock origin. The next chunk then
    /// starts at its arrival time.
    pub fn reset(&mut self) {
        self.next_start = 0.0;
    }

    /// End of the last scheduled chunk.
    pub fn next_start(&self) -> f64 {
        self.next_start
    }
}

/// Where decoded agent audio goes. The session task talks to this trait so
/// tests can substitute a recording fake for real speaker output.
pub trait PlaybackSink: Send + Sync {
    /// Queue one decoded chunk for gapless playback.
    fn enqueue(&self, chunk: AudioChunk);

    /// Discard all queued audio and rebase the timeline.
    fn interrupt(&self);

    /// Current playback clock position in seconds.
    fn position_secs(&self) -> f64;
}

struct SinkShared {
    producer: Mutex<AudioProducer>,
    /// Rebuilt lazily when the source rate changes; `(source_rate, converter)`.
    converter: Mutex<Option<(u32, RateConverter)>>,
    scheduler: Mutex<PlaybackScheduler>,
    discard: AtomicBool,
    frames_played: AtomicU64,
    dropped_samples: AtomicUsize,
    device_rate: u32,
}

/// Cheap `Send + Sync` handle to a running output stream.
#[derive(Clone)]
pub struct SinkHandle(Arc<SinkShared>);

impl SinkHandle {
    /// Total samples dropped because the playback ring was full.
    pub fn dropped_samples(&self) -> usize {
        self.0.dropped_samples.load(Ordering::Relaxed)
    }
}

impl PlaybackSink for SinkHandle {
    fn enqueue(&self, chunk: AudioChunk) {
        if chunk.is_empty() {
            return;
        }

        let converted = {
            let mut slot = self.0.converter.lock();
            let stale = !matches!(&*slot, Some((rate, _)) if *rate == chunk.sample_rate);
            if stale {
                match RateConverter::new(chunk.sample_rate, self.0.device_rate, CONVERT_CHUNK) {
                    Ok(rc) => *slot = Some((chunk.sample_rate, rc)),
                    Err(e) => {
                        warn!("playback resampler init failed: {e}");
                        return;
                    }
                }
            }
            let Some((_, rc)) = slot.as_mut() else {
                return;
            };
            rc.process(&chunk.samples)
        };

        let start = {
            let now = self.position_secs();
            self.0.scheduler.lock().schedule(now, chunk.duration_secs())
        };
        debug!(
            start_secs = start,
            samples = converted.len(),
            "queued agent audio"
        );

        let mut producer = self.0.producer.lock();
        let written = producer.push_slice(&converted);
        if written < converted.len() {
            let dropped = converted.len() - written;
            self.0.dropped_samples.fetch_add(dropped, Ordering::Relaxed);
            warn!("playback ring full: dropped {dropped} samples");
        }
    }

    fn interrupt(&self) {
        // The output callback clears the ring on its next tick; a chunk
        // arriving inside that window is dropped with the stale audio.
        self.0.discard.store(true, Ordering::Release);
        self.0.scheduler.lock().reset();
        if let Some((_, rc)) = self.0.converter.lock().as_mut() {
            rc.reset();
        }
    }

    fn position_secs(&self) -> f64 {
        self.0.frames_played.load(Ordering::Relaxed) as f64 / self.0.device_rate as f64
    }
}

/// Builds an output stream for one cpal sample format, spreading mono f32
/// from the ring across the device's channels.
#[cfg(feature = "audio-cpal")]
fn build_output_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut consumer: AudioConsumer,
    shared: Arc<SinkShared>,
    running: Arc<AtomicBool>,
) -> std::result::Result<Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + FromSample<f32>,
{
    let ch = config.channels as usize;
    device.build_output_stream(
        config,
        move |out: &mut [T], _info| {
            if shared.discard.swap(false, Ordering::AcqRel) {
                consumer.clear();
            }
            if !running.load(Ordering::Relaxed) {
                for slot in out.iter_mut() {
                    *slot = T::from_sample(0.0f32);
                }
                return;
            }
            for frame in out.chunks_mut(ch) {
                let value = T::from_sample(consumer.try_pop().unwrap_or(0.0));
                for slot in frame.iter_mut() {
                    *slot = value;
                }
            }
            shared
                .frames_played
                .fetch_add((out.len() / ch) as u64, Ordering::Relaxed);
        },
        |err| error!("playback stream error: {err}"),
        None,
    )
}

/// Owner of the speaker stream.
///
/// **Not `Send`** — like capture, `cpal::Stream` is bound to its creation
/// thread, so the voice bridge opens this inside `spawn_blocking` and keeps
/// it there. Session tasks use the [`SinkHandle`] instead.
pub struct DeviceSink {
    /// Kept alive so the stream is not dropped prematurely.
    #[cfg(feature = "audio-cpal")]
    _stream: Stream,
    handle: SinkHandle,
}

impl DeviceSink {
    /// Handle for the session task; clones share the same stream.
    pub fn handle(&self) -> SinkHandle {
        self.handle.clone()
    }
}

#[cfg(feature = "audio-cpal")]
impl DeviceSink {
    /// Open the system default output device.
    ///
    /// Must be called from the thread that will also drop this value,
    /// in practice inside `tokio::task::spawn_blocking`.
    pub fn open_default(running: Arc<AtomicBool>) -> Result<Self> {
        use cpal::traits::HostTrait;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(TamuError::NoDefaultOutputDevice)?;

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening output device"
        );

        let supported = device
            .default_output_config()
            .map_err(|e| TamuError::AudioDevice(e.to_string()))?;

        let device_rate = supported.sample_rate().0;
        let channels = supported.channels();

        info!(sample_rate = device_rate, channels, "playback config selected");

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(device_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let (producer, consumer) = create_playback_ring();
        let shared = Arc::new(SinkShared {
            producer: Mutex::new(producer),
            converter: Mutex::new(None),
            scheduler: Mutex::new(PlaybackScheduler::new()),
            discard: AtomicBool::new(false),
            frames_played: AtomicU64::new(0),
            dropped_samples: AtomicUsize::new(0),
            device_rate,
        });

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_output_stream::<f32>(
                &device,
                &config,
                consumer,
                Arc::clone(&shared),
                Arc::clone(&running),
            ),
            SampleFormat::I16 => build_output_stream::<i16>(
                &device,
                &config,
                consumer,
                Arc::clone(&shared),
                Arc::clone(&running),
            ),
            SampleFormat::U16 => build_output_stream::<u16>(
                &device,
                &config,
                consumer,
                Arc::clone(&shared),
                Arc::clone(&running),
            ),
            fmt => {
                return Err(TamuError::AudioStream(format!(
                    "unsupported sample format: {fmt:?}"
                )))
            }
        }
        .map_err(|e| TamuError::AudioStream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| TamuError::AudioStream(e.to_string()))?;

        Ok(Self {
            _stream: stream,
            handle: SinkHandle(shared),
        })
    }
}

/// Stub when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
impl DeviceSink {
    pub fn open_default(_running: Arc<AtomicBool>) -> Result<Self> {
        Err(TamuError::AudioStream(
            "compiled without audio-cpal feature".into(),
        ))
    }
}

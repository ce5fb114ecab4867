//! Microphone capture via the cpal backend.
//!
//! # Design constraints
//!
//! The cpal input callback runs on an OS audio thread at elevated (TIME_CRITICAL on
//! Windows) priority. It **must not**:
//! - Allocate heap memory
//! - Block on a mutex or condvar
//! - Perform I/O
//!
//! This module satisfies that contract by writing directly into an SPSC ring buffer
//! producer whose `push_slice` is lock-free and allocation-free. The matching
//! speaker-side stream lives in [`crate::voice::playback`] under the same rules.
//!
//! # Threading note
//!
//! `cpal::Stream` is `!Send` on most platforms (COM on Windows, CoreAudio on macOS).
//! `AudioCapture` therefore must be created and dropped on the same thread.
//! The voice bridge accomplishes this by calling `open_with_preference` inside
//! `spawn_blocking` and keeping the value on that thread for the whole session.

pub mod device;
pub mod resample;

#[cfg(feature = "audio-cpal")]
use cpal::{
    traits::{DeviceTrait, StreamTrait},
    SampleFormat, SampleRate, Stream, StreamConfig,
};

use crate::{
    buffering::AudioProducer,
    error::{Result, TamuError},
};
use std::sync::{
    atomic::AtomicBool,
    Arc,
};

#[cfg(feature = "audio-cpal")]
use crate::buffering::Producer;
#[cfg(feature = "audio-cpal")]
use std::sync::atomic::Ordering;
#[cfg(feature = "audio-cpal")]
use tracing::{error, info, warn};

/// Handle to an active microphone capture stream.
///
/// **Not `Send`** — `cpal::Stream` is bound to its creation thread on Windows/macOS.
/// Create and drop this type on the same OS thread.
pub struct AudioCapture {
    /// Kept alive so the stream is not dropped prematurely.
    #[cfg(feature = "audio-cpal")]
    _stream: Stream,
    /// Shared flag — set to `false` to signal the callback to no-op.
    running: Arc<AtomicBool>,
    /// Actual capture sample rate reported by the device (Hz).
    pub sample_rate: u32,
}

/// Builds an input stream for one cpal sample format, mixing interleaved
/// channels down to mono f32 and pushing into the capture ring.
#[cfg(feature = "audio-cpal")]
fn build_capture_stream<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    mut producer: AudioProducer,
    running: Arc<AtomicBool>,
    to_f32: fn(T) -> f32,
) -> std::result::Result<Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + Copy + Send + 'static,
{
    let ch = config.channels as usize;
    let mut mix_buf: Vec<f32> = Vec::new();
    device.build_input_stream(
        config,
        move |data: &[T], _info| {
            if !running.load(Ordering::Relaxed) {
                return;
            }
            if ch == 1 {
                mix_buf.resize(data.len(), 0.0);
                for (dst, &src) in mix_buf.iter_mut().zip(data) {
                    *dst = to_f32(src);
                }
            } else {
                let frames = data.len() / ch;
                mix_buf.resize(frames, 0.0);
                for f in 0..frames {
                    let base = f * ch;
                    let mut sum = 0f32;
                    for c in 0..ch {
                        sum += to_f32(data[base + c]);
                    }
                    mix_buf[f] = sum / ch as f32;
                }
            }
            let written = producer.push_slice(&mix_buf);
            if written < mix_buf.len() {
                warn!(
                    "capture ring full: dropped {} frames",
                    mix_buf.len() - written
                );
            }
        },
        |err| error!("capture stream error: {err}"),
        None,
    )
}

impl AudioCapture {
    /// Open an input device by preferred name, otherwise fall back to the
    /// default input device and then the first available device.
    #[cfg(feature = "audio-cpal")]
    pub fn open_with_preference(
        producer: AudioProducer,
        running: Arc<AtomicBool>,
        preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        use cpal::traits::HostTrait;

        let host = cpal::default_host();
        let mut selected_device = None;

        if let Some(preferred_name) = preferred_device_name {
            match host.input_devices() {
                Ok(mut devices) => {
                    selected_device = devices.find(|device| {
                        device
                            .name()
                            .map(|name| name == preferred_name)
                            .unwrap_or(false)
                    });

                    if selected_device.is_none() {
                        warn!(
                            "preferred input device '{}' not found, falling back",
                            preferred_name
                        );
                    }
                }
                Err(e) => {
                    warn!("failed to list input devices while resolving preference: {e}");
                }
            }
        }

        let device = if let Some(device) = selected_device {
            device
        } else if let Some(default) = host.default_input_device() {
            default
        } else {
            let mut devices = host
                .input_devices()
                .map_err(|e| TamuError::AudioDevice(e.to_string()))?;
            let fallback = devices.next().ok_or(TamuError::NoDefaultInputDevice)?;
            warn!("no default input device, falling back to first available input");
            fallback
        };

        info!(
            device = device.name().unwrap_or_default().as_str(),
            "opening input device"
        );

        let supported = device
            .default_input_config()
            .map_err(|e| TamuError::AudioDevice(e.to_string()))?;

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels();

        info!(sample_rate, channels, "capture config selected");

        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = match supported.sample_format() {
            SampleFormat::F32 => {
                build_capture_stream::<f32>(&device, &config, producer, Arc::clone(&running), |s| s)
            }
            SampleFormat::I16 => {
                build_capture_stream::<i16>(&device, &config, producer, Arc::clone(&running), |s| {
                    s as f32 / 32768.0
                })
            }
            SampleFormat::U16 => {
                build_capture_stream::<u16>(&device, &config, producer, Arc::clone(&running), |s| {
                    (s as f32 - 32768.0) / 32768.0
                })
            }
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
            running,
            sample_rate,
        })
    }

    /// Open the system default microphone and push f32 PCM frames into `producer`.
    ///
    /// Must be called from the thread that will also drop this value.
    /// In practice this means calling it inside `tokio::task::spawn_blocking`.
    ///
    /// # Errors
    /// Returns `TamuError::NoDefaultInputDevice` when no microphone is available,
    /// or `TamuError::AudioStream` if cpal fails to build the stream.
    #[cfg(feature = "audio-cpal")]
    pub fn open_default(producer: AudioProducer, running: Arc<AtomicBool>) -> Result<Self> {
        Self::open_with_preference(producer, running, None)
    }

    /// Stop: signal the callback to no-op on its next invocation.
    pub fn stop(&self) {
        self.running
            .store(false, std::sync::atomic::Ordering::Release);
    }
}

/// Stub when the `audio-cpal` feature is disabled.
#[cfg(not(feature = "audio-cpal"))]
impl AudioCapture {
    pub fn open_with_preference(
        _producer: AudioProducer,
        _running: Arc<AtomicBool>,
        _preferred_device_name: Option<&str>,
    ) -> Result<Self> {
        Err(TamuError::AudioStream(
            "compiled without audio-cpal feature".into(),
        ))
    }

    pub fn open_default(producer: AudioProducer, running: Arc<AtomicBool>) -> Result<Self> {
        Self::open_with_preference(producer, running, None)
    }
}

//! Voice session internals: the upstream capture pump and the downstream
//! dispatch loop.
//!
//! ```text
//!  mic callback ─▶ capture ring ─▶ run_capture_pump ─▶ outbound mpsc ─▶ ws writer
//!                                                          ▲
//!                                                 acks for tool calls
//!                                                          │
//!  ws reader ─▶ inbound mpsc ─▶ run (dispatch) ─┬─▶ field event broadcast
//!                                               └─▶ playback sink
//! ```
//!
//! The pump is a blocking loop on its own thread (it shares the thread that
//! owns the capture stream); dispatch is an async task. Both stop when the
//! shared `running` flag clears or their channel closes. Dispatch
//! additionally finalizes the whole session when the remote side closed it,
//! so a user-initiated `stop()` and an agent-initiated close converge on the
//! same teardown.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use super::SessionHandles;
use crate::audio::resample::RateConverter;
use crate::buffering::{AudioChunk, AudioConsumer, Consumer, FrameAccumulator};
use crate::ipc::events::{BridgeStatus, BridgeStatusEvent, FieldUpdateEvent};
use crate::record::FieldPatch;
use crate::voice::pcm;
use crate::voice::playback::PlaybackSink;
use crate::voice::protocol::{
    ClientMessage, ServerMessage, ToolCallPayload, TOOL_UPDATE_GUEST_FORM, UPSTREAM_SAMPLE_RATE,
};

/// Samples drained from the capture ring per pump iteration.
pub const DRAIN_CHUNK: usize = 960;

/// Pump sleep when the capture ring is empty (ms).
const SLEEP_EMPTY_MS: u64 = 5;

/// Counters for one bridge lifetime. Reset on every `start()`.
#[derive(Debug, Default)]
pub struct BridgeDiagnostics {
    /// Raw samples drained from the capture ring (device rate).
    pub samples_captured: AtomicUsize,
    /// Complete 16 kHz frames sent upstream.
    pub frames_sent: AtomicUsize,
    /// Recognised tool calls relayed as field updates.
    pub tool_calls: AtomicUsize,
    /// Agent audio chunks handed to the playback sink.
    pub agent_chunks: AtomicUsize,
    /// Interruption signals received.
    pub interruptions: AtomicUsize,
    /// Inbound frames dropped as undecodable.
    pub malformed_frames: AtomicUsize,
}

impl BridgeDiagnostics {
    pub fn reset(&self) {
        self.samples_captured.store(0, Ordering::Relaxed);
        self.frames_sent.store(0, Ordering::Relaxed);
        self.tool_calls.store(0, Ordering::Relaxed);
        self.agent_chunks.store(0, Ordering::Relaxed);
        self.interruptions.store(0, Ordering::Relaxed);
        self.malformed_frames.store(0, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            samples_captured: self.samples_captured.load(Ordering::Relaxed),
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            agent_chunks: self.agent_chunks.load(Ordering::Relaxed),
            interruptions: self.interruptions.load(Ordering::Relaxed),
            malformed_frames: self.malformed_frames.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`BridgeDiagnostics`].
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsSnapshot {
    pub samples_captured: usize,
    pub frames_sent: usize,
    pub tool_calls: usize,
    pub agent_chunks: usize,
    pub interruptions: usize,
    pub malformed_frames: usize,
}

/// Everything the capture pump needs, passed as one struct so the
/// spawn_blocking closure stays tidy.
pub struct CapturePumpContext {
    pub consumer: AudioConsumer,
    pub running: Arc<AtomicBool>,
    /// Native rate of the capture device (Hz).
    pub capture_rate: u32,
    /// Samples per upstream frame at 16 kHz.
    pub frame_samples: usize,
    pub outbound_tx: mpsc::Sender<ClientMessage>,
    pub diagnostics: Arc<BridgeDiagnostics>,
}

/// Blocking loop: drain the capture ring, resample to 16 kHz, cut into
/// fixed frames, base64-encode and hand to the writer task.
pub fn run_capture_pump(ctx: CapturePumpContext) {
    let CapturePumpContext {
        mut consumer,
        running,
        capture_rate,
        frame_samples,
        outbound_tx,
        diagnostics,
    } = ctx;

    let mut converter = match RateConverter::new(capture_rate, UPSTREAM_SAMPLE_RATE, DRAIN_CHUNK) {
        Ok(rc) => rc,
        Err(e) => {
            warn!("capture pump could not start: {e}");
            return;
        }
    };
    let mut frames = FrameAccumulator::new(frame_samples);
    let mut raw = vec![0f32; DRAIN_CHUNK];

    info!(capture_rate, frame_samples, "capture pump started");

    loop {
        if !running.load(Ordering::Relaxed) {
            break;
        }

        let drained = consumer.pop_slice(&mut raw);
        if drained == 0 {
            std::thread::sleep(Duration::from_millis(SLEEP_EMPTY_MS));
            continue;
        }
        diagnostics
            .samples_captured
            .fetch_add(drained, Ordering::Relaxed);

        let converted = converter.process(&raw[..drained]);
        if converted.is_empty() {
            continue;
        }
        frames.push(&converted);

        while let Some(frame) = frames.next_frame() {
            let message = ClientMessage::audio(pcm::encode_base64(&frame), UPSTREAM_SAMPLE_RATE);
            if outbound_tx.blocking_send(message).is_err() {
                info!("outbound channel closed, capture pump exiting");
                return;
            }
            diagnostics.frames_sent.fetch_add(1, Ordering::Relaxed);
        }
    }

    info!("capture pump stopped");
}

/// Everything the dispatch loop needs, passed as one struct so the task
/// body stays tidy.
pub struct SessionContext {
    pub inbound_rx: mpsc::Receiver<ServerMessage>,
    pub outbound_tx: mpsc::Sender<ClientMessage>,
    pub sink: Arc<dyn PlaybackSink>,
    pub field_tx: broadcast::Sender<FieldUpdateEvent>,
    pub status_tx: broadcast::Sender<BridgeStatusEvent>,
    pub status: Arc<Mutex<BridgeStatus>>,
    pub running: Arc<AtomicBool>,
    pub seq: Arc<AtomicU64>,
    pub diagnostics: Arc<BridgeDiagnostics>,
    pub session_slot: Arc<Mutex<Option<SessionHandles>>>,
}

/// Single handler for everything the agent sends. Exits when the inbound
/// channel closes (remote close, transport error, or local `stop()` having
/// aborted the reader).
pub async fn run(ctx: SessionContext) {
    let SessionContext {
        mut inbound_rx,
        outbound_tx,
        sink,
        field_tx,
        status_tx,
        status,
        running,
        seq,
        diagnostics,
        session_slot,
    } = ctx;

    info!("session dispatch started");

    while let Some(message) = inbound_rx.recv().await {
        if !running.load(Ordering::Relaxed) {
            break;
        }

        match message {
            ServerMessage::ToolCall { tool_call } => {
                let ToolCallPayload {
                    name,
                    args,
                    call_id,
                } = tool_call;

                if name == TOOL_UPDATE_GUEST_FORM {
                    match serde_json::from_value::<FieldPatch>(args) {
                        Ok(fields) => {
                            let event = FieldUpdateEvent {
                                seq: seq.fetch_add(1, Ordering::SeqCst),
                                call_id: call_id.clone(),
                                fields,
                            };
                            diagnostics.tool_calls.fetch_add(1, Ordering::Relaxed);
                            if field_tx.send(event).is_err() {
                                debug!("no field update subscribers");
                            }
                        }
                        Err(e) => {
                            diagnostics.malformed_frames.fetch_add(1, Ordering::Relaxed);
                            warn!(call_id = %call_id, "malformed tool call args: {e}");
                        }
                    }
                } else {
                    warn!(tool = %name, "ignoring unknown tool call");
                }

                // Every tool call is acknowledged, recognised or not.
                if outbound_tx.send(ClientMessage::ack(call_id)).await.is_err() {
                    debug!("outbound channel closed, ack dropped");
                }
            }

            ServerMessage::AudioChunk {
                audio_chunk,
                sample_rate,
            } => match pcm::decode_base64(&audio_chunk) {
                Ok(samples) => {
                    if samples.is_empty() {
                        continue;
                    }
                    diagnostics.agent_chunks.fetch_add(1, Ordering::Relaxed);
                    sink.enqueue(AudioChunk::new(samples, sample_rate));
                }
                Err(e) => {
                    diagnostics.malformed_frames.fetch_add(1, Ordering::Relaxed);
                    warn!("skipping malformed agent audio: {e}");
                }
            },

            ServerMessage::Interrupted { .. } => {
                sink.interrupt();
                diagnostics.interruptions.fetch_add(1, Ordering::Relaxed);
                info!("agent playback interrupted by visitor speech");
            }
        }
    }

    // Remote-initiated teardown. After a local stop() the flag is already
    // false and the slot is empty, so this is a no-op.
    if running.swap(false, Ordering::SeqCst) {
        if let Some(handles) = session_slot.lock().take() {
            handles.disarm();
        }
        *status.lock() = BridgeStatus::Disconnected;
        let _ = status_tx.send(BridgeStatusEvent {
            status: BridgeStatus::Disconnected,
            detail: Some("session closed by agent".into()),
        });
        info!("voice session closed by remote");
    }

    let snapshot = diagnostics.snapshot();
    info!(
        frames_sent = snapshot.frames_sent,
        tool_calls = snapshot.tool_calls,
        agent_chunks = snapshot.agent_chunks,
        interruptions = snapshot.interruptions,
        malformed_frames = snapshot.malformed_frames,
        "session dispatch finished"
    );
}

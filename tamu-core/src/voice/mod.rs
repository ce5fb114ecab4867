//! Voice bridge: public lifecycle facade over one realtime agent session.
//!
//! ```text
//!                  start()                          stop() / remote close
//! Disconnected ──────────────▶ Connecting ──▶ Active ─────────────────▶ Disconnected
//!       ▲                          │
//!       └──────── failure ◀────────┘   (microphone, transport or speaker setup)
//! ```
//!
//! One session at a time. A failed start tears down whatever was already
//! opened and leaves the bridge `Disconnected`; there is no automatic retry.
//! `stop()` on a disconnected bridge is a no-op.
//!
//! ## Threading
//!
//! `cpal::Stream` is `!Send`, so the capture stream and the speaker stream
//! each live on a dedicated blocking thread for the whole session; the
//! capture thread doubles as the upstream pump. The bridge itself is
//! `Send + Sync` (all state behind `Arc`), so Tauri commands can call it
//! from any thread.

pub mod pcm;
pub mod playback;
pub mod protocol;
pub mod session;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::audio::AudioCapture;
use crate::buffering::create_capture_ring;
use crate::error::{Result, TamuError};
use crate::ipc::events::{BridgeStatus, BridgeStatusEvent, FieldUpdateEvent};
use playback::DeviceSink;
use protocol::{ClientMessage, ServerMessage, UPSTREAM_FRAME_SAMPLES};
use session::{BridgeDiagnostics, CapturePumpContext, DiagnosticsSnapshot, SessionContext};

/// Broadcast channel capacity. Dropping events under heavy consumer lag is
/// preferable to blocking the session task.
const BROADCAST_CAP: usize = 256;

/// Capacity of the mpsc channels between transport tasks and the session.
const CHANNEL_CAP: usize = 256;

/// Tunables for the voice bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// WebSocket URL of the conversational agent.
    pub agent_url: String,
    /// Input device name; `None` uses the system default.
    pub preferred_input_device: Option<String>,
    /// Samples per upstream audio frame (at 16 kHz).
    pub frame_samples: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            agent_url: "ws://127.0.0.1:8765/session".to_string(),
            preferred_input_device: None,
            frame_samples: UPSTREAM_FRAME_SAMPLES,
        }
    }
}

/// Abort handle for the transport reader of the active session.
///
/// Only the reader needs an explicit abort: the dispatch loop ends when the
/// reader drops the inbound channel, and the writer ends once every
/// outbound sender is gone, flushing a close frame on the way out.
pub struct SessionHandles {
    reader: tokio::task::JoinHandle<()>,
}

impl SessionHandles {
    pub fn disarm(self) {
        self.reader.abort();
    }
}

/// Owns the lifecycle of the kiosk's voice conversation.
pub struct VoiceBridge {
    config: BridgeConfig,
    running: Arc<AtomicBool>,
    status: Arc<Mutex<BridgeStatus>>,
    field_tx: broadcast::Sender<FieldUpdateEvent>,
    status_tx: broadcast::Sender<BridgeStatusEvent>,
    seq: Arc<AtomicU64>,
    diagnostics: Arc<BridgeDiagnostics>,
    session: Arc<Mutex<Option<SessionHandles>>>,
}

impl VoiceBridge {
    pub fn new(config: BridgeConfig) -> Self {
        let (field_tx, _) = broadcast::channel(BROADCAST_CAP);
        let (status_tx, _) = broadcast::channel(BROADCAST_CAP);
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            status: Arc::new(Mutex::new(BridgeStatus::Disconnected)),
            field_tx,
            status_tx,
            seq: Arc::new(AtomicU64::new(0)),
            diagnostics: Arc::new(BridgeDiagnostics::default()),
            session: Arc::new(Mutex::new(None)),
        }
    }

    /// Start a session with the configured input device.
    pub async fn start(&self) -> Result<()> {
        self.start_with_device(self.config.preferred_input_device.clone())
            .await
    }

    /// Start a session, overriding the input device preference.
    ///
    /// Opens the microphone, connects to the agent, opens the speaker and
    /// spawns the session tasks, in that order. Any failure tears down the
    /// parts already opened and leaves the bridge `Disconnected`.
    pub async fn start_with_device(&self, preferred_device: Option<String>) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(TamuError::AlreadyActive);
        }

        self.diagnostics.reset();
        self.set_status(BridgeStatus::Connecting, None);

        match self.open_session(preferred_device).await {
            Ok(()) => {
                self.set_status(BridgeStatus::Active, None);
                info!("voice bridge active");
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                self.set_status(BridgeStatus::Disconnected, Some(e.to_string()));
                warn!("voice bridge start failed: {e}");
                Err(e)
            }
        }
    }

    async fn open_session(&self, preferred_device: Option<String>) -> Result<()> {
        let (capture_producer, capture_consumer) = create_capture_ring();
        let (outbound_tx, outbound_rx) = mpsc::channel::<ClientMessage>(CHANNEL_CAP);
        let (inbound_tx, inbound_rx) = mpsc::channel::<ServerMessage>(CHANNEL_CAP);

        // Microphone first: device problems surface before any network
        // traffic. The thread that opens the stream keeps it for the whole
        // session and runs the upstream pump.
        let (mic_tx, mic_rx) = oneshot::channel::<Result<u32>>();
        {
            let running = Arc::clone(&self.running);
            let outbound_tx = outbound_tx.clone();
            let diagnostics = Arc::clone(&self.diagnostics);
            let frame_samples = self.config.frame_samples;
            tokio::task::spawn_blocking(move || {
                let capture = match AudioCapture::open_with_preference(
                    capture_producer,
                    Arc::clone(&running),
                    preferred_device.as_deref(),
                ) {
                    Ok(capture) => capture,
                    Err(e) => {
                        let _ = mic_tx.send(Err(e));
                        return;
                    }
                };
                let capture_rate = capture.sample_rate;
                if mic_tx.send(Ok(capture_rate)).is_err() {
                    return;
                }
                session::run_capture_pump(CapturePumpContext {
                    consumer: capture_consumer,
                    running,
                    capture_rate,
                    frame_samples,
                    outbound_tx,
                    diagnostics,
                });
                // capture drops here, on its owning thread
            });
        }
        let capture_rate = match mic_rx.await {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(TamuError::AudioStream(
                    "capture thread exited before opening".into(),
                ))
            }
        };
        debug!(capture_rate, "microphone ready");

        let (ws, _) = connect_async(self.config.agent_url.as_str())
            .await
            .map_err(|e| TamuError::Transport(e.to_string()))?;
        if !self.running.load(Ordering::SeqCst) {
            // stop() raced the handshake
            return Err(TamuError::Transport("cancelled during connect".into()));
        }
        info!(url = %self.config.agent_url, "agent transport connected");

        // Speaker on its own parked thread, same ownership rules as capture.
        let (sink_tx, sink_rx) = oneshot::channel::<Result<playback::SinkHandle>>();
        {
            let running = Arc::clone(&self.running);
            tokio::task::spawn_blocking(move || {
                let device_sink = match DeviceSink::open_default(Arc::clone(&running)) {
                    Ok(sink) => sink,
                    Err(e) => {
                        let _ = sink_tx.send(Err(e));
                        return;
                    }
                };
                if sink_tx.send(Ok(device_sink.handle())).is_err() {
                    return;
                }
                while running.load(Ordering::Relaxed) {
                    std::thread::sleep(std::time::Duration::from_millis(50));
                }
                // device_sink (and its stream) drops here, on its owning thread
            });
        }
        let sink_handle = match sink_rx.await {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => return Err(e),
            Err(_) => {
                return Err(TamuError::AudioStream(
                    "playback thread exited before opening".into(),
                ))
            }
        };
        if !self.running.load(Ordering::SeqCst) {
            return Err(TamuError::Transport("cancelled during setup".into()));
        }
        debug!("speaker ready");

        let (mut ws_sink, mut ws_source) = ws.split();

        tokio::spawn(async move {
            let mut outbound_rx = outbound_rx;
            while let Some(message) = outbound_rx.recv().await {
                let text = match serde_json::to_string(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("unserializable outbound message: {e}");
                        continue;
                    }
                };
                if ws_sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
            let _ = ws_sink.send(Message::Close(None)).await;
            debug!("writer task finished");
        });

        let reader = tokio::spawn(async move {
            while let Some(frame) = ws_source.next().await {
                match frame {
                    Ok(Message::Text(text)) => {
                        match serde_json::from_str::<ServerMessage>(&text) {
                            Ok(message) => {
                                if inbound_tx.send(message).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => warn!("unrecognised agent frame: {e}"),
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {} // ping/pong/binary ignored
                    Err(e) => {
                        warn!("agent transport error: {e}");
                        break;
                    }
                }
            }
            debug!("reader task finished");
            // dropping inbound_tx here ends the dispatch loop
        });

        // The handle goes into the slot before dispatch spawns so its
        // teardown always finds it.
        *self.session.lock() = Some(SessionHandles { reader });

        tokio::spawn(session::run(SessionContext {
            inbound_rx,
            outbound_tx,
            sink: Arc::new(sink_handle),
            field_tx: self.field_tx.clone(),
            status_tx: self.status_tx.clone(),
            status: Arc::clone(&self.status),
            running: Arc::clone(&self.running),
            seq: Arc::clone(&self.seq),
            diagnostics: Arc::clone(&self.diagnostics),
            session_slot: Arc::clone(&self.session),
        }));

        Ok(())
    }

    /// Tear down the active session. Callable in any state; on a
    /// disconnected bridge this is a no-op.
    pub fn stop(&self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        let handles = self.session.lock().take();
        if !was_running && handles.is_none() {
            return;
        }
        if let Some(handles) = handles {
            handles.disarm();
        }
        self.set_status(BridgeStatus::Disconnected, None);
        info!("voice bridge stopped");
    }

    pub fn status(&self) -> BridgeStatus {
        *self.status.lock()
    }

    pub fn is_active(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Subscribe to form field updates produced by agent tool calls.
    pub fn subscribe_fields(&self) -> broadcast::Receiver<FieldUpdateEvent> {
        self.field_tx.subscribe()
    }

    /// Subscribe to bridge status transitions.
    pub fn subscribe_status(&self) -> broadcast::Receiver<BridgeStatusEvent> {
        self.status_tx.subscribe()
    }

    pub fn diagnostics(&self) -> DiagnosticsSnapshot {
        self.diagnostics.snapshot()
    }

    fn set_status(&self, new_status: BridgeStatus, detail: Option<String>) {
        *self.status.lock() = new_status;
        // Send errors just mean nobody is listening yet.
        let _ = self.status_tx.send(BridgeStatusEvent {
            status: new_status,
            detail,
        });
    }
}

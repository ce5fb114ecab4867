//! # tamu-core
//!
//! Reusable digital guest book engine SDK.
//!
//! ## Architecture
//!
//! ```text
//! Microphone → capture stream → SPSC RingBuffer → capture pump (blocking thread)
//!                                                       │ 16 kHz PCM16 frames
//!                                                 WebSocket agent
//!                                                       │ tool calls / audio
//!                                              session dispatch (tokio task)
//!                                              │                │
//!                         broadcast::Sender<FieldUpdateEvent>   PlaybackSink → Speaker
//! ```
//!
//! The audio callbacks are zero-alloc. All heap work happens on the pump
//! thread and the dispatch task. Form, signature pad and store are plain
//! synchronous state the embedding app wraps in its own locks.

#![forbid(unsafe_code)]
#![warn(clippy::all)]

pub mod audio;
pub mod buffering;
pub mod error;
pub mod form;
pub mod ipc;
pub mod recap;
pub mod record;
pub mod signature;
pub mod store;
pub mod voice;

// Convenience re-exports for downstream crates
pub use error::TamuError;
pub use form::{FormField, FormSnapshot, GuestForm};
pub use ipc::events::{BridgeStatus, BridgeStatusEvent, FieldUpdateEvent};
pub use record::{FieldPatch, VisitRecord};
pub use signature::{SignatureEvent, SignaturePad};
pub use store::GuestStore;
pub use voice::{BridgeConfig, VoiceBridge};

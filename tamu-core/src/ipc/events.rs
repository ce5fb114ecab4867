//! Event types emitted over the Tauri IPC channel.
//!
//! ## Channel names
//!
//! | Event | Channel |
//! |-------|---------|
//! | `FieldUpdateEvent` | `"tamu://fields"` |
//! | `BridgeStatusEvent` | `"tamu://status"` |
//!
//! The kiosk frontend mirrors these shapes in its TypeScript bindings.

use serde::{Deserialize, Serialize};

use crate::record::FieldPatch;

// ---------------------------------------------------------------------------
// Field update events
// ---------------------------------------------------------------------------

/// Emitted on channel `"tamu://fields"` when the agent fills form fields.
///
/// The patch is relayed exactly as received in the tool call; the host
/// applies it to the canonical form state before forwarding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldUpdateEvent {
    /// Monotonically increasing event sequence number.
    pub seq: u64,
    /// The agent's call id that produced this update.
    pub call_id: String,
    /// Present fields overwrite, absent fields are untouched.
    pub fields: FieldPatch,
}

// ---------------------------------------------------------------------------
// Bridge status events
// ---------------------------------------------------------------------------

/// Emitted on channel `"tamu://status"` when the voice bridge state changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeStatusEvent {
    pub status: BridgeStatus,
    /// Optional human-readable detail (e.g. error message).
    pub detail: Option<String>,
}

/// Connection state of the voice bridge.
///
/// Failures collapse back to `Disconnected`; there is no separate error
/// state and no automatic retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BridgeStatus {
    /// No session. The kiosk works manually.
    Disconnected,
    /// Audio and transport are being set up.
    Connecting,
    /// Live conversation with the agent.
    Active,
}

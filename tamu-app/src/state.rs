//! Tauri application state.
//!
//! `AppState` is managed via `app.manage(...)` and injected into command handlers
//! by Tauri's `State<'_, AppState>` extractor.

use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use parking_lot::Mutex;
use serde::Serialize;
use tamu_core::voice::session::DiagnosticsSnapshot;
use tamu_core::{GuestForm, GuestStore, SignaturePad, VoiceBridge};

use crate::settings::KioskSettings;

/// Shared application state, available in every `#[tauri::command]`.
pub struct AppState {
    /// The voice bridge. Wrapped in `Arc` so it can be cloned into the
    /// event-forwarding tasks started during setup.
    pub bridge: Arc<VoiceBridge>,
    /// Persistent guest book storage.
    pub store: Arc<GuestStore>,
    /// The in-progress entry. Shared with the field-forwarding task, which
    /// applies agent patches to it.
    pub form: Arc<Mutex<GuestForm>>,
    /// Signature capture surface backing the on-screen pad.
    pub pad: Arc<Mutex<SignaturePad>>,
    /// Persisted kiosk settings cache.
    pub settings: Arc<Mutex<KioskSettings>>,
    /// Absolute path to `settings.json`.
    pub settings_path: PathBuf,
    /// Count of visits submitted since launch.
    pub visits_submitted: Arc<AtomicUsize>,
    /// Count of agent field patches applied to the form.
    pub agent_field_updates: Arc<AtomicUsize>,
}

impl AppState {
    pub fn diagnostics_snapshot(&self) -> AppDiagnostics {
        AppDiagnostics {
            visits_submitted: self.visits_submitted.load(Ordering::Relaxed),
            agent_field_updates: self.agent_field_updates.load(Ordering::Relaxed),
            bridge: self.bridge.diagnostics(),
        }
    }
}

/// App-level counters plus the bridge counters, one payload for the UI.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDiagnostics {
    pub visits_submitted: usize,
    pub agent_field_updates: usize,
    pub bridge: DiagnosticsSnapshot,
}

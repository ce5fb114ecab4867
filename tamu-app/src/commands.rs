//! Tauri command handlers.
//!
//! Each function is registered with `tauri::Builder::invoke_handler` and
//! callable from the frontend via `invoke(...)`.

use std::sync::atomic::Ordering;

use serde::Serialize;
use tamu_core::audio::device::DeviceInfo;
use tamu_core::{recap, BridgeStatus, FormField, FormSnapshot, SignatureEvent, VisitRecord};
use tauri::State;
use tracing::info;

use crate::settings::{save_settings, KioskSettings};
use crate::state::{AppDiagnostics, AppState};

/// Open a voice session: microphone, agent transport, speaker.
#[tauri::command]
pub async fn start_voice(
    state: State<'_, AppState>,
    device_name: Option<String>,
) -> Result<(), String> {
    let preferred = device_name
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .or_else(|| state.settings.lock().preferred_input_device.clone());
    state
        .bridge
        .start_with_device(preferred)
        .await
        .map_err(|e| e.to_string())
}

/// Tear down the active voice session. Safe to call when idle.
#[tauri::command]
pub async fn stop_voice(state: State<'_, AppState>) -> Result<(), String> {
    state.bridge.stop();
    let diag = state.diagnostics_snapshot();
    info!(
        frames_sent = diag.bridge.frames_sent,
        tool_calls = diag.bridge.tool_calls,
        agent_field_updates = diag.agent_field_updates,
        "bridge diagnostics snapshot on stop"
    );
    Ok(())
}

/// Return the current bridge status.
#[tauri::command]
pub async fn get_voice_status(state: State<'_, AppState>) -> Result<BridgeStatus, String> {
    Ok(state.bridge.status())
}

/// Return app and bridge counters for the hidden staff panel.
#[tauri::command]
pub async fn get_diagnostics(state: State<'_, AppState>) -> Result<AppDiagnostics, String> {
    Ok(state.diagnostics_snapshot())
}

/// Return a list of available audio input devices.
#[tauri::command]
pub async fn list_audio_devices(_state: State<'_, AppState>) -> Result<Vec<DeviceInfo>, String> {
    Ok(tamu_core::audio::device::list_input_devices())
}

/// Return the current entry as shown on the form screen.
#[tauri::command]
pub async fn get_form(state: State<'_, AppState>) -> Result<FormSnapshot, String> {
    Ok(state.form.lock().snapshot())
}

/// Overwrite one form field with typed input and return the updated entry.
#[tauri::command]
pub async fn set_form_field(
    state: State<'_, AppState>,
    field: FormField,
    value: String,
) -> Result<FormSnapshot, String> {
    let mut form = state.form.lock();
    form.set_field(field, value);
    Ok(form.snapshot())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOutcome {
    pub record: VisitRecord,
    pub success_hold_ms: u64,
}

/// Validate and persist the current entry. On success the form resets and
/// the UI holds the confirmation screen for `successHoldMs`.
#[tauri::command]
pub async fn submit_visit(state: State<'_, AppState>) -> Result<SubmitOutcome, String> {
    let record = state
        .form
        .lock()
        .submit(&state.store)
        .map_err(|e| e.to_string())?;
    let _ = state.pad.lock().clear();
    state.visits_submitted.fetch_add(1, Ordering::Relaxed);
    info!(id = %record.id, "visit submitted from kiosk");
    Ok(SubmitOutcome {
        record,
        success_hold_ms: state.settings.lock().success_hold_ms,
    })
}

/// Attach the signature pad to a drawing surface of the given pixel size.
#[tauri::command]
pub async fn signature_mount(
    state: State<'_, AppState>,
    width: u32,
    height: u32,
) -> Result<(), String> {
    state.pad.lock().mount(width, height);
    Ok(())
}

/// Detach the signature pad; subsequent pointer input is ignored.
#[tauri::command]
pub async fn signature_unmount(state: State<'_, AppState>) -> Result<(), String> {
    state.pad.lock().unmount();
    Ok(())
}

#[tauri::command]
pub async fn signature_press(
    state: State<'_, AppState>,
    pointer_id: u64,
    x: f32,
    y: f32,
) -> Result<(), String> {
    state.pad.lock().press(pointer_id, x, y);
    Ok(())
}

#[tauri::command]
pub async fn signature_move(
    state: State<'_, AppState>,
    pointer_id: u64,
    x: f32,
    y: f32,
) -> Result<(), String> {
    state.pad.lock().move_to(pointer_id, x, y);
    Ok(())
}

/// Finish a stroke. Returns the refreshed signature image when one was
/// saved into the entry.
#[tauri::command]
pub async fn signature_release(
    state: State<'_, AppState>,
    pointer_id: u64,
) -> Result<Option<String>, String> {
    let event = state
        .pad
        .lock()
        .release(pointer_id)
        .map_err(|e| e.to_string())?;
    match event {
        Some(SignatureEvent::Saved(data_uri)) => {
            state.form.lock().set_signature(data_uri.clone());
            Ok(Some(data_uri))
        }
        Some(SignatureEvent::Cleared) | None => Ok(None),
    }
}

/// Wipe the pad and drop any saved signature from the entry.
#[tauri::command]
pub async fn signature_clear(state: State<'_, AppState>) -> Result<(), String> {
    let _ = state.pad.lock().clear();
    state.form.lock().clear_signature();
    Ok(())
}

/// Guest book entries, newest first, optionally filtered.
#[tauri::command]
pub async fn list_visits(
    state: State<'_, AppState>,
    query: Option<String>,
) -> Result<Vec<VisitRecord>, String> {
    let records = state.store.list().map_err(|e| e.to_string())?;
    let query = query.unwrap_or_default();
    Ok(recap::filter_records(&records, &query)
        .into_iter()
        .cloned()
        .collect())
}

/// Delete one entry by id. Unknown ids are ignored.
#[tauri::command]
pub async fn delete_visit(state: State<'_, AppState>, id: String) -> Result<(), String> {
    state.store.remove(&id).map_err(|e| e.to_string())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecapExport {
    pub filename: String,
    pub content: String,
    pub rows: usize,
}

/// Render the (optionally filtered) guest book as a dated CSV download.
#[tauri::command]
pub async fn export_recap(
    state: State<'_, AppState>,
    query: Option<String>,
) -> Result<RecapExport, String> {
    let records = state.store.list().map_err(|e| e.to_string())?;
    let query = query.unwrap_or_default();
    let filtered: Vec<VisitRecord> = recap::filter_records(&records, &query)
        .into_iter()
        .cloned()
        .collect();
    Ok(RecapExport {
        filename: recap::export_filename(),
        content: recap::csv_document(&filtered),
        rows: filtered.len(),
    })
}

/// Return persisted kiosk settings.
#[tauri::command]
pub async fn get_settings(state: State<'_, AppState>) -> Result<KioskSettings, String> {
    Ok(state.settings.lock().clone())
}

/// Persist kiosk settings. The agent URL is picked up on the next launch;
/// everything else applies immediately. An empty device name clears the
/// preference.
#[tauri::command]
pub async fn set_settings(
    state: State<'_, AppState>,
    agent_url: Option<String>,
    preferred_input_device: Option<String>,
    success_hold_ms: Option<u64>,
) -> Result<KioskSettings, String> {
    let mut settings = state.settings.lock();
    if let Some(url) = agent_url {
        settings.agent_url = url;
    }
    if let Some(device) = preferred_input_device {
        settings.preferred_input_device = Some(device);
    }
    if let Some(hold) = success_hold_ms {
        settings.success_hold_ms = hold;
    }
    settings.normalize();
    save_settings(&state.settings_path, &settings).map_err(|e| e.to_string())?;
    Ok(settings.clone())
}

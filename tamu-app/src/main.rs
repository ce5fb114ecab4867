//! Tamu kiosk application entry point.
//!
//! ## Runtime note
//!
//! Tauri v2 manages its own Tokio runtime internally.
//! We use `tauri::async_runtime::spawn` (not `tokio::spawn`) so our tasks
//! share Tauri's runtime and can safely call Tauri APIs.

#![cfg_attr(
    all(not(debug_assertions), target_os = "windows"),
    windows_subsystem = "windows"
)]

mod commands;
mod settings;
mod state;

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use parking_lot::Mutex;
use settings::{default_settings_path, load_settings};
use state::AppState;
use tamu_core::{BridgeConfig, GuestForm, GuestStore, SignaturePad, VoiceBridge};
use tauri::Emitter;
use tracing::info;

fn main() {
    // ── Tracing ───────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tamu=info".parse().unwrap()),
        )
        .init();

    info!("Tamu starting");

    let settings_path = default_settings_path();
    let kiosk_settings = load_settings(&settings_path);
    info!(
        settings_path = ?settings_path,
        agent_url = %kiosk_settings.agent_url,
        success_hold_ms = kiosk_settings.success_hold_ms,
        "kiosk settings loaded"
    );

    // ── Core state ────────────────────────────────────────────────────────
    let store = Arc::new(
        GuestStore::new(GuestStore::default_db_path())
            .expect("failed to initialize guest book storage"),
    );
    let bridge = Arc::new(VoiceBridge::new(BridgeConfig {
        agent_url: kiosk_settings.agent_url.clone(),
        preferred_input_device: kiosk_settings.preferred_input_device.clone(),
        ..BridgeConfig::default()
    }));
    let form = Arc::new(Mutex::new(GuestForm::new()));
    let pad = Arc::new(Mutex::new(SignaturePad::default()));
    let agent_field_updates = Arc::new(AtomicUsize::new(0));

    // ── Tauri app ─────────────────────────────────────────────────────────
    let bridge_for_setup = Arc::clone(&bridge);
    let form_for_setup = Arc::clone(&form);
    let field_updates_for_setup = Arc::clone(&agent_field_updates);

    tauri::Builder::default()
        .setup(move |app| {
            let app_handle = app.handle().clone();

            // ── Forward bridge events → Tauri event bus ───────────────────
            // Use tauri::async_runtime::spawn to share Tauri's Tokio runtime.

            let mut field_rx = bridge_for_setup.subscribe_fields();
            let handle1 = app_handle.clone();
            let form_clone = Arc::clone(&form_for_setup);
            let field_updates_clone = Arc::clone(&field_updates_for_setup);
            tauri::async_runtime::spawn(async move {
                loop {
                    match field_rx.recv().await {
                        Ok(event) => {
                            // The shared form is authoritative; the event is
                            // forwarded so the UI can animate the change.
                            form_clone.lock().apply_patch(&event.fields);
                            field_updates_clone.fetch_add(1, Ordering::Relaxed);
                            if let Err(e) = handle1.emit("tamu://fields", &event) {
                                tracing::warn!("emit fields: {e}");
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!("field receiver lagged by {n} events");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            });

            let mut status_rx = bridge_for_setup.subscribe_status();
            let handle2 = app_handle.clone();
            tauri::async_runtime::spawn(async move {
                loop {
                    match status_rx.recv().await {
                        Ok(event) => {
                            if let Err(e) = handle2.emit("tamu://status", &event) {
                                tracing::warn!("emit status: {e}");
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!("status receiver lagged by {n} events");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
            });

            Ok(())
        })
        .manage(AppState {
            bridge,
            store,
            form,
            pad,
            settings: Arc::new(Mutex::new(kiosk_settings)),
            settings_path,
            visits_submitted: Arc::new(AtomicUsize::new(0)),
            agent_field_updates,
        })
        .invoke_handler(tauri::generate_handler![
            commands::start_voice,
            commands::stop_voice,
            commands::get_voice_status,
            commands::get_diagnostics,
            commands::list_audio_devices,
            commands::get_form,
            commands::set_form_field,
            commands::submit_visit,
            commands::signature_mount,
            commands::signature_unmount,
            commands::signature_press,
            commands::signature_move,
            commands::signature_release,
            commands::signature_clear,
            commands::list_visits,
            commands::delete_visit,
            commands::export_recap,
            commands::get_settings,
            commands::set_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running Tauri application");
}

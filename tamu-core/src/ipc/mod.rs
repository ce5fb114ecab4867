//! IPC types serialised over the Tauri event bus.
//!
//! All types derive `serde::Serialize` + `serde::Deserialize` so they can be
//! emitted via `app.emit(...)` and mirrored in the frontend bindings.

pub mod events;

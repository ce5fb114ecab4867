//! Persistent kiosk settings (JSON file in app data directory).

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

const DEFAULT_AGENT_URL: &str = "ws://127.0.0.1:8765/session";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[serde(default)]
pub struct KioskSettings {
    /// WebSocket URL of the conversational agent. Applied on the next app
    /// launch; the running bridge keeps the URL it was built with.
    pub agent_url: String,
    /// Microphone to use when starting a voice session.
    pub preferred_input_device: Option<String>,
    /// How long the success screen stays up after a submitted visit.
    pub success_hold_ms: u64,
}

impl Default for KioskSettings {
    fn default() -> Self {
        Self {
            agent_url: DEFAULT_AGENT_URL.into(),
            preferred_input_device: None,
            success_hold_ms: 2_000,
        }
    }
}

impl KioskSettings {
    pub fn normalize(&mut self) {
        self.agent_url = normalize_agent_url(&self.agent_url);
        self.success_hold_ms = self.success_hold_ms.clamp(500, 10_000);
        self.preferred_input_device = self
            .preferred_input_device
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
    }
}

pub fn normalize_agent_url(raw: &str) -> String {
    let normalized = raw.trim();
    if normalized.is_empty() {
        DEFAULT_AGENT_URL.into()
    } else {
        normalized.into()
    }
}

pub fn default_settings_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Lattice Labs")
            .join("Tamu")
            .join("settings.json")
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                std::env::var_os("HOME")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
                    .join(".local")
                    .join("share")
            })
            .join("tamu")
            .join("settings.json")
    }
}

pub fn load_settings(path: &Path) -> KioskSettings {
    let mut settings = fs::read_to_string(path)
        .ok()
        .and_then(|raw| serde_json::from_str::<KioskSettings>(&raw).ok())
        .unwrap_or_default();
    settings.normalize();
    settings
}

pub fn save_settings(path: &Path, settings: &KioskSettings) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(std::io::Error::other)?;
    fs::write(path, json)
}

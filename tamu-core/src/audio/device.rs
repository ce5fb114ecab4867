//! Audio input device enumeration for the kiosk settings screen.
//!
//! The guest counter usually has one USB gooseneck or headset microphone
//! plugged in next to whatever the mainboard exposes. The heuristics here
//! exist to steer the selection away from loopback-style capture devices
//! that would feed the agent its own playback.

use serde::{Deserialize, Serialize};

/// Metadata about an audio input device.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfo {
    /// Human-readable device name reported by the OS.
    pub name: String,
    /// Whether this is the system default input device.
    pub is_default: bool,
    /// Heuristic flag for devices that likely capture system/output audio.
    pub is_loopback_like: bool,
    /// Heuristic recommendation for the visitor-facing microphone.
    pub is_recommended: bool,
}

const LOOPBACK_KEYWORDS: &[&str] = &[
    "stereo mix",
    "what u hear",
    "what you hear",
    "loopback",
    "monitor of",
    "virtual output",
    "speakers (",
    "headphones (",
];

const MIC_KEYWORDS: &[&str] = &[
    "microphone",
    "mic",
    "headset",
    "array",
    "usb",
    "webcam",
    "gooseneck",
    "line in",
];

/// Best-effort heuristic for loopback/system-output capture devices.
pub fn is_loopback_like_name(name: &str) -> bool {
    let lowered = name.trim().to_ascii_lowercase();
    LOOPBACK_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// Score a device name for use as the visitor microphone. Higher is better;
/// loopback-like devices score below everything else.
pub fn input_preference_score(name: &str, is_default: bool) -> i32 {
    let lowered = name.trim().to_ascii_lowercase();
    let mut score = 0;
    if is_loopback_like_name(&lowered) {
        score -= 10;
    }
    if MIC_KEYWORDS.iter().any(|k| lowered.contains(k)) {
        score += 4;
    }
    if is_default {
        score += 2;
    }
    score
}

/// List all available audio input devices, recommended-first.
///
/// Returns an empty `Vec` if cpal is unavailable or no devices exist.
#[cfg(feature = "audio-cpal")]
pub fn list_input_devices() -> Vec<DeviceInfo> {
    use cpal::traits::{DeviceTrait, HostTrait};

    let host = cpal::default_host();
    let default_name = host.default_input_device().and_then(|d| d.name().ok());

    let devices = match host.input_devices() {
        Ok(devices) => devices,
        Err(e) => {
            tracing::warn!("failed to enumerate input devices: {e}");
            return vec![];
        }
    };

    let mut list = devices
        .enumerate()
        .map(|(idx, device)| {
            let name = device
                .name()
                .unwrap_or_else(|_| format!("Input Device {}", idx + 1));
            let is_default = default_name.as_deref() == Some(name.as_str());
            let is_loopback_like = is_loopback_like_name(&name);
            DeviceInfo {
                name,
                is_default,
                is_loopback_like,
                is_recommended: false,
            }
        })
        .collect::<Vec<_>>();

    if let Some(best) = list
        .iter_mut()
        .max_by_key(|d| input_preference_score(&d.name, d.is_default))
    {
        best.is_recommended = true;
    }

    list.sort_by_key(|d| {
        (
            !d.is_recommended,
            d.is_loopback_like,
            !d.is_default,
            d.name.to_ascii_lowercase(),
        )
    });
    list
}

#[cfg(not(feature = "audio-cpal"))]
pub fn list_input_devices() -> Vec<DeviceInfo> {
    vec![]
}

#[cfg(test)]
mod tests {
    use super::{input_preference_score, is_loopback_like_name};

    #[test]
    fn detects_common_loopback_names() {
        assert!(is_loopback_like_name("Stereo Mix (Realtek Audio)"));
        assert!(is_loopback_like_name("Monitor of Built-in Audio"));
        assert!(is_loopback_like_name("Speakers (High Definition Audio Device)"));
        assert!(!is_loopback_like_name("Microphone (USB PnP Audio Device)"));
    }

    #[test]
    fn prefers_mic_over_loopback_and_default_over_plain() {
        let mic = input_preference_score("Microphone (USB PnP Audio Device)", false);
        let loopback = input_preference_score("Stereo Mix (Realtek Audio)", true);
        let plain = input_preference_score("Analog Input", false);
        assert!(mic > plain);
        assert!(plain > loopback);
    }
}

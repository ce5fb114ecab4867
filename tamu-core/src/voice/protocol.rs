//! Wire protocol for the realtime agent link.
//!
//! All frames are JSON text over a single WebSocket. Shapes are keyed by
//! their fields rather than a type tag, so both enums deserialize
//! `#[serde(untagged)]` with the variants tried in declaration order:
//!
//! | direction | shape |
//! |-----------|-------|
//! | client → agent | `{"audio_chunk": "<base64 pcm16le>", "sample_rate": 16000}` |
//! | client → agent | `{"call_id": "...", "result": "ok"}` |
//! | agent → client | `{"tool_call": {"name": "...", "args": {...}, "call_id": "..."}}` |
//! | agent → client | `{"audio_chunk": "<base64 pcm16le>", "sample_rate": 24000}` |
//! | agent → client | `{"interrupted": true}` |
//!
//! Frames that match none of the shapes are logged and skipped by the
//! session, never fatal.

use serde::{Deserialize, Serialize};

/// Tool name the agent calls to fill guest form fields.
pub const TOOL_UPDATE_GUEST_FORM: &str = "update_guest_form";

/// Sample rate of microphone audio sent upstream (Hz).
pub const UPSTREAM_SAMPLE_RATE: u32 = 16_000;

/// Sample rate the agent uses for its speech audio (Hz).
pub const AGENT_SAMPLE_RATE: u32 = 24_000;

/// Samples per upstream audio frame.
pub const UPSTREAM_FRAME_SAMPLES: usize = 4096;

/// Frames sent from the kiosk to the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClientMessage {
    /// One frame of microphone audio.
    AudioChunk {
        audio_chunk: String,
        sample_rate: u32,
    },
    /// Acknowledgment for a received tool call.
    ToolResponse { call_id: String, result: String },
}

impl ClientMessage {
    pub fn audio(encoded: String, sample_rate: u32) -> Self {
        Self::AudioChunk {
            audio_chunk: encoded,
            sample_rate,
        }
    }

    /// The fixed `"ok"` acknowledgment for `call_id`.
    pub fn ack(call_id: String) -> Self {
        Self::ToolResponse {
            call_id,
            result: "ok".to_string(),
        }
    }
}

/// One tool invocation from the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallPayload {
    pub name: String,
    /// Arguments as raw JSON; parsed into a typed patch only when the tool
    /// name is recognised.
    pub args: serde_json::Value,
    pub call_id: String,
}

/// Frames received from the agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerMessage {
    /// Structured intent, e.g. form field updates.
    ToolCall { tool_call: ToolCallPayload },
    /// One chunk of agent speech audio.
    AudioChunk {
        audio_chunk: String,
        sample_rate: u32,
    },
    /// The visitor started talking over the agent; discard queued playback.
    Interrupted { interrupted: bool },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn client_audio_chunk_shape() {
        let msg = ClientMessage::audio("AAAA".into(), UPSTREAM_SAMPLE_RATE);
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            value,
            json!({ "audio_chunk": "AAAA", "sample_rate": 16000 })
        );
    }

    #[test]
    fn client_ack_shape() {
        let msg = ClientMessage::ack("call-7".into());
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value, json!({ "call_id": "call-7", "result": "ok" }));
    }

    #[test]
    fn server_tool_call_parses() {
        let raw = r#"{"tool_call":{"name":"update_guest_form","args":{"name":"Budi"},"call_id":"c1"}}"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        match msg {
            ServerMessage::ToolCall { tool_call } => {
                assert_eq!(tool_call.name, TOOL_UPDATE_GUEST_FORM);
                assert_eq!(tool_call.call_id, "c1");
                assert_eq!(tool_call.args["name"], "Budi");
            }
            other => panic!("expected ToolCall, got {other:?}"),
        }
    }

    #[test]
    fn server_audio_chunk_parses() {
        let raw = r#"{"audio_chunk":"UEsA","sample_rate":24000}"#;
        let msg: ServerMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(
            msg,
            ServerMessage::AudioChunk {
                audio_chunk: "UEsA".into(),
                sample_rate: AGENT_SAMPLE_RATE,
            }
        );
    }

    #[test]
    fn server_interrupted_parses() {
        let msg: ServerMessage = serde_json::from_str(r#"{"interrupted":true}"#).unwrap();
        assert_eq!(msg, ServerMessage::Interrupted { interrupted: true });
    }

    #[test]
    fn unknown_server_shape_is_rejected() {
        assert!(serde_json::from_str::<ServerMessage>(r#"{"transcript":"halo"}"#).is_err());
        assert!(serde_json::from_str::<ServerMessage>(r#"{}"#).is_err());
    }
}

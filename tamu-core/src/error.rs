use thiserror::Error;

/// All errors produced by tamu-core.
#[derive(Debug, Error)]
pub enum TamuError {
    #[error("audio device error: {0}")]
    AudioDevice(String),

    #[error("audio stream error: {0}")]
    AudioStream(String),

    #[error("no default input device found")]
    NoDefaultInputDevice,

    #[error("no default output device found")]
    NoDefaultOutputDevice,

    #[error("agent transport error: {0}")]
    Transport(String),

    #[error("voice bridge is already active")]
    AlreadyActive,

    #[error("required field is empty: {0}")]
    MissingField(&'static str),

    #[error("a signature is required before submitting")]
    SignatureRequired,

    #[error("signature encode error: {0}")]
    SignatureEncode(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, TamuError>;

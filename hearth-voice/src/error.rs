//! Voice error types.

use thiserror::Error;

/// Errors that can occur while synthesizing or storing audio.
#[derive(Debug, Error)]
pub enum VoiceError {
    /// HTTP request failed.
    #[error("TTS request failed: {0}")]
    RequestFailed(String),

    /// Speaker sample could not be uploaded.
    #[error("Speaker upload failed: {0}")]
    UploadFailed(String),

    /// The server reported a failed generation.
    #[error("Audio generation failed: {0}")]
    GenerationFailed(String),

    /// A server response could not be understood.
    #[error("Failed to parse TTS response: {0}")]
    ParseError(String),

    /// TTS server is unavailable.
    #[error("TTS server unavailable: {0}")]
    Unavailable(String),

    /// Reading a speaker sample or writing audio failed.
    #[error("Audio I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for VoiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            VoiceError::Unavailable(err.to_string())
        } else {
            VoiceError::RequestFailed(err.to_string())
        }
    }
}

impl From<serde_json::Error> for VoiceError {
    fn from(err: serde_json::Error) -> Self {
        VoiceError::ParseError(err.to_string())
    }
}

/// Convenience result type for voice operations.
pub type Result<T> = std::result::Result<T, VoiceError>;

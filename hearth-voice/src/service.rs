//! The speech-synthesis seam.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::Result;

/// What to say, in whose voice, in what mood.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisRequest<'a> {
    /// Text to speak.
    pub text: &'a str,
    /// Audio sample identifying the voice.
    pub speaker_reference: &'a Path,
    /// Free-text emotion label of the reply.
    pub emotion: &'a str,
}

/// Where the synthesized audio ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioPayload {
    /// Audio held in memory.
    Bytes(Vec<u8>),
    /// Audio written to a temporary file owned by the caller from now on.
    File(PathBuf),
}

/// Result of one synthesis call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    /// The audio.
    pub payload: AudioPayload,
    /// Seed the generator used.
    pub seed: u64,
}

/// A text-to-speech endpoint.
#[async_trait]
pub trait SpeechSynthesisService: Send + Sync {
    /// Speak `request.text` in the voice of `request.speaker_reference`.
    ///
    /// # Errors
    ///
    /// Any transport, server or I/O failure.
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<SynthesizedAudio>;
}

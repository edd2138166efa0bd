//! Scripted synthesis service for exercising the dispatcher and turn logic
//! without a voice server.

use std::collections::VecDeque;
use std::path::PathBuf;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{Result, VoiceError};
use crate::service::{AudioPayload, SpeechSynthesisService, SynthesisRequest, SynthesizedAudio};

/// Audio returned once the script runs out.
pub const DEFAULT_AUDIO: &[u8] = b"scripted-audio";

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesisCall {
    /// Text to speak.
    pub text: String,
    /// Speaker sample passed in.
    pub speaker_reference: PathBuf,
    /// Emotion label passed in.
    pub emotion: String,
}

/// Answers from a queue; afterwards with [`DEFAULT_AUDIO`], or with an
/// error if built by [`ScriptedSynthesis::failing`].
#[derive(Debug, Default)]
pub struct ScriptedSynthesis {
    queue: Mutex<VecDeque<Result<SynthesizedAudio>>>,
    fail_when_exhausted: bool,
    calls: Mutex<Vec<SynthesisCall>>,
}

impl ScriptedSynthesis {
    /// A script that always produces [`DEFAULT_AUDIO`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A service that fails every call.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_when_exhausted: true,
            ..Self::default()
        }
    }

    /// Queue in-memory audio.
    #[must_use]
    pub fn with_audio(self, bytes: Vec<u8>) -> Self {
        self.queue.lock().push_back(Ok(SynthesizedAudio {
            payload: AudioPayload::Bytes(bytes),
            seed: 0,
        }));
        self
    }

    /// Queue audio delivered as a temporary file.
    #[must_use]
    pub fn with_file(self, path: PathBuf) -> Self {
        self.queue.lock().push_back(Ok(SynthesizedAudio {
            payload: AudioPayload::File(path),
            seed: 0,
        }));
        self
    }

    /// Queue a failure.
    #[must_use]
    pub fn with_error(self, err: VoiceError) -> Self {
        self.queue.lock().push_back(Err(err));
        self
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<SynthesisCall> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl SpeechSynthesisService for ScriptedSynthesis {
    async fn synthesize(&self, request: &SynthesisRequest<'_>) -> Result<SynthesizedAudio> {
        self.calls.lock().push(SynthesisCall {
            text: request.text.to_string(),
            speaker_reference: request.speaker_reference.to_path_buf(),
            emotion: request.emotion.to_string(),
        });

        if let Some(scripted) = self.queue.lock().pop_front() {
            return scripted;
        }
        if self.fail_when_exhausted {
            return Err(VoiceError::Unavailable("scripted outage".into()));
        }
        Ok(SynthesizedAudio {
            payload: AudioPayload::Bytes(DEFAULT_AUDIO.to_vec()),
            seed: 0,
        })
    }
}

//! Audio Dispatcher — speaker resolution, synthesis and output placement.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use hearth_core::CharacterId;
use hearth_core::config::VoiceConfig;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::service::{AudioPayload, SpeechSynthesisService, SynthesisRequest};

/// Timestamp format of output file names; one-second resolution.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Turns replies into audio files.
///
/// Output files are named `{character_id}_{timestamp}.{ext}`. Two replies
/// for the same character within one second share a name and the later one
/// overwrites the earlier.
pub struct AudioDispatcher {
    synth: Arc<dyn SpeechSynthesisService>,
    voice_dir: PathBuf,
    default_voice: String,
    voice_extension: String,
    output_dir: PathBuf,
    output_extension: String,
}

impl std::fmt::Debug for AudioDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioDispatcher")
            .field("voice_dir", &self.voice_dir)
            .field("output_dir", &self.output_dir)
            .finish_non_exhaustive()
    }
}

impl AudioDispatcher {
    /// Dispatcher over `synth` with paths from the `[voice]` section.
    #[must_use]
    pub fn new(synth: Arc<dyn SpeechSynthesisService>, config: &VoiceConfig) -> Self {
        Self {
            synth,
            voice_dir: config.voice_dir.clone(),
            default_voice: config.default_voice.clone(),
            voice_extension: config.voice_extension.clone(),
            output_dir: config.output_dir.clone(),
            output_extension: config.output_extension.clone(),
        }
    }

    /// Speaker sample for `id`: its own, else the default, else none.
    #[must_use]
    pub fn resolve_speaker(&self, id: &CharacterId) -> Option<PathBuf> {
        let own = self
            .voice_dir
            .join(format!("{}.{}", id.as_str(), self.voice_extension));
        if own.is_file() {
            return Some(own);
        }
        let fallback = self.voice_dir.join(&self.default_voice);
        if fallback.is_file() {
            debug!(character = %id, voice = %fallback.display(), "Using default voice");
            return Some(fallback);
        }
        None
    }

    /// Output path for a reply by `id` produced at `now`.
    #[must_use]
    pub fn output_path(&self, id: &CharacterId, now: DateTime<Local>) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}.{}",
            id.as_str(),
            now.format(TIMESTAMP_FORMAT),
            self.output_extension
        ))
    }

    /// Voice `text` for `id` and return the written file.
    ///
    /// Never fails: empty text, a missing speaker sample or any synthesis
    /// or I/O error yields `None`.
    pub async fn dispatch(&self, id: &CharacterId, text: &str, emotion: &str) -> Option<PathBuf> {
        if text.trim().is_empty() {
            debug!(character = %id, "Nothing to synthesize");
            return None;
        }
        let Some(speaker) = self.resolve_speaker(id) else {
            warn!(character = %id, voice_dir = %self.voice_dir.display(), "No speaker sample, skipping synthesis");
            return None;
        };
        match self.synthesize_to_file(id, text, emotion, &speaker).await {
            Ok(path) => Some(path),
            Err(e) => {
                warn!(character = %id, error = %e, "Synthesis failed, reply stays silent");
                None
            }
        }
    }

    async fn synthesize_to_file(
        &self,
        id: &CharacterId,
        text: &str,
        emotion: &str,
        speaker: &Path,
    ) -> Result<PathBuf> {
        let request = SynthesisRequest {
            text,
            speaker_reference: speaker,
            emotion,
        };
        let audio = self.synth.synthesize(&request).await?;

        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_path(id, Local::now());
        match audio.payload {
            AudioPayload::Bytes(bytes) => tokio::fs::write(&path, bytes).await?,
            AudioPayload::File(tmp) => place_file(&tmp, &path).await?,
        }
        info!(character = %id, path = %path.display(), seed = audio.seed, "Reply voiced");
        Ok(path)
    }
}

/// Move `from` to `to`, replacing `to`. Falls back to copy and remove when
/// the two are on different filesystems.
async fn place_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if tokio::fs::rename(from, to).await.is_ok() {
        return Ok(());
    }
    tokio::fs::copy(from, to).await?;
    if let Err(e) = tokio::fs::remove_file(from).await {
        debug!(path = %from.display(), error = %e, "Could not remove synthesis temp file");
    }
    Ok(())
}

//! Wiring a [`TurnOrchestrator`] from a [`HearthConfig`].

use std::sync::Arc;

use hearth_core::config::HearthConfig;
use hearth_core::persistence::open_backend;
use hearth_core::roster::Roster;
use hearth_core::{HearthError, MemoryStore};
use hearth_llm::{LlmClient, LlmError, LlmProvider};
use hearth_voice::{AudioDispatcher, VoiceError, ZonosClient};
use thiserror::Error;
use tracing::info;

use crate::orchestrator::TurnOrchestrator;

/// Errors while assembling the orchestrator.
#[derive(Debug, Error)]
pub enum SetupError {
    /// Storage or roster could not be opened.
    #[error(transparent)]
    Store(#[from] HearthError),

    /// The completion provider is misconfigured.
    #[error(transparent)]
    Llm(#[from] LlmError),

    /// The voice client could not be built.
    #[error(transparent)]
    Voice(#[from] VoiceError),
}

/// Completion client described by the `[llm]` section.
///
/// # Errors
///
/// Returns [`LlmError::ConfigError`] for an unknown provider or a missing
/// API key.
pub fn llm_client(config: &HearthConfig) -> Result<LlmClient, LlmError> {
    let llm = &config.llm;
    let provider = LlmProvider::from_name(&llm.provider, &llm.base_url, llm.api_key.as_deref())?;
    Ok(LlmClient::new(provider, llm.model.clone(), llm.max_retries)
        .with_temperature(llm.temperature)
        .with_timeout(llm.request_timeout_ms))
}

impl TurnOrchestrator {
    /// Open storage, load the roster and connect the configured services.
    ///
    /// # Errors
    ///
    /// Any storage, roster, provider or voice-client setup failure.
    pub fn from_config(config: &HearthConfig) -> Result<Self, SetupError> {
        config.memory.validate()?;

        let store = MemoryStore::from_arc(Arc::from(open_backend(&config.persistence)?));
        let roster = if config.roster.sync_voices {
            Roster::load_and_sync(
                &config.roster.path,
                &config.voice.voice_dir,
                &config.voice.voice_extension,
            )?
        } else {
            Roster::load(&config.roster.path)?
        };
        let llm = llm_client(config)?;

        let mut orchestrator =
            TurnOrchestrator::new(config.memory.clone(), roster, store, Arc::new(llm));
        if config.voice.enabled {
            let zonos = ZonosClient::from_config(&config.voice)?;
            orchestrator =
                orchestrator.with_audio(AudioDispatcher::new(Arc::new(zonos), &config.voice));
        }

        info!(
            backend = %config.persistence.backend,
            provider = %config.llm.provider,
            voice = config.voice.enabled,
            "Turn orchestrator ready"
        );
        Ok(orchestrator)
    }
}

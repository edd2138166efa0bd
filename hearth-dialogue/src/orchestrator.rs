//! Turn Orchestrator — one user utterance in, one voiced reply out.

use std::path::PathBuf;
use std::sync::Arc;

use hearth_core::config::MemoryConfig;
use hearth_core::context;
use hearth_core::error::Result;
use hearth_core::roster::Roster;
use hearth_core::{CharacterId, MemoryEntry, MemoryStore};
use hearth_llm::CompletionService;
use hearth_llm::prompt::{NEUTRAL_EMOTION, classify_emotion_prompt, normalize_emotion};
use hearth_voice::AudioDispatcher;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::compaction::compact;
use crate::reflection::reflect;

/// Outcome of one turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnResult {
    /// The character's reply, or an error description if the reply failed.
    pub agent_text: String,
    /// Classified emotion of the exchange.
    pub emotion_label: String,
    /// Voiced reply, if synthesis succeeded.
    pub audio_path: Option<PathBuf>,
}

/// Sequences memory, completion and voice for dialogue turns.
///
/// Built once from a read-only configuration snapshot and shared across
/// requests; all per-character state lives in the [`MemoryStore`].
pub struct TurnOrchestrator {
    memory: MemoryConfig,
    roster: Roster,
    store: MemoryStore,
    llm: Arc<dyn CompletionService>,
    audio: Option<AudioDispatcher>,
}

impl std::fmt::Debug for TurnOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnOrchestrator")
            .field("memory", &self.memory)
            .field("characters", &self.roster.len())
            .field("voiced", &self.audio.is_some())
            .finish_non_exhaustive()
    }
}

impl TurnOrchestrator {
    /// Orchestrator without voice output.
    #[must_use]
    pub fn new(
        memory: MemoryConfig,
        roster: Roster,
        store: MemoryStore,
        llm: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            memory,
            roster,
            store,
            llm,
            audio: None,
        }
    }

    /// Voice replies through `audio`.
    #[must_use]
    pub fn with_audio(mut self, audio: AudioDispatcher) -> Self {
        self.audio = Some(audio);
        self
    }

    /// The memory store, for history, likes and resets.
    #[must_use]
    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    /// The character roster.
    #[must_use]
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Handle one utterance addressed to `id`.
    ///
    /// Loading through persisting runs inside the character's critical
    /// section; synthesis runs after it is released.
    ///
    /// # Errors
    ///
    /// Only storage failures (an invalid id, a failed load or a failed
    /// persist). Nothing from this turn is stored then.
    pub async fn handle_turn(&self, id: &CharacterId, user_text: &str) -> Result<TurnResult> {
        let mut session = self.store.session(id).await?;
        let profile = self.roster.profile(id);
        let name = profile.display_name.as_str();

        let system = context::system_prompt(&profile, session.log(), self.memory.context_window);
        let agent_text = match self.llm.complete(user_text, Some(&system)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(character = %id, error = %e, "Reply failed");
                format!("Error: {e}")
            }
        };

        let emotion_prompt = classify_emotion_prompt(user_text, name, &agent_text);
        let emotion_label = match self.llm.complete(&emotion_prompt, None).await {
            Ok(raw) => normalize_emotion(&raw),
            Err(e) => {
                warn!(character = %id, error = %e, "Emotion classification failed");
                NEUTRAL_EMOTION.to_string()
            }
        };

        session.append(MemoryEntry::dialogue(user_text, &agent_text, &emotion_label));
        reflect(
            self.llm.as_ref(),
            session.log_mut(),
            self.memory.reflect_every,
            name,
        )
        .await;
        compact(self.llm.as_ref(), session.log_mut(), &self.memory, name).await;
        session.persist()?;
        let entries = session.log().len();
        drop(session);

        debug!(character = %id, entries, emotion = %emotion_label, "Turn stored");

        let audio_path = match &self.audio {
            Some(audio) => audio.dispatch(id, &agent_text, &emotion_label).await,
            None => None,
        };

        info!(
            character = %id,
            emotion = %emotion_label,
            voiced = audio_path.is_some(),
            "Turn complete"
        );
        Ok(TurnResult {
            agent_text,
            emotion_label,
            audio_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::persistence::InMemoryStore;
    use hearth_llm::testing::ScriptedCompletion;

    fn orchestrator(llm: ScriptedCompletion) -> TurnOrchestrator {
        TurnOrchestrator::new(
            MemoryConfig::default(),
            Roster::new(),
            MemoryStore::new(InMemoryStore::new()),
            Arc::new(llm),
        )
    }

    #[tokio::test]
    async fn reply_and_emotion_are_recorded() {
        let orch = orchestrator(
            ScriptedCompletion::new()
                .with_response("Stay back.")
                .with_response(" wary \n"),
        );
        let id = CharacterId::new("jace");
        let result = orch.handle_turn(&id, "Hello?").await.expect("turn");

        assert_eq!(result.agent_text, "Stay back.");
        assert_eq!(result.emotion_label, "wary");
        assert_eq!(result.audio_path, None);

        let log = orch.store().snapshot(&id).expect("snapshot");
        assert_eq!(
            log.entries(),
            &[MemoryEntry::dialogue("Hello?", "Stay back.", "wary")]
        );
    }

    #[tokio::test]
    async fn unknown_character_uses_fallback_profile() {
        let llm = Arc::new(ScriptedCompletion::new().with_fallback("ok"));
        let orch = TurnOrchestrator::new(
            MemoryConfig::default(),
            Roster::new(),
            MemoryStore::new(InMemoryStore::new()),
            llm.clone(),
        );
        orch.handle_turn(&CharacterId::new("martha"), "hi")
            .await
            .expect("turn");

        let calls = llm.calls();
        let system = calls[0].system_prompt.as_deref().expect("system prompt");
        assert!(system.starts_with("You are Martha, a survivor.\nSpeaking Style: neutral, functional\n"));
        assert_eq!(calls[1].user_text, "Classify emotion: Player: hi | Martha: ok");
    }
}

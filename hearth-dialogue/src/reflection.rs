//! Runs due reflections through the completion service.

use hearth_core::MemoryLog;
use hearth_core::reflection;
use hearth_llm::CompletionService;
use tracing::{info, warn};

/// Append a reflection to `log` if one is due. Returns whether one was
/// written. A failed completion call writes nothing.
pub async fn reflect(
    llm: &dyn CompletionService,
    log: &mut MemoryLog,
    reflect_every: usize,
    agent_name: &str,
) -> bool {
    let Some(request) = reflection::plan(log, reflect_every, agent_name) else {
        return false;
    };
    match llm.complete(&request.prompt(), None).await {
        Ok(text) => {
            info!(
                agent = agent_name,
                turns = request.turn_count,
                "Reflection recorded"
            );
            request.record(log, text);
            true
        }
        Err(e) => {
            warn!(
                agent = agent_name,
                turns = request.turn_count,
                error = %e,
                "Reflection skipped"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::MemoryEntry;
    use hearth_llm::testing::ScriptedCompletion;

    fn log_with(n: usize) -> MemoryLog {
        (0..n)
            .map(|i| MemoryEntry::dialogue(format!("u{i}"), format!("a{i}"), "neutral"))
            .collect()
    }

    #[tokio::test]
    async fn writes_reflection_when_due() {
        let llm = ScriptedCompletion::new().with_response("The roads remember.");
        let mut log = log_with(5);
        assert!(reflect(&llm, &mut log, 5, "Jace").await);
        assert_eq!(log.last(), Some(&MemoryEntry::reflection("The roads remember.")));

        let calls = llm.calls();
        assert!(calls[0].user_text.starts_with("Reflect poetically: Player: u0 Jace: a0; "));
        assert_eq!(calls[0].system_prompt, None);
    }

    #[tokio::test]
    async fn not_due_makes_no_call() {
        let llm = ScriptedCompletion::new().with_fallback("x");
        let mut log = log_with(4);
        assert!(!reflect(&llm, &mut log, 5, "Jace").await);
        assert_eq!(llm.call_count(), 0);
        assert_eq!(log.len(), 4);
    }

    #[tokio::test]
    async fn failure_leaves_log_alone() {
        let llm = ScriptedCompletion::failing();
        let mut log = log_with(5);
        assert!(!reflect(&llm, &mut log, 5, "Jace").await);
        assert_eq!(log.len(), 5);
    }
}

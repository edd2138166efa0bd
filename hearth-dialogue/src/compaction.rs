//! Runs compactions through the completion service.

use hearth_core::MemoryLog;
use hearth_core::compaction;
use hearth_core::config::MemoryConfig;
use hearth_llm::CompletionService;
use tracing::{info, warn};

/// Compact `log` in place if it is over bounds. Returns whether it was
/// compacted.
///
/// When the summary call fails the log is left as it is; it is still over
/// bounds and the next turn tries again.
pub async fn compact(
    llm: &dyn CompletionService,
    log: &mut MemoryLog,
    config: &MemoryConfig,
    agent_name: &str,
) -> bool {
    let Some(plan) = compaction::plan(log, config, agent_name) else {
        return false;
    };

    let summary = match plan.prompt() {
        Some(prompt) => match llm.complete(&prompt, None).await {
            Ok(summary) => summary,
            Err(e) => {
                warn!(
                    agent = agent_name,
                    entries = log.len(),
                    error = %e,
                    "Compaction postponed, summary failed"
                );
                return false;
            }
        },
        None => String::new(),
    };

    let before = log.len();
    let (dropped, dropped_dialogue) = (plan.dropped, plan.dropped_dialogue);
    *log = plan.apply(summary);
    info!(
        agent = agent_name,
        before,
        after = log.len(),
        dropped,
        dropped_dialogue,
        "Memory compacted into a core belief"
    );
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::MemoryEntry;
    use hearth_llm::testing::ScriptedCompletion;

    fn turns(n: usize) -> MemoryLog {
        (0..n)
            .map(|i| MemoryEntry::dialogue(format!("u{i}"), format!("a{i}"), "neutral"))
            .collect()
    }

    #[tokio::test]
    async fn over_bounds_log_is_compacted() {
        let llm = ScriptedCompletion::new().with_response("I trust no one.");
        let original = turns(55);
        let mut log = original.clone();

        assert!(compact(&llm, &mut log, &MemoryConfig::default(), "Jace").await);
        assert_eq!(log.len(), 21);
        assert_eq!(log.entries()[0], MemoryEntry::core_belief("I trust no one."));
        assert_eq!(&log.entries()[1..], &original.entries()[35..]);
        assert!(llm.calls()[0].user_text.starts_with("Summarize into a core belief: Player: u0 Jace: a0"));
    }

    #[tokio::test]
    async fn failed_summary_keeps_log() {
        let llm = ScriptedCompletion::failing();
        let original = turns(51);
        let mut log = original.clone();
        assert!(!compact(&llm, &mut log, &MemoryConfig::default(), "Jace").await);
        assert_eq!(log, original);
    }

    #[tokio::test]
    async fn prefix_without_dialogue_skips_the_call() {
        let llm = ScriptedCompletion::new();
        let mut log: MemoryLog = (0..31)
            .map(|i| MemoryEntry::reflection(format!("r{i}")))
            .chain((0..20).map(|i| MemoryEntry::dialogue(format!("u{i}"), "a", "n")))
            .collect();

        assert!(compact(&llm, &mut log, &MemoryConfig::default(), "Jace").await);
        assert_eq!(llm.call_count(), 0);
        assert_eq!(log.entries()[0], MemoryEntry::core_belief(""));
        assert_eq!(log.len(), 21);
    }
}

//! Compaction Engine — "What I hold on to".
//!
//! When a log grows past `max_entries`, everything except the most recent
//! `retain_count` entries is folded into a single core belief:
//!
//! ```text
//! [e0 … e(n-r-1)] [e(n-r) … e(n-1)]   →   [CoreBelief] [e(n-r) … e(n-1)]
//!  summarised        kept verbatim
//! ```
//!
//! Only dialogue turns from the discarded prefix reach the summary prompt;
//! reflections and older core beliefs in that prefix are dropped. Retained
//! entries keep their order, and compaction never adds anything other than
//! the one core belief.
//!
//! Planning is pure; the caller runs the summary prompt and hands the
//! answer to [`CompactionPlan::apply`].

use crate::config::MemoryConfig;
use crate::context;
use crate::types::{MemoryEntry, MemoryLog};

/// Instruction prefixed to the transcript of a summarisation prompt.
pub const SUMMARIZE_INSTRUCTION: &str = "Summarize into a core belief: ";

/// A pending compaction of one log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompactionPlan {
    /// Entries removed from the front of the log.
    pub dropped: usize,
    /// Dialogue turns among the removed entries.
    pub dropped_dialogue: usize,
    /// Transcript of the removed dialogue turns, empty if there were none.
    pub transcript: String,
    retained: Vec<MemoryEntry>,
}

impl CompactionPlan {
    /// Whether the summary needs a completion call. When the discarded
    /// prefix held no dialogue, the core belief is stored with empty text.
    #[must_use]
    pub fn needs_summary(&self) -> bool {
        self.dropped_dialogue > 0
    }

    /// Full summarisation prompt, or `None` when no call is needed.
    #[must_use]
    pub fn prompt(&self) -> Option<String> {
        self.needs_summary()
            .then(|| format!("{SUMMARIZE_INSTRUCTION}{}", self.transcript))
    }

    /// Entries that survive verbatim.
    #[must_use]
    pub fn retained(&self) -> &[MemoryEntry] {
        &self.retained
    }

    /// Produce the compacted log: the core belief followed by the retained
    /// entries in their original order.
    #[must_use]
    pub fn apply(self, summary: impl Into<String>) -> MemoryLog {
        let mut entries = Vec::with_capacity(self.retained.len() + 1);
        entries.push(MemoryEntry::core_belief(summary));
        entries.extend(self.retained);
        MemoryLog::from_entries(entries)
    }
}

/// Plan a compaction of `log`, or `None` if it is within bounds.
#[must_use]
pub fn plan(log: &MemoryLog, config: &MemoryConfig, agent_name: &str) -> Option<CompactionPlan> {
    if log.len() <= config.max_entries {
        return None;
    }

    let split = log.len().saturating_sub(config.retain_count);
    let (prefix, retained) = log.entries().split_at(split);
    let turns: Vec<_> = prefix.iter().filter_map(MemoryEntry::as_dialogue).collect();

    Some(CompactionPlan {
        dropped: prefix.len(),
        dropped_dialogue: turns.len(),
        transcript: context::transcript(turns, agent_name),
        retained: retained.to_vec(),
    })
}

/// Compact `log` with a synchronous summariser.
///
/// Returns the log unchanged when it is within bounds. `summarize` receives
/// the full prompt and is skipped when the discarded prefix has no dialogue.
///
/// # Errors
///
/// Propagates the summariser's error; `log` is untouched in that case.
pub fn compact_with<E>(
    log: MemoryLog,
    config: &MemoryConfig,
    agent_name: &str,
    summarize: impl FnOnce(&str) -> Result<String, E>,
) -> Result<MemoryLog, E> {
    let Some(plan) = plan(&log, config, agent_name) else {
        return Ok(log);
    };
    let summary = match plan.prompt() {
        Some(prompt) => summarize(&prompt)?,
        None => String::new(),
    };
    Ok(plan.apply(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn turns(n: usize) -> MemoryLog {
        (0..n)
            .map(|i| MemoryEntry::dialogue(format!("u{i}"), format!("a{i}"), "neutral"))
            .collect()
    }

    fn echo(prompt: &str) -> Result<String, Infallible> {
        Ok(format!("belief<{}>", prompt.len()))
    }

    #[test]
    fn within_bounds_is_noop() {
        let config = MemoryConfig::default();
        let log = turns(50);
        assert!(plan(&log, &config, "Jace").is_none());
        let out = compact_with(log.clone(), &config, "Jace", echo).expect("infallible");
        assert_eq!(out, log);
    }

    #[test]
    fn fifty_five_turns_compact_to_twenty_one() {
        let config = MemoryConfig::default();
        let log = turns(55);
        let plan = plan(&log, &config, "Jace").expect("over bound");
        assert_eq!(plan.dropped, 35);
        assert_eq!(plan.dropped_dialogue, 35);
        assert!(plan.transcript.starts_with("Player: u0 Jace: a0; "));
        assert!(plan.transcript.ends_with("Player: u34 Jace: a34"));

        let out = plan.apply("I have seen many strangers");
        assert_eq!(out.len(), 21);
        assert_eq!(
            out.entries()[0],
            MemoryEntry::core_belief("I have seen many strangers")
        );
        assert_eq!(&out.entries()[1..], &log.entries()[35..]);
    }

    #[test]
    fn non_dialogue_prefix_entries_are_dropped_unsummarised() {
        let config = MemoryConfig::default();
        let mut entries = vec![
            MemoryEntry::core_belief("old belief"),
            MemoryEntry::reflection("old reflection"),
        ];
        entries.extend(turns(49).into_entries());
        let log = MemoryLog::from_entries(entries);

        let plan = plan(&log, &config, "Jace").expect("over bound");
        assert_eq!(plan.dropped, 31);
        assert_eq!(plan.dropped_dialogue, 29);
        assert!(!plan.transcript.contains("old belief"));
        assert!(!plan.transcript.contains("old reflection"));
    }

    #[test]
    fn prefix_without_dialogue_skips_the_call() {
        let config = MemoryConfig {
            max_entries: 3,
            retain_count: 2,
            ..MemoryConfig::default()
        };
        let log = MemoryLog::from_entries(vec![
            MemoryEntry::reflection("r1"),
            MemoryEntry::reflection("r2"),
            MemoryEntry::dialogue("u", "a", "n"),
            MemoryEntry::dialogue("v", "b", "n"),
        ]);
        let out = compact_with(log, &config, "Jace", |_| -> Result<String, &str> {
            Err("summariser must not be called")
        })
        .expect("no call made");
        assert_eq!(out.len(), 3);
        assert_eq!(out.entries()[0], MemoryEntry::core_belief(""));
    }

    #[test]
    fn summariser_failure_leaves_log_to_caller() {
        let config = MemoryConfig::default();
        let result = compact_with(turns(51), &config, "Jace", |_| Err("offline"));
        assert_eq!(result, Err("offline"));
    }
}

//! Reflection Scheduler — "What I make of it".
//!
//! Every `reflect_every` dialogue turns a character pauses to reflect on the
//! turns since the last reflection. The count is recomputed from the log on
//! each check; there is no stored counter that could drift from the entries.
//!
//! Scheduling is pure. The completion call happens in the caller, which
//! feeds the answer back through [`ReflectionRequest::record`].

use crate::context;
use crate::types::{MemoryEntry, MemoryLog};

/// Instruction prefixed to the transcript of a reflection prompt.
pub const REFLECT_INSTRUCTION: &str = "Reflect poetically: ";

/// A reflection that is due, with the prompt that should produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectionRequest {
    /// Dialogue-turn count that triggered the reflection.
    pub turn_count: usize,
    /// Transcript of the last `reflect_every` dialogue turns.
    pub transcript: String,
}

impl ReflectionRequest {
    /// Full prompt for the completion service.
    #[must_use]
    pub fn prompt(&self) -> String {
        format!("{REFLECT_INSTRUCTION}{}", self.transcript)
    }

    /// Append the completed reflection to `log`.
    pub fn record(self, log: &mut MemoryLog, text: impl Into<String>) {
        log.push(MemoryEntry::reflection(text));
    }
}

/// Whether a reflection is due for `log`.
///
/// Due when the dialogue-turn count is a positive multiple of
/// `reflect_every` and the newest entry is the dialogue turn that reached
/// it, so a reflection is never written twice for the same count.
#[must_use]
pub fn is_due(log: &MemoryLog, reflect_every: usize) -> bool {
    if reflect_every == 0 || !log.last().is_some_and(MemoryEntry::is_dialogue) {
        return false;
    }
    let count = log.dialogue_count();
    count > 0 && count % reflect_every == 0
}

/// Build the reflection request for `log`, if one is due.
#[must_use]
pub fn plan(log: &MemoryLog, reflect_every: usize, agent_name: &str) -> Option<ReflectionRequest> {
    if !is_due(log, reflect_every) {
        return None;
    }
    Some(ReflectionRequest {
        turn_count: log.dialogue_count(),
        transcript: context::transcript(log.recent_dialogue(reflect_every), agent_name),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(i: usize) -> MemoryEntry {
        MemoryEntry::dialogue(format!("u{i}"), format!("a{i}"), "neutral")
    }

    #[test]
    fn not_due_before_fifth_turn() {
        let mut log = MemoryLog::new();
        for i in 1..=4 {
            log.push(turn(i));
            assert!(plan(&log, 5, "Jace").is_none(), "turn {i} should not reflect");
        }
    }

    #[test]
    fn due_on_fifth_turn_with_last_five() {
        let mut log = MemoryLog::new();
        for i in 1..=5 {
            log.push(turn(i));
        }
        let request = plan(&log, 5, "Jace").expect("due");
        assert_eq!(request.turn_count, 5);
        assert!(request.prompt().starts_with("Reflect poetically: Player: u1 Jace: a1; "));
        assert!(request.transcript.ends_with("Player: u5 Jace: a5"));

        request.record(&mut log, "the wind remembers");
        assert_eq!(log.len(), 6);
        assert!(!is_due(&log, 5), "already reflected for this count");
    }

    #[test]
    fn reflections_do_not_count_as_turns() {
        let mut log = MemoryLog::new();
        for i in 1..=5 {
            log.push(turn(i));
        }
        log.push(MemoryEntry::reflection("r"));
        for i in 6..=9 {
            log.push(turn(i));
            assert!(!is_due(&log, 5));
        }
        log.push(turn(10));
        let request = plan(&log, 5, "Jace").expect("due at ten");
        assert!(request.transcript.starts_with("Player: u6 "));
        assert!(!request.transcript.contains("Player: u5 "));
    }

    #[test]
    fn zero_interval_never_fires() {
        let log = MemoryLog::from_entries(vec![turn(1)]);
        assert!(!is_due(&log, 0));
    }
}

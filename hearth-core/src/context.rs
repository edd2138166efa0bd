//! Context Window Builder — "What was just said".
//!
//! Extracts the most recent dialogue turns of a log and folds them, together
//! with the character's persona, into the system prompt of the next
//! completion call. Pure functions over an immutable log: the same log and
//! profile always give byte-identical output.

use crate::types::{CharacterProfile, DialogueTurn, MemoryLog};

/// Speaker label used for the player side of every transcript.
pub const PLAYER_LABEL: &str = "Player";

/// Render the last `window` dialogue turns (other entry kinds skipped),
/// oldest first, one `Player:` line and one character line per turn.
///
/// Returns an empty string when the log has no dialogue yet.
#[must_use]
pub fn dialogue_context(log: &MemoryLog, window: usize, agent_name: &str) -> String {
    let mut out = String::new();
    for turn in log.recent_dialogue(window) {
        out.push_str(PLAYER_LABEL);
        out.push_str(": ");
        out.push_str(&turn.user_text);
        out.push('\n');
        out.push_str(agent_name);
        out.push_str(": ");
        out.push_str(&turn.agent_text);
        out.push('\n');
    }
    out
}

/// Assemble the system prompt for a reply: persona, speaking style, recent
/// dialogue and the length instruction.
#[must_use]
pub fn system_prompt(profile: &CharacterProfile, log: &MemoryLog, window: usize) -> String {
    let context = dialogue_context(log, window, &profile.display_name);
    format!(
        "{}\nSpeaking Style: {}\nContext:\n{}\nRespond in 2–4 sentences.",
        profile.base_prompt, profile.speaking_style, context
    )
}

/// Single-line transcript of `turns` for reflection and summarisation
/// prompts: `Player: … Name: …` segments joined by `"; "`.
#[must_use]
pub fn transcript<'a>(turns: impl IntoIterator<Item = &'a DialogueTurn>, agent_name: &str) -> String {
    turns
        .into_iter()
        .map(|turn| {
            format!(
                "{PLAYER_LABEL}: {} {agent_name}: {}",
                turn.user_text, turn.agent_text
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CharacterId, MemoryEntry};

    fn profile() -> CharacterProfile {
        CharacterProfile {
            id: CharacterId::new("jace"),
            display_name: "Jace".into(),
            base_prompt: "You are Jace, a scavenger.".into(),
            speaking_style: "dry, clipped".into(),
        }
    }

    #[test]
    fn empty_log_gives_empty_context() {
        assert_eq!(dialogue_context(&MemoryLog::new(), 3, "Jace"), "");
    }

    #[test]
    fn takes_last_three_dialogue_turns_oldest_first() {
        let log = MemoryLog::from_entries(vec![
            MemoryEntry::dialogue("u1", "a1", "n"),
            MemoryEntry::dialogue("u2", "a2", "n"),
            MemoryEntry::reflection("thinking"),
            MemoryEntry::dialogue("u3", "a3", "n"),
            MemoryEntry::core_belief("belief"),
            MemoryEntry::dialogue("u4", "a4", "n"),
        ]);
        let ctx = dialogue_context(&log, 3, "Jace");
        assert_eq!(
            ctx,
            "Player: u2\nJace: a2\nPlayer: u3\nJace: a3\nPlayer: u4\nJace: a4\n"
        );
        assert!(!ctx.contains("thinking"));
        assert!(!ctx.contains("belief"));
    }

    #[test]
    fn system_prompt_layout() {
        let log = MemoryLog::from_entries(vec![MemoryEntry::dialogue("hi", "what", "n")]);
        let prompt = system_prompt(&profile(), &log, 3);
        assert_eq!(
            prompt,
            "You are Jace, a scavenger.\nSpeaking Style: dry, clipped\nContext:\nPlayer: hi\nJace: what\n\nRespond in 2–4 sentences."
        );
    }

    #[test]
    fn builder_is_idempotent() {
        let log = MemoryLog::from_entries(vec![
            MemoryEntry::dialogue("a", "b", "n"),
            MemoryEntry::dialogue("c", "d", "n"),
        ]);
        let p = CharacterProfile::fallback(&CharacterId::new("jace"));
        assert_eq!(system_prompt(&p, &log, 3), system_prompt(&p, &log, 3));
    }

    #[test]
    fn transcript_joins_with_semicolons() {
        let turns = [
            DialogueTurn::new("one", "uno", "n"),
            DialogueTurn::new("two", "dos", "n"),
        ];
        assert_eq!(
            transcript(&turns, "Jace"),
            "Player: one Jace: uno; Player: two Jace: dos"
        );
    }
}

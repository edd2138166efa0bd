//! Core type definitions for the Hearth memory system.
//!
//! The on-disk shape of a [`MemoryEntry`] is decided by key presence
//! (`"user"` marks a dialogue turn, `"type"` tells reflections and core
//! beliefs apart). That shape is resolved exactly once, at deserialization
//! time, into an explicit enum; nothing downstream inspects raw JSON.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{HearthError, Result};

// ---------------------------------------------------------------------------
// Identity Types
// ---------------------------------------------------------------------------

/// Stable identifier for one character's memory stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CharacterId(String);

impl CharacterId {
    /// Wrap a raw id, trimming surrounding whitespace. Case is kept, so
    /// `Jace` and `jace` are different characters.
    #[must_use]
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_string())
    }

    /// The raw id string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human-facing name derived from the id (first letter capitalised).
    #[must_use]
    pub fn capitalized(&self) -> String {
        let mut chars = self.0.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    /// Whether the id can be embedded in a file name or database key.
    #[must_use]
    pub fn is_storage_safe(&self) -> bool {
        !self.0.is_empty()
            && !self.0.starts_with('.')
            && self
                .0
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.'))
    }

    /// Return `self` if [`is_storage_safe`](Self::is_storage_safe), else an error.
    ///
    /// # Errors
    ///
    /// Returns [`HearthError::InvalidCharacterId`] for empty ids or ids
    /// containing path separators or other unsafe characters.
    pub fn validated(&self) -> Result<&Self> {
        if self.is_storage_safe() {
            Ok(self)
        } else {
            Err(HearthError::InvalidCharacterId(self.0.clone()))
        }
    }
}

impl fmt::Display for CharacterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CharacterId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for CharacterId {
    fn from(id: String) -> Self {
        Self::new(id)
    }
}

impl From<CharacterId> for String {
    fn from(id: CharacterId) -> Self {
        id.0
    }
}

// ---------------------------------------------------------------------------
// Memory entries
// ---------------------------------------------------------------------------

/// One player-utterance / character-reply exchange with its classified emotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogueTurn {
    /// What the player said.
    pub user_text: String,
    /// What the character answered.
    pub agent_text: String,
    /// Emotion label produced by the classifier (free text, usually one word).
    pub emotion_label: String,
    /// Player endorsements. The only field that changes after insertion.
    pub like_count: u32,
}

impl DialogueTurn {
    /// A fresh turn with no likes.
    #[must_use]
    pub fn new(
        user_text: impl Into<String>,
        agent_text: impl Into<String>,
        emotion_label: impl Into<String>,
    ) -> Self {
        Self {
            user_text: user_text.into(),
            agent_text: agent_text.into(),
            emotion_label: emotion_label.into(),
            like_count: 0,
        }
    }
}

/// A single entry in a character's memory log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawEntry", into = "RawEntry")]
pub enum MemoryEntry {
    /// A dialogue exchange.
    DialogueTurn(DialogueTurn),
    /// A periodic synthesis of recent turns.
    Reflection {
        /// Reflection text as returned by the completion service.
        text: String,
    },
    /// A compacted summary of a discarded history prefix.
    CoreBelief {
        /// Summary text; empty when the discarded prefix held no dialogue.
        text: String,
    },
}

impl MemoryEntry {
    /// Shorthand for a new dialogue-turn entry.
    #[must_use]
    pub fn dialogue(
        user_text: impl Into<String>,
        agent_text: impl Into<String>,
        emotion_label: impl Into<String>,
    ) -> Self {
        Self::DialogueTurn(DialogueTurn::new(user_text, agent_text, emotion_label))
    }

    /// Shorthand for a reflection entry.
    #[must_use]
    pub fn reflection(text: impl Into<String>) -> Self {
        Self::Reflection { text: text.into() }
    }

    /// Shorthand for a core-belief entry.
    #[must_use]
    pub fn core_belief(text: impl Into<String>) -> Self {
        Self::CoreBelief { text: text.into() }
    }

    /// The dialogue turn, if this entry is one.
    #[must_use]
    pub fn as_dialogue(&self) -> Option<&DialogueTurn> {
        match self {
            Self::DialogueTurn(turn) => Some(turn),
            _ => None,
        }
    }

    /// Whether this entry is a dialogue turn.
    #[must_use]
    pub fn is_dialogue(&self) -> bool {
        matches!(self, Self::DialogueTurn(_))
    }

    /// Short tag for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DialogueTurn(_) => "dialogue",
            Self::Reflection { .. } => REFLECTION_TAG,
            Self::CoreBelief { .. } => CORE_BELIEF_TAG,
        }
    }
}

const REFLECTION_TAG: &str = "reflection";
const CORE_BELIEF_TAG: &str = "core-belief";

/// Wire shape of a persisted entry.
///
/// Dialogue: `{"user","ai","emotion","likes"}`.
/// Reflection / core belief: `{"reflection","type"}`.
#[derive(Serialize, Deserialize)]
struct RawEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ai: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    emotion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    likes: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reflection: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
}

impl TryFrom<RawEntry> for MemoryEntry {
    type Error = String;

    fn try_from(raw: RawEntry) -> std::result::Result<Self, Self::Error> {
        if let Some(user_text) = raw.user {
            return Ok(Self::DialogueTurn(DialogueTurn {
                user_text,
                agent_text: raw.ai.unwrap_or_default(),
                emotion_label: raw.emotion.unwrap_or_default(),
                like_count: raw.likes.unwrap_or(0),
            }));
        }

        let text = raw.reflection.unwrap_or_default();
        match raw.kind.as_deref() {
            Some(REFLECTION_TAG) => Ok(Self::Reflection { text }),
            Some(CORE_BELIEF_TAG) => Ok(Self::CoreBelief { text }),
            Some(other) => Err(format!("unknown memory entry type '{other}'")),
            None => Err("memory entry has neither a \"user\" nor a \"type\" key".to_string()),
        }
    }
}

impl From<MemoryEntry> for RawEntry {
    fn from(entry: MemoryEntry) -> Self {
        match entry {
            MemoryEntry::DialogueTurn(turn) => RawEntry {
                user: Some(turn.user_text),
                ai: Some(turn.agent_text),
                emotion: Some(turn.emotion_label),
                likes: Some(turn.like_count),
                reflection: None,
                kind: None,
            },
            MemoryEntry::Reflection { text } => RawEntry {
                user: None,
                ai: None,
                emotion: None,
                likes: None,
                reflection: Some(text),
                kind: Some(REFLECTION_TAG.to_string()),
            },
            MemoryEntry::CoreBelief { text } => RawEntry {
                user: None,
                ai: None,
                emotion: None,
                likes: None,
                reflection: Some(text),
                kind: Some(CORE_BELIEF_TAG.to_string()),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Memory log
// ---------------------------------------------------------------------------

/// Ordered memory stream of one character.
///
/// Insertion order is meaningful and survives compaction. The number of
/// dialogue turns is never stored; it is always recounted from the entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemoryLog {
    entries: Vec<MemoryEntry>,
}

impl MemoryLog {
    /// An empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a log from entries in insertion order.
    #[must_use]
    pub fn from_entries(entries: Vec<MemoryEntry>) -> Self {
        Self { entries }
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[MemoryEntry] {
        &self.entries
    }

    /// Consume the log into its entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<MemoryEntry> {
        self.entries
    }

    /// Number of entries of every kind.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an entry at the end.
    pub fn push(&mut self, entry: MemoryEntry) {
        self.entries.push(entry);
    }

    /// The most recent entry.
    #[must_use]
    pub fn last(&self) -> Option<&MemoryEntry> {
        self.entries.last()
    }

    /// Dialogue turns only, oldest first.
    pub fn dialogue_turns(&self) -> impl DoubleEndedIterator<Item = &DialogueTurn> {
        self.entries.iter().filter_map(MemoryEntry::as_dialogue)
    }

    /// Count of dialogue turns, recomputed on every call.
    #[must_use]
    pub fn dialogue_count(&self) -> usize {
        self.dialogue_turns().count()
    }

    /// The last `n` dialogue turns, oldest first. Fewer if unavailable.
    #[must_use]
    pub fn recent_dialogue(&self, n: usize) -> Vec<&DialogueTurn> {
        let mut recent: Vec<&DialogueTurn> = self.dialogue_turns().rev().take(n).collect();
        recent.reverse();
        recent
    }

    /// Increment the like count of the dialogue turn at `index`.
    ///
    /// Returns the new count, or `None` if `index` is out of range or does
    /// not hold a dialogue turn.
    pub fn like(&mut self, index: usize) -> Option<u32> {
        match self.entries.get_mut(index) {
            Some(MemoryEntry::DialogueTurn(turn)) => {
                turn.like_count = turn.like_count.saturating_add(1);
                Some(turn.like_count)
            }
            _ => None,
        }
    }
}

impl FromIterator<MemoryEntry> for MemoryLog {
    fn from_iter<I: IntoIterator<Item = MemoryEntry>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Character profile
// ---------------------------------------------------------------------------

/// Read-only persona of a character, loaded from the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterProfile {
    /// Roster key of this profile. Not stored in the roster file, where the
    /// key already names it.
    #[serde(skip)]
    pub id: CharacterId,
    /// Name used in prompts and transcripts.
    pub display_name: String,
    /// Persona instructions at the top of every system prompt.
    pub base_prompt: String,
    /// Short description of how the character talks.
    pub speaking_style: String,
}

impl CharacterProfile {
    /// Generic profile for a character that is not in the roster.
    #[must_use]
    pub fn fallback(id: &CharacterId) -> Self {
        let name = id.capitalized();
        Self {
            id: id.clone(),
            base_prompt: format!("You are {name}, a survivor."),
            display_name: name,
            speaking_style: "neutral, functional".to_string(),
        }
    }

    /// Profile generated for a character discovered through its voice asset.
    #[must_use]
    pub fn discovered(id: &CharacterId) -> Self {
        let name = id.capitalized();
        Self {
            id: id.clone(),
            base_prompt: format!("You are {name}, a survivor in a post-collapse world."),
            display_name: name,
            speaking_style: "neutral, cautious".to_string(),
        }
    }
}

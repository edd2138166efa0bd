//! Prompt templates for Hearth completion calls.
//!
//! The reply system prompt and the reflection/summary transcripts are built
//! from memory in `hearth-core`; the emotion classifier prompt lives here
//! because it depends only on the finished exchange.

/// Emotion classification prompt, sent without a system prompt.
pub const EMOTION_CLASSIFY: &str = "Classify emotion: Player: {user} | {npc_name}: {reply}";

/// Label used when the classifier fails or answers with nothing.
pub const NEUTRAL_EMOTION: &str = "neutral";

/// Simple template interpolation for prompts.
///
/// Replaces `{key}` with the corresponding value.
#[must_use]
pub fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}

/// Render [`EMOTION_CLASSIFY`] for one exchange.
#[must_use]
pub fn classify_emotion_prompt(user_text: &str, npc_name: &str, reply: &str) -> String {
    render_template(
        EMOTION_CLASSIFY,
        &[("user", user_text), ("npc_name", npc_name), ("reply", reply)],
    )
}

/// Trim a classifier answer; an empty answer becomes [`NEUTRAL_EMOTION`].
#[must_use]
pub fn normalize_emotion(raw: &str) -> String {
    let label = raw.trim();
    if label.is_empty() {
        NEUTRAL_EMOTION.to_string()
    } else {
        label.to_string()
    }
}

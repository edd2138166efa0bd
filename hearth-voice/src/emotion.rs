//! Emotion voice profiles.
//!
//! Zonos conditions on eight emotion weights:
//! e1 happiness, e2 sadness, e3 disgust, e4 fear, e5 surprise, e6 anger,
//! e7 other, e8 neutral. A profile raises one or two of them above the
//! baseline and sets a matching speaking rate and pitch variance.

use serde::Serialize;

/// Baseline emotion weights when a profile does not override them.
pub const BASELINE_WEIGHTS: [f32; 8] = [0.05, 0.05, 0.05, 0.05, 0.05, 0.05, 0.1, 0.2];

/// Named emotion profiles, in matching order.
const PROFILES: &[(&str, &[&str])] = &[
    ("angry", &["angry", "anger", "furious", "enraged", "hostile"]),
    ("sad", &["sad", "sorrow", "grief", "melanchol"]),
    ("happy", &["happy", "joy", "cheer", "glad"]),
    ("fearful", &["fear", "afraid", "scared", "anxious", "nervous"]),
    ("disgusted", &["disgust", "revuls"]),
    ("neutral", &["neutral", "calm"]),
];

/// Synthesis parameters for one emotion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EmotionProfile {
    /// Profile name.
    pub name: &'static str,
    /// Emotion weights e1..e8.
    pub weights: [f32; 8],
    /// Speaking rate (phonemes per minute / 10).
    pub speaking_rate: f32,
    /// Pitch standard deviation.
    pub pitch_std: f32,
}

impl EmotionProfile {
    /// Profile whose keywords appear in `label`, ignoring case. Labels that
    /// match nothing get the neutral profile.
    #[must_use]
    pub fn for_label(label: &str) -> Self {
        let label = label.to_lowercase();
        let name = PROFILES
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| label.contains(k)))
            .map_or("neutral", |(name, _)| name);
        Self::named(name)
    }

    /// Profile by exact name; unknown names are neutral.
    #[must_use]
    pub fn named(name: &str) -> Self {
        let mut w = BASELINE_WEIGHTS;
        let (name, rate, pitch) = match name {
            "angry" => {
                w[5] = 0.9;
                w[3] = 0.1;
                ("angry", 18.0, 60.0)
            }
            "sad" => {
                w[1] = 0.8;
                ("sad", 10.0, 30.0)
            }
            "happy" => {
                w[0] = 0.9;
                ("happy", 17.0, 50.0)
            }
            "fearful" => {
                w[3] = 0.8;
                ("fearful", 16.0, 55.0)
            }
            "disgusted" => {
                w[2] = 0.9;
                ("disgusted", 13.0, 40.0)
            }
            _ => {
                w[7] = 0.8;
                ("neutral", 15.0, 45.0)
            }
        };
        Self {
            name,
            weights: w,
            speaking_rate: rate,
            pitch_std: pitch,
        }
    }
}

impl Default for EmotionProfile {
    fn default() -> Self {
        Self::named("neutral")
    }
}

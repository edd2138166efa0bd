//! Character roster — who can be talked to, and how they talk.
//!
//! The roster is a JSON object keyed by character id:
//!
//! ```json
//! { "jace": { "display_name": "Jace", "base_prompt": "…", "speaking_style": "…" } }
//! ```
//!
//! It is loaded once at startup and then only read. Characters that have a
//! voice sample but no roster entry get a generated profile under the
//! lowercased file stem; characters with neither fall back to a generic one,
//! so a missing profile is never fatal.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;
use crate::types::{CharacterId, CharacterProfile};

/// Read-only set of character profiles.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    profiles: BTreeMap<CharacterId, CharacterProfile>,
}

impl Roster {
    /// An empty roster; every lookup yields the fallback profile.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a roster from explicit profiles. Each profile's `id` is set to
    /// the key it is registered under.
    #[must_use]
    pub fn from_profiles(profiles: impl IntoIterator<Item = (CharacterId, CharacterProfile)>) -> Self {
        Self {
            profiles: with_keyed_ids(profiles.into_iter().collect()),
        }
    }

    /// Read the roster file at `path`. A missing file is an empty roster.
    ///
    /// # Errors
    /// Returns an I/O error for unreadable files or a serialization error
    /// for malformed JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No roster file, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };
        let profiles: BTreeMap<CharacterId, CharacterProfile> = serde_json::from_slice(&data)?;
        Ok(Self {
            profiles: with_keyed_ids(profiles),
        })
    }

    /// Load the roster, register a generated profile for every voice sample
    /// in `voice_dir` (files ending in `.{voice_extension}`) that has no
    /// entry yet, and write the result back to `path`.
    ///
    /// # Errors
    /// Returns I/O or serialization errors from reading or writing.
    pub fn load_and_sync(path: &Path, voice_dir: &Path, voice_extension: &str) -> Result<Self> {
        let mut roster = Self::load(path)?;
        let added = roster.sync_voices(voice_dir, voice_extension)?;
        roster.save(path)?;
        info!(
            path = %path.display(),
            characters = roster.len(),
            discovered = added,
            "Roster loaded"
        );
        Ok(roster)
    }

    /// Register a generated profile for each voice sample without one.
    /// Returns how many were added. A missing directory adds nothing.
    ///
    /// # Errors
    /// Returns an I/O error if the directory exists but cannot be read.
    pub fn sync_voices(&mut self, voice_dir: &Path, voice_extension: &str) -> Result<usize> {
        let entries = match fs::read_dir(voice_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let suffix = format!(".{voice_extension}");
        let mut added = 0;
        for entry in entries {
            let name = entry?.file_name();
            let Some(stem) = name.to_str().and_then(|n| n.strip_suffix(&suffix)) else {
                continue;
            };
            let id = CharacterId::new(stem.to_lowercase());
            if !self.profiles.contains_key(&id) {
                debug!(character = %id, "Discovered character from voice sample");
                self.profiles.insert(id.clone(), CharacterProfile::discovered(&id));
                added += 1;
            }
        }
        Ok(added)
    }

    /// Write the roster to `path` as indented JSON.
    ///
    /// # Errors
    /// Returns I/O or serialization errors.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_vec_pretty(&self.profiles)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// The registered profile of `id`, if any.
    #[must_use]
    pub fn get(&self, id: &CharacterId) -> Option<&CharacterProfile> {
        self.profiles.get(id)
    }

    /// The registered profile of `id`, or the generic fallback.
    #[must_use]
    pub fn profile(&self, id: &CharacterId) -> CharacterProfile {
        self.get(id)
            .cloned()
            .unwrap_or_else(|| CharacterProfile::fallback(id))
    }

    /// Registered character ids in order.
    pub fn ids(&self) -> impl Iterator<Item = &CharacterId> {
        self.profiles.keys()
    }

    /// Number of registered characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether no character is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

fn with_keyed_ids(
    mut profiles: BTreeMap<CharacterId, CharacterProfile>,
) -> BTreeMap<CharacterId, CharacterProfile> {
    for (id, profile) in &mut profiles {
        profile.id = id.clone();
    }
    profiles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_roster() {
        let dir = tempfile::tempdir().expect("tempdir");
        let roster = Roster::load(&dir.path().join("nope.json")).expect("load");
        assert!(roster.is_empty());
    }

    #[test]
    fn unknown_character_gets_fallback() {
        let roster = Roster::new();
        let profile = roster.profile(&CharacterId::new("ghost"));
        assert_eq!(profile, CharacterProfile::fallback(&CharacterId::new("ghost")));
    }

    #[test]
    fn sync_adds_only_unregistered_voices() {
        let dir = tempfile::tempdir().expect("tempdir");
        let voices = dir.path().join("voices");
        fs::create_dir_all(&voices).expect("mkdir");
        fs::write(voices.join("Jace.mp3"), b"x").expect("write");
        fs::write(voices.join("martha.mp3"), b"x").expect("write");
        fs::write(voices.join("notes.txt"), b"x").expect("write");

        let roster_path = dir.path().join("data/npc_roster.json");
        let custom = CharacterProfile {
            id: CharacterId::new("martha"),
            display_name: "Martha".into(),
            base_prompt: "You run the tavern.".into(),
            speaking_style: "warm".into(),
        };
        Roster::from_profiles([(CharacterId::new("martha"), custom.clone())])
            .save(&roster_path)
            .expect("save");

        let roster = Roster::load_and_sync(&roster_path, &voices, "mp3").expect("sync");
        assert_eq!(roster.len(), 2);
        assert_eq!(roster.get(&CharacterId::new("martha")), Some(&custom));
        assert!(roster.get(&CharacterId::new("Jace")).is_none());
        let jace = roster.get(&CharacterId::new("jace")).expect("discovered");
        assert_eq!(jace.id, CharacterId::new("jace"));
        assert_eq!(jace.display_name, "Jace");
        assert_eq!(jace.speaking_style, "neutral, cautious");

        let reloaded = Roster::load(&roster_path).expect("reload");
        assert_eq!(reloaded, roster);
    }

    #[test]
    fn loaded_profiles_carry_their_key() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("roster.json");
        fs::write(
            &path,
            r#"{"martha": {"display_name": "Martha", "base_prompt": "You run the tavern.", "speaking_style": "warm"}}"#,
        )
        .expect("write");

        let roster = Roster::load(&path).expect("load");
        let martha = CharacterId::new("martha");
        assert_eq!(roster.profile(&martha).id, martha);
        assert_eq!(roster.profile(&CharacterId::new("ghost")).id, CharacterId::new("ghost"));

        // The id stays out of the file; the key already names the profile.
        roster.save(&path).expect("save");
        let raw = fs::read_to_string(&path).expect("read");
        assert!(!raw.contains("\"id\""));
    }

    #[test]
    fn malformed_roster_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("roster.json");
        fs::write(&path, "{ not json").expect("write");
        assert!(Roster::load(&path).is_err());
    }
}

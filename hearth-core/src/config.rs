//! Configuration for the Hearth memory system.
//!
//! Maps directly to `hearth.toml`. Every field has a default matching the
//! values the dialogue backend has always shipped with, so an empty file is
//! a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level Hearth configuration, loadable from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HearthConfig {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Memory log bounds and scheduling.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Completion service settings.
    #[serde(default)]
    pub llm: LlmConfig,
    /// Speech synthesis settings.
    #[serde(default)]
    pub voice: VoiceConfig,
    /// Persistence / save settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Character roster settings.
    #[serde(default)]
    pub roster: RosterConfig,
}

impl HearthConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `HearthError::Config` if the TOML is invalid or the memory
    /// bounds are inconsistent.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| crate::HearthError::Config(e.to_string()))?;
        config.memory.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// General system settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error. `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Per-character memory bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Compaction fires when a log holds more entries than this.
    #[serde(default = "default_50")]
    pub max_entries: usize,
    /// Most recent entries kept verbatim by compaction.
    #[serde(default = "default_20")]
    pub retain_count: usize,
    /// A reflection is written every this many dialogue turns.
    #[serde(default = "default_5")]
    pub reflect_every: usize,
    /// Dialogue turns included in the prompt context.
    #[serde(default = "default_3")]
    pub context_window: usize,
}

impl MemoryConfig {
    /// Check that the bounds describe a usable policy.
    ///
    /// # Errors
    /// Returns `HearthError::Config` when `reflect_every` is zero or
    /// `retain_count` does not leave room for the core belief.
    pub fn validate(&self) -> crate::error::Result<()> {
        if self.reflect_every == 0 {
            return Err(crate::HearthError::Config(
                "memory.reflect_every must be at least 1".to_string(),
            ));
        }
        if self.retain_count >= self.max_entries {
            return Err(crate::HearthError::Config(format!(
                "memory.retain_count ({}) must be smaller than memory.max_entries ({})",
                self.retain_count, self.max_entries
            )));
        }
        Ok(())
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 50,
            retain_count: 20,
            reflect_every: 5,
            context_window: 3,
        }
    }
}

/// Completion service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider: "ollama", "openai", "none".
    #[serde(default = "default_ollama")]
    pub provider: String,
    /// Base URL for the LLM API.
    #[serde(default = "default_ollama_url")]
    pub base_url: String,
    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for OpenAI-compatible providers.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Hard timeout for any LLM call in milliseconds.
    #[serde(default = "default_30000")]
    pub request_timeout_ms: u64,
    /// Retries after the first failed attempt.
    #[serde(default = "default_1_u32")]
    pub max_retries: u32,
    /// Sampling temperature.
    #[serde(default = "default_0_8")]
    pub temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            base_url: "http://localhost:11434".to_string(),
            model: "gemma3:1b".to_string(),
            api_key: None,
            request_timeout_ms: 30_000,
            max_retries: 1,
            temperature: 0.8,
        }
    }
}

/// Speech synthesis configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceConfig {
    /// Whether replies are voiced at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Base URL of the Zonos Gradio server.
    #[serde(default = "default_zonos_url")]
    pub base_url: String,
    /// Directory holding `{character_id}.{voice_extension}` speaker samples.
    #[serde(default = "default_voice_dir")]
    pub voice_dir: PathBuf,
    /// Speaker sample used when a character has none of its own.
    #[serde(default = "default_voice")]
    pub default_voice: String,
    /// Extension of speaker samples.
    #[serde(default = "default_mp3")]
    pub voice_extension: String,
    /// Directory synthesized replies are written to.
    #[serde(default = "default_audio_dir")]
    pub output_dir: PathBuf,
    /// Extension of synthesized replies.
    #[serde(default = "default_wav")]
    pub output_extension: String,
    /// Zonos model to run.
    #[serde(default = "default_zonos_model")]
    pub model_choice: String,
    /// Synthesis language code.
    #[serde(default = "default_language")]
    pub language: String,
    /// Pick a fresh seed for every request.
    #[serde(default = "default_true")]
    pub randomize_seed: bool,
    /// Hard timeout for a synthesis round trip in milliseconds.
    #[serde(default = "default_120000")]
    pub request_timeout_ms: u64,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://127.0.0.1:7860".to_string(),
            voice_dir: PathBuf::from("static/voices"),
            default_voice: "robot.mp3".to_string(),
            voice_extension: "mp3".to_string(),
            output_dir: PathBuf::from("static/audio"),
            output_extension: "wav".to_string(),
            model_choice: "Zyphra/Zonos-v0.1-transformer".to_string(),
            language: "en-us".to_string(),
            randomize_seed: true,
            request_timeout_ms: 120_000,
        }
    }
}

/// Persistence / save configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Backend: "json" (one file per character), "sqlite" or "memory".
    #[serde(default = "default_json")]
    pub backend: String,
    /// Directory for the JSON backend.
    #[serde(default = "default_memory_dir")]
    pub memory_dir: PathBuf,
    /// Database file for the SQLite backend.
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
    /// Use WAL mode for the SQLite backend.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Detect save corruption via checksums (SQLite backend).
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            backend: "json".to_string(),
            memory_dir: PathBuf::from("npc_brains"),
            sqlite_path: PathBuf::from("npc_brains/memory.db"),
            wal_mode: true,
            checksum_enabled: true,
        }
    }
}

/// Character roster configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RosterConfig {
    /// JSON roster file.
    #[serde(default = "default_roster_path")]
    pub path: PathBuf,
    /// Register a generated profile for every voice sample not in the roster.
    #[serde(default = "default_true")]
    pub sync_voices: bool,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/npc_roster.json"),
            sync_voices: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_ollama() -> String { "ollama".to_string() }
fn default_ollama_url() -> String { "http://localhost:11434".to_string() }
fn default_model() -> String { "gemma3:1b".to_string() }
fn default_zonos_url() -> String { "http://127.0.0.1:7860".to_string() }
fn default_voice_dir() -> PathBuf { PathBuf::from("static/voices") }
fn default_voice() -> String { "robot.mp3".to_string() }
fn default_mp3() -> String { "mp3".to_string() }
fn default_audio_dir() -> PathBuf { PathBuf::from("static/audio") }
fn default_wav() -> String { "wav".to_string() }
fn default_zonos_model() -> String { "Zyphra/Zonos-v0.1-transformer".to_string() }
fn default_language() -> String { "en-us".to_string() }
fn default_json() -> String { "json".to_string() }
fn default_memory_dir() -> PathBuf { PathBuf::from("npc_brains") }
fn default_sqlite_path() -> PathBuf { PathBuf::from("npc_brains/memory.db") }
fn default_roster_path() -> PathBuf { PathBuf::from("data/npc_roster.json") }
fn default_0_8() -> f32 { 0.8 }
fn default_1_u32() -> u32 { 1 }
fn default_3() -> usize { 3 }
fn default_5() -> usize { 5 }
fn default_20() -> usize { 20 }
fn default_50() -> usize { 50 }
fn default_30000() -> u64 { 30_000 }
fn default_120000() -> u64 { 120_000 }

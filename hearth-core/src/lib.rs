//! # Hearth Core Library
//!
//! Per-character conversational memory for non-player characters.
//!
//! Every character gets a [`MemoryLog`]: an ordered stream of
//! [`MemoryEntry`] values of three kinds:
//!
//! - **Dialogue turns** — "What was said" (player utterance, reply, emotion)
//! - **Reflections** — "What I make of it" (periodic synthesis of recent turns)
//! - **Core beliefs** — "What I hold on to" (compacted long-term summary)
//!
//! This crate owns the state and the deterministic policies around it:
//! storage, context-window assembly, reflection scheduling and compaction
//! planning. It never talks to a language model itself; callers run the
//! prompts it builds and feed the answers back in.
//!
//! ## Bounds
//!
//! - A log grows until it holds more than `max_entries` (50) entries, then
//!   compacts to `1 + retain_count` (21).
//! - A reflection is due whenever the dialogue-turn count is a positive
//!   multiple of `reflect_every` (5).

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compaction;
pub mod config;
pub mod context;
pub mod error;
pub mod persistence;
pub mod reflection;
pub mod roster;
pub mod store;
pub mod types;

pub use config::HearthConfig;
pub use error::HearthError;
pub use store::{MemorySession, MemoryStore};
pub use types::*;

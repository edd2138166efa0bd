//! # hearth-voice — Speech Synthesis for Hearth
//!
//! Turns a character's reply into an audio file:
//!   - [`AudioDispatcher`] resolves the character's speaker sample (falling
//!     back to a shared default), asks a [`SpeechSynthesisService`] for audio
//!     and writes `{character_id}_{timestamp}.{ext}` to the output directory.
//!   - [`ZonosClient`] speaks the Zonos Gradio HTTP API.
//!   - [`EmotionProfile`] maps a free-text emotion label to Zonos emotion
//!     weights, speaking rate and pitch variance.
//!
//! Synthesis is best-effort. The dispatcher logs and absorbs every
//! [`VoiceError`], so a missing voice server only costs the audio.

pub mod dispatcher;
pub mod emotion;
pub mod error;
pub mod service;
pub mod testing;
pub mod zonos;

pub use dispatcher::AudioDispatcher;
pub use emotion::EmotionProfile;
pub use error::{Result, VoiceError};
pub use service::{AudioPayload, SpeechSynthesisService, SynthesisRequest, SynthesizedAudio};
pub use zonos::ZonosClient;

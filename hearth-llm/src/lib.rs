//! # hearth-llm — Completion Service Layer for Hearth
//!
//! Provides a single request/response interface over text-generation
//! backends:
//!   - **Ollama** `/api/chat` (local, recommended default)
//!   - **OpenAI-compatible** `/v1/chat/completions`
//!   - **None** (every call fails, so callers exercise their fallbacks)
//!
//! All completion calls in Hearth go through [`CompletionService`], which
//! keeps the turn logic independent of the backend and lets tests script
//! answers with [`testing::ScriptedCompletion`].
//!
//! Failures are reported as [`LlmError`]; callers are expected to degrade
//! rather than abort (an error string as the reply, `"neutral"` as the
//! emotion, no reflection this time).

pub mod client;
pub mod error;
pub mod prompt;
pub mod service;
pub mod testing;
pub mod types;

pub use client::{LlmClient, LlmProvider};
pub use error::LlmError;
pub use service::CompletionService;
pub use types::{ChatMessage, LlmRequest, LlmResponse};

//! The completion-service seam.

use async_trait::async_trait;

use crate::error::LlmError;

/// A text-generation endpoint.
///
/// One call is one synchronous request/response exchange from the caller's
/// point of view. Timeouts are the implementation's business and surface as
/// errors like any other failure.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Complete `user_text`, optionally under a system prompt.
    ///
    /// # Errors
    ///
    /// Any transport, provider or decoding failure.
    async fn complete(&self, user_text: &str, system_prompt: Option<&str>)
    -> Result<String, LlmError>;
}

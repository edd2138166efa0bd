//! LLM Client — unified interface for Ollama and OpenAI-compatible backends.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::service::CompletionService;
use crate::types::{LlmRequest, LlmResponse};

/// Text substituted when a provider answers without any content.
pub const NO_RESPONSE: &str = "[No response]";

/// Provider backend for LLM inference.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    /// Ollama running locally (recommended).
    Ollama { base_url: String },
    /// OpenAI-compatible API.
    OpenAiCompatible { base_url: String, api_key: String },
    /// No LLM available; every call returns an error.
    None,
}

impl LlmProvider {
    /// Build a provider from its configured name.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::ConfigError`] for unknown names, or for
    /// `"openai"` without an API key.
    pub fn from_name(name: &str, base_url: &str, api_key: Option<&str>) -> Result<Self, LlmError> {
        let base_url = base_url.trim_end_matches('/').to_string();
        match name {
            "ollama" => Ok(Self::Ollama { base_url }),
            "openai" => {
                let api_key = api_key
                    .filter(|k| !k.is_empty())
                    .ok_or_else(|| LlmError::ConfigError("openai provider needs an api_key".into()))?;
                Ok(Self::OpenAiCompatible {
                    base_url,
                    api_key: api_key.to_string(),
                })
            }
            "none" => Ok(Self::None),
            other => Err(LlmError::ConfigError(format!(
                "unknown LLM provider '{other}' (expected ollama, openai or none)"
            ))),
        }
    }
}

/// The main LLM client that routes requests to the configured backend.
pub struct LlmClient {
    provider: LlmProvider,
    http: Client,
    model: String,
    max_retries: u32,
    temperature: f32,
    timeout_ms: u64,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The provider may carry an API key; only name the model.
        f.debug_struct("LlmClient")
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

impl LlmClient {
    /// Create a new LLM client.
    #[must_use]
    pub fn new(provider: LlmProvider, model: impl Into<String>, max_retries: u32) -> Self {
        Self {
            provider,
            http: Client::new(),
            model: model.into(),
            max_retries,
            temperature: 0.8,
            timeout_ms: 30_000,
        }
    }

    /// Create a client with no LLM backend (all calls fail).
    #[must_use]
    pub fn none() -> Self {
        Self::new(LlmProvider::None, String::new(), 0)
    }

    /// Set the sampling temperature used by [`CompletionService::complete`].
    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the per-attempt timeout used by [`CompletionService::complete`].
    #[must_use]
    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Check if the LLM client has a backend configured.
    #[must_use]
    pub fn is_available(&self) -> bool {
        !matches!(self.provider, LlmProvider::None)
    }

    /// Generate a response from the LLM.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the LLM is unavailable or all retries fail.
    pub async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, LlmError> {
        let start = Instant::now();
        let text = match &self.provider {
            LlmProvider::None => {
                return Err(LlmError::Unavailable("No LLM provider configured".into()));
            }
            LlmProvider::Ollama { base_url } => {
                let body = json!({
                    "model": self.model,
                    "messages": request.messages(),
                    "stream": false,
                    "options": { "temperature": request.temperature },
                });
                let url = format!("{base_url}/api/chat");
                let json = self.post_with_retries(&url, &body, None, request.timeout_ms).await?;
                ollama_text(&json)
            }
            LlmProvider::OpenAiCompatible { base_url, api_key } => {
                let body = json!({
                    "model": self.model,
                    "messages": request.messages(),
                    "temperature": request.temperature,
                });
                let url = format!("{base_url}/v1/chat/completions");
                let json = self
                    .post_with_retries(&url, &body, Some(api_key), request.timeout_ms)
                    .await?;
                openai_text(&json)
            }
        };

        Ok(LlmResponse {
            text,
            latency_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            model: self.model.clone(),
        })
    }

    /// POST `body` to `url`, retrying up to `max_retries` times.
    async fn post_with_retries(
        &self,
        url: &str,
        body: &Value,
        bearer: Option<&str>,
        timeout_ms: u64,
    ) -> Result<Value, LlmError> {
        let mut last_error = String::new();
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                debug!("Retrying LLM call (attempt {}/{})", attempt + 1, self.max_retries + 1);
            }

            let mut builder = self
                .http
                .post(url)
                .json(body)
                .timeout(Duration::from_millis(timeout_ms));
            if let Some(key) = bearer {
                builder = builder.bearer_auth(key);
            }

            match builder.send().await {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .json()
                        .await
                        .map_err(|e| LlmError::ParseError(e.to_string()));
                }
                Ok(resp) => {
                    let status = resp.status();
                    last_error = format!("HTTP {}: {}", status, resp.text().await.unwrap_or_default());
                    warn!(url, "LLM provider returned error: {}", last_error);
                }
                Err(e) => {
                    last_error = e.to_string();
                    if e.is_timeout() {
                        warn!(url, "LLM request timed out after {}ms", timeout_ms);
                    } else {
                        warn!(url, "LLM request failed: {}", last_error);
                    }
                }
            }
        }

        Err(LlmError::RetriesExhausted {
            attempts: self.max_retries + 1,
            last_error,
        })
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn complete(
        &self,
        user_text: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, LlmError> {
        let mut request = LlmRequest::new(user_text)
            .with_temperature(self.temperature)
            .with_timeout(self.timeout_ms);
        if let Some(system) = system_prompt {
            request = request.with_system(system);
        }
        let response = self.generate(&request).await?;
        debug!(
            model = %response.model,
            latency_ms = response.latency_ms,
            chars = response.text.len(),
            "Completion received"
        );
        Ok(response.text)
    }
}

/// `message.content` of an Ollama chat response.
fn ollama_text(json: &Value) -> String {
    json["message"]["content"]
        .as_str()
        .unwrap_or(NO_RESPONSE)
        .to_string()
}

/// `choices[0].message.content` of an OpenAI chat response.
fn openai_text(json: &Value) -> String {
    json["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or(NO_RESPONSE)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn none_provider_is_unavailable() {
        let client = LlmClient::none();
        assert!(!client.is_available());
        let err = client.complete("hello", None).await;
        assert!(matches!(err, Err(LlmError::Unavailable(_))));
    }

    #[test]
    fn provider_from_name() {
        assert!(matches!(
            LlmProvider::from_name("ollama", "http://localhost:11434/", None),
            Ok(LlmProvider::Ollama { base_url }) if base_url == "http://localhost:11434"
        ));
        assert!(matches!(
            LlmProvider::from_name("openai", "https://api.example.com", None),
            Err(LlmError::ConfigError(_))
        ));
        assert!(matches!(
            LlmProvider::from_name("openai", "https://api.example.com", Some("sk-test")),
            Ok(LlmProvider::OpenAiCompatible { .. })
        ));
        assert!(matches!(LlmProvider::from_name("none", "", None), Ok(LlmProvider::None)));
        assert!(LlmProvider::from_name("bard", "", None).is_err());
    }

    #[test]
    fn extracts_ollama_content() {
        let json = json!({"message": {"role": "assistant", "content": "Keep walking."}});
        assert_eq!(ollama_text(&json), "Keep walking.");
        assert_eq!(ollama_text(&json!({"done": true})), NO_RESPONSE);
    }

    #[test]
    fn extracts_openai_content() {
        let json = json!({"choices": [{"message": {"content": "Who sent you?"}}]});
        assert_eq!(openai_text(&json), "Who sent you?");
        assert_eq!(openai_text(&json!({"choices": []})), NO_RESPONSE);
    }

    #[test]
    fn debug_hides_provider() {
        let client = LlmClient::new(
            LlmProvider::OpenAiCompatible {
                base_url: "https://api.example.com".into(),
                api_key: "sk-secret".into(),
            },
            "gpt",
            0,
        );
        assert!(!format!("{client:?}").contains("sk-secret"));
    }
}

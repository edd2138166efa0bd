//! Scripted completion service for exercising callers without a model.
//!
//! ```rust
//! use hearth_llm::testing::ScriptedCompletion;
//! use hearth_llm::CompletionService;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let llm = ScriptedCompletion::new()
//!     .with_response("Who goes there?")
//!     .with_response("wary");
//!
//! assert_eq!(llm.complete("hi", Some("persona")).await.unwrap(), "Who goes there?");
//! assert_eq!(llm.complete("classify", None).await.unwrap(), "wary");
//! assert_eq!(llm.call_count(), 2);
//! # }
//! ```

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::LlmError;
use crate::service::CompletionService;

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionCall {
    /// The user text passed in.
    pub user_text: String,
    /// The system prompt passed in, if any.
    pub system_prompt: Option<String>,
}

type Responder = Box<dyn Fn(&CompletionCall) -> Result<String, LlmError> + Send + Sync>;

/// Answers from a queue, then from a responder function, then with
/// [`LlmError::Unavailable`].
///
/// Every call is recorded in order.
pub struct ScriptedCompletion {
    queue: Mutex<VecDeque<Result<String, LlmError>>>,
    responder: Option<Responder>,
    calls: Mutex<Vec<CompletionCall>>,
}

impl Default for ScriptedCompletion {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ScriptedCompletion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptedCompletion")
            .field("queued", &self.queue.lock().len())
            .field("calls", &self.calls.lock().len())
            .finish_non_exhaustive()
    }
}

impl ScriptedCompletion {
    /// An empty script; every call fails until responses are added.
    #[must_use]
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            responder: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a successful answer.
    #[must_use]
    pub fn with_response(self, text: impl Into<String>) -> Self {
        self.queue.lock().push_back(Ok(text.into()));
        self
    }

    /// Queue several successful answers.
    #[must_use]
    pub fn with_responses(self, texts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        {
            let mut queue = self.queue.lock();
            for text in texts {
                queue.push_back(Ok(text.into()));
            }
        }
        self
    }

    /// Queue a failure.
    #[must_use]
    pub fn with_error(self, err: LlmError) -> Self {
        self.queue.lock().push_back(Err(err));
        self
    }

    /// Answer with `responder` once the queue is empty.
    #[must_use]
    pub fn with_responder(
        mut self,
        responder: impl Fn(&CompletionCall) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Answer every call with `text` once the queue is empty.
    #[must_use]
    pub fn with_fallback(self, text: impl Into<String>) -> Self {
        let text = text.into();
        self.with_responder(move |_| Ok(text.clone()))
    }

    /// A service that fails every call.
    #[must_use]
    pub fn failing() -> Self {
        Self::new().with_responder(|_| Err(LlmError::Unavailable("scripted outage".into())))
    }

    /// Number of calls made so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Every call made so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CompletionCall> {
        self.calls.lock().clone()
    }

    /// Calls whose user text starts with `prefix`.
    #[must_use]
    pub fn calls_starting_with(&self, prefix: &str) -> Vec<CompletionCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.user_text.starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(
        &self,
        user_text: &str,
        system_prompt: Option<&str>,
    ) -> Result<String, LlmError> {
        let call = CompletionCall {
            user_text: user_text.to_string(),
            system_prompt: system_prompt.map(str::to_string),
        };
        self.calls.lock().push(call.clone());

        if let Some(scripted) = self.queue.lock().pop_front() {
            return scripted;
        }
        match &self.responder {
            Some(responder) => responder(&call),
            None => Err(LlmError::Unavailable("script exhausted".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn queue_then_fallback() {
        let llm = ScriptedCompletion::new()
            .with_response("one")
            .with_error(LlmError::Timeout(10))
            .with_fallback("rest");

        assert_eq!(llm.complete("a", None).await.expect("one"), "one");
        assert!(matches!(llm.complete("b", None).await, Err(LlmError::Timeout(10))));
        assert_eq!(llm.complete("c", None).await.expect("rest"), "rest");
        assert_eq!(llm.complete("d", None).await.expect("rest"), "rest");
        assert_eq!(llm.call_count(), 4);
    }

    #[tokio::test]
    async fn exhausted_script_fails() {
        let llm = ScriptedCompletion::new();
        assert!(matches!(llm.complete("a", None).await, Err(LlmError::Unavailable(_))));
    }

    #[tokio::test]
    async fn records_calls() {
        let llm = ScriptedCompletion::new().with_fallback("ok");
        llm.complete("Reflect poetically: x", None).await.expect("ok");
        llm.complete("hello", Some("persona")).await.expect("ok");

        let calls = llm.calls();
        assert_eq!(calls[1].system_prompt.as_deref(), Some("persona"));
        assert_eq!(llm.calls_starting_with("Reflect").len(), 1);
    }

    #[tokio::test]
    async fn responder_sees_the_call() {
        let llm = ScriptedCompletion::new().with_responder(|call| {
            Ok(if call.system_prompt.is_some() { "reply" } else { "calm" }.to_string())
        });
        assert_eq!(llm.complete("x", Some("s")).await.expect("reply"), "reply");
        assert_eq!(llm.complete("x", None).await.expect("calm"), "calm");
    }
}

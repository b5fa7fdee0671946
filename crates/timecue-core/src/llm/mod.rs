//! Free-text composition with bounded retries.
//!
//! [`LlmClient::compose`] never fails: every path ends in a
//! [`ComposeOutcome`], and only [`ComposeOutcome::Composed`] carries text meant
//! for the user. Callers substitute their own fallback on
//! [`ComposeOutcome::Failed`].

mod retry;
mod transport;

pub use retry::{RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper};
pub use transport::{ChatTransport, OpenRouterTransport};

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;
use crate::error::ComposeError;

/// Longest slice of an error kept in a failure diagnostic.
const DIAGNOSTIC_ERROR_CHARS: usize = 50;

/// One chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: content.into(),
        }
    }
}

/// Result of a composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeOutcome {
    /// Usable, non-empty text.
    Composed(String),
    /// Every attempt failed (or none could be made).
    Failed {
        attempts: u32,
        /// Short description for logs; not meant for the user.
        diagnostic: String,
    },
}

impl ComposeOutcome {
    fn failed(attempts: u32, error: Option<&ComposeError>) -> Self {
        let diagnostic = match error {
            Some(e) => {
                let text = e.to_string();
                let short: String = text.chars().take(DIAGNOSTIC_ERROR_CHARS).collect();
                if short.len() < text.len() {
                    format!("API error: {short}... (see log for details)")
                } else {
                    format!("API error: {short}")
                }
            }
            None => "no attempts were made".to_string(),
        };
        ComposeOutcome::Failed {
            attempts,
            diagnostic,
        }
    }

    pub fn is_composed(&self) -> bool {
        matches!(self, ComposeOutcome::Composed(_))
    }

    /// The composed text, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            ComposeOutcome::Composed(text) => Some(text),
            ComposeOutcome::Failed { .. } => None,
        }
    }
}

/// Anything that can turn a prompt into notification text.
pub trait Composer: Send + Sync {
    fn compose(
        &self,
        prompt: &str,
        history: &[ChatMessage],
    ) -> impl Future<Output = ComposeOutcome> + Send;
}

/// Retrying composition client over a [`ChatTransport`].
pub struct LlmClient<T, S = TokioSleeper> {
    transport: T,
    sleeper: S,
    policy: RetryPolicy,
}

impl LlmClient<OpenRouterTransport, TokioSleeper> {
    /// Production client from the `[llm]` config section.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &LlmConfig) -> Result<Self, ComposeError> {
        let transport = OpenRouterTransport::from_config(config)?;
        Ok(Self::new(transport, TokioSleeper, config.retry_policy()))
    }
}

impl<T: ChatTransport, S: Sleeper> LlmClient<T, S> {
    pub fn new(transport: T, sleeper: S, policy: RetryPolicy) -> Self {
        Self {
            transport,
            sleeper,
            policy,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    async fn attempt(&self, messages: &[ChatMessage]) -> Result<String, ComposeError> {
        let sent = tokio::time::timeout(self.policy.attempt_timeout, self.transport.send(messages));
        let text = match sent.await {
            Ok(result) => result?,
            Err(_) => {
                return Err(ComposeError::Timeout {
                    secs: self.policy.attempt_timeout.as_secs(),
                })
            }
        };
        if text.trim().is_empty() {
            return Err(ComposeError::EmptyResponse);
        }
        Ok(text)
    }

    /// Compose text for `prompt`, appended after `history`.
    pub async fn compose(&self, prompt: &str, history: &[ChatMessage]) -> ComposeOutcome {
        if let Err(e) = self.transport.ready() {
            tracing::error!("composition unavailable: {e}");
            return ComposeOutcome::failed(0, Some(&e));
        }

        let mut messages = history.to_vec();
        messages.push(ChatMessage::user(prompt));

        let total = self.policy.attempts;
        let mut last_error = None;
        let mut made = 0;

        for attempt in 0..total {
            made = attempt + 1;
            match self.attempt(&messages).await {
                Ok(text) => {
                    let preview: String = text.chars().take(50).collect();
                    tracing::info!(attempt = made, "composed: {preview}");
                    return ComposeOutcome::Composed(text);
                }
                Err(e) => {
                    tracing::warn!(attempt = made, of = total, "compose attempt failed: {e}");
                    let retryable = e.is_retryable();
                    last_error = Some(e);
                    if !retryable {
                        break;
                    }
                    if made < total {
                        self.sleeper.sleep(self.policy.delay_for_attempt(attempt)).await;
                    }
                }
            }
        }

        ComposeOutcome::failed(made, last_error.as_ref())
    }
}

impl<T: ChatTransport, S: Sleeper> Composer for LlmClient<T, S> {
    fn compose(
        &self,
        prompt: &str,
        history: &[ChatMessage],
    ) -> impl Future<Output = ComposeOutcome> + Send {
        LlmClient::compose(self, prompt, history)
    }
}

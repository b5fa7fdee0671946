//! Chat-completions transport.
//!
//! [`OpenRouterTransport`] speaks the OpenAI-compatible
//! `POST /chat/completions` shape that OpenRouter exposes:
//!
//! ```text
//! -> { "model": "...", "messages": [{ "role": "user", "content": "..." }] }
//! <- { "choices": [{ "message": { "content": "..." } }] }
//! ```

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::ChatMessage;
use crate::config::LlmConfig;
use crate::error::ComposeError;

/// One request/response exchange with a chat model.
pub trait ChatTransport: Send + Sync {
    /// Fails fast when the transport can never succeed (e.g. no credentials).
    fn ready(&self) -> Result<(), ComposeError> {
        Ok(())
    }

    /// Send the conversation and return the first choice's content.
    fn send(
        &self,
        messages: &[ChatMessage],
    ) -> impl Future<Output = Result<String, ComposeError>> + Send;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// HTTP transport for OpenRouter (or any OpenAI-compatible endpoint).
pub struct OpenRouterTransport {
    client: Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl OpenRouterTransport {
    /// Build from config, reading the key from the configured env var.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn from_config(config: &LlmConfig) -> Result<Self, ComposeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            model: config.model.clone(),
            api_key: config.api_key(),
            api_key_env: config.api_key_env.clone(),
        })
    }

    /// Override the API key (tests, or keys not held in the environment).
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl ChatTransport for OpenRouterTransport {
    fn ready(&self) -> Result<(), ComposeError> {
        match self.api_key {
            Some(_) => Ok(()),
            None => Err(ComposeError::MissingApiKey {
                env: self.api_key_env.clone(),
            }),
        }
    }

    async fn send(&self, messages: &[ChatMessage]) -> Result<String, ComposeError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ComposeError::MissingApiKey {
                env: self.api_key_env.clone(),
            })?;

        let body = ChatRequest {
            model: &self.model,
            messages,
        };

        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ComposeError::Status {
                status: status.as_u16(),
                body: text.chars().take(200).collect(),
            });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ComposeError::MalformedResponse(e.to_string()))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ComposeError::MalformedResponse("no choices in response".into()))?;

        choice.message.content.ok_or(ComposeError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_for(server: &mockito::Server) -> LlmConfig {
        LlmConfig {
            api_url: format!("{}/api/v1/chat/completions", server.url()),
            api_key_env: "TIMECUE_TEST_KEY_THAT_IS_NOT_SET".into(),
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn posts_bearer_request_and_reads_first_choice() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "meta-llama/llama-3-8b-instruct",
                "messages": [{ "role": "user", "content": "hello" }]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Stay on it!"}}]}"#)
            .create_async()
            .await;

        let transport = OpenRouterTransport::from_config(&config_for(&server))
            .unwrap()
            .with_api_key("test-key");
        let text = transport.send(&[ChatMessage::user("hello")]).await.unwrap();

        assert_eq!(text, "Stay on it!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn non_success_status_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/chat/completions")
            .with_status(503)
            .with_body("upstream overloaded")
            .create_async()
            .await;

        let transport = OpenRouterTransport::from_config(&config_for(&server))
            .unwrap()
            .with_api_key("k");
        let err = transport.send(&[ChatMessage::user("x")]).await.unwrap_err();
        match err {
            ComposeError::Status { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "upstream overloaded");
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_choices_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let transport = OpenRouterTransport::from_config(&config_for(&server))
            .unwrap()
            .with_api_key("k");
        let err = transport.send(&[ChatMessage::user("x")]).await.unwrap_err();
        assert!(matches!(err, ComposeError::MalformedResponse(_)));
    }

    #[test]
    fn without_key_transport_is_not_ready() {
        let transport = OpenRouterTransport::from_config(&LlmConfig {
            api_key_env: "TIMECUE_TEST_KEY_THAT_IS_NOT_SET".into(),
            ..LlmConfig::default()
        })
        .unwrap();
        assert!(matches!(
            transport.ready(),
            Err(ComposeError::MissingApiKey { .. })
        ));
    }
}

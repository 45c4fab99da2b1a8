//! Raw chat-completion backend (variant B)
//!
//! Sends an explicit `[system, ...history, user]` message list to
//! `{endpoint}/chat/completions`. Works with OpenAI and any server exposing
//! the same API.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use chat_gateway_config::constants::{endpoints, models, timeouts};
use chat_gateway_config::CompletionConfig;
use chat_gateway_core::{Capability, CompletionProvider, ConversationTurn, Result};

use crate::prompt::{build_chat_messages, Message};
use crate::LlmError;

/// Connection and sampling settings for a chat-completion endpoint
#[derive(Debug, Clone)]
pub struct ChatCompletionConfig {
    /// Base URL, e.g. `https://api.openai.com/v1`
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub max_tokens: usize,
    /// 0.0..=2.0
    pub temperature: f32,
    pub timeout: Duration,
}

impl Default for ChatCompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: endpoints::OPENAI_DEFAULT.to_string(),
            api_key: String::new(),
            model: models::OPENAI_CHAT.to_string(),
            max_tokens: 1024,
            temperature: 0.7,
            timeout: Duration::from_millis(timeouts::LLM_REQUEST_MS),
        }
    }
}

impl ChatCompletionConfig {
    pub fn with_key(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Build from completion settings with a resolved key
    pub fn from_settings(config: &CompletionConfig, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: config.resolved_endpoint(),
            api_key: api_key.into(),
            model: config.resolved_model(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            timeout: config.timeout(),
        }
    }
}

/// Chat-completion provider
pub struct ChatCompletionBackend {
    config: ChatCompletionConfig,
    client: Client,
}

impl ChatCompletionBackend {
    pub fn new(config: ChatCompletionConfig) -> std::result::Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Configuration(
                "Chat completion requires an API key".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.endpoint.trim_end_matches('/'))
    }

    fn request_body<'a>(&'a self, messages: &'a [Message]) -> CompletionBody<'a> {
        CompletionBody {
            model: &self.config.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: m.role.to_string(),
                    content: &m.content,
                })
                .collect(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        }
    }

    /// Send a prepared message list and return the first choice's text
    pub async fn generate(&self, messages: &[Message]) -> std::result::Result<String, LlmError> {
        tracing::debug!(
            model = %self.config.model,
            messages = messages.len(),
            "Chat completion request"
        );

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&self.request_body(messages))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, detail)));
        }

        let parsed: CompletionReply = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let first = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("Reply carried no choices".to_string()))?;

        match first.message.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(LlmError::EmptyReply),
        }
    }
}

#[async_trait]
impl CompletionProvider for ChatCompletionBackend {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ConversationTurn],
        user_text: &str,
    ) -> Result<String> {
        let messages = build_chat_messages(system_prompt, history, user_text);
        self.generate(&messages)
            .await
            .map_err(|e| e.into_core(Capability::Chat))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: String,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_gateway_core::TurnRole;

    #[test]
    fn test_default_config() {
        let config = ChatCompletionConfig::default();
        assert_eq!(config.endpoint, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_tokens, 1024);
    }

    #[test]
    fn test_backend_requires_key() {
        assert!(matches!(
            ChatCompletionBackend::new(ChatCompletionConfig::default()),
            Err(LlmError::Configuration(_))
        ));
        let keyed = ChatCompletionConfig::with_key("sk-xxx", "gpt-4o");
        assert!(ChatCompletionBackend::new(keyed).is_ok());
    }

    #[test]
    fn test_completions_url_trims_slash() {
        let config = ChatCompletionConfig {
            endpoint: "http://localhost:8000/v1/".to_string(),
            ..ChatCompletionConfig::with_key("sk-xxx", "gpt-4o")
        };
        let backend = ChatCompletionBackend::new(config).unwrap();
        assert_eq!(backend.completions_url(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn test_request_starts_with_user_after_system() {
        let backend =
            ChatCompletionBackend::new(ChatCompletionConfig::with_key("sk-xxx", "gpt-4o")).unwrap();
        let history = vec![
            ConversationTurn::new(TurnRole::Assistant, "welcome"),
            ConversationTurn::new(TurnRole::Assistant, "pick a language"),
            ConversationTurn::new(TurnRole::User, "2"),
            ConversationTurn::new(TurnRole::Assistant, "done"),
        ];
        let messages = build_chat_messages("sys", &history, "hello");
        let json = serde_json::to_value(backend.request_body(&messages)).unwrap();

        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "2");
        assert_eq!(json["messages"][3]["content"], "hello");
        assert_eq!(json["model"], "gpt-4o");
    }

    #[test]
    fn test_null_content_parses() {
        let reply: CompletionReply =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert!(reply.choices[0].message.content.is_none());
    }
}

//! Gemini `generateContent` backend
//!
//! Serves both the template-based completion provider and image analysis.
//! Requests go to `{endpoint}/models/{model}:generateContent` with the key in
//! the `x-goog-api-key` header.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use chat_gateway_config::constants::{endpoints, models, timeouts};
use chat_gateway_config::{CompletionConfig, VisionConfig};
use chat_gateway_core::{
    Capability, CompletionProvider, ConversationTurn, ImageInput, Result, VisionAnalyzer,
};

use crate::prompt::{PromptTemplate, Role};
use crate::LlmError;

/// Configuration for Gemini requests
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API base (`.../v1beta`)
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<usize>,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            endpoint: endpoints::GEMINI_DEFAULT.to_string(),
            api_key: String::new(),
            model: models::GEMINI_CHAT.to_string(),
            temperature: Some(0.7),
            max_output_tokens: Some(1024),
            timeout: Duration::from_millis(timeouts::LLM_REQUEST_MS),
        }
    }
}

impl GeminiConfig {
    /// Chat settings with a resolved key
    pub fn for_completion(config: &CompletionConfig, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: config.resolved_endpoint(),
            api_key: api_key.into(),
            model: config.resolved_model(),
            temperature: Some(config.temperature),
            max_output_tokens: Some(config.max_tokens),
            timeout: config.timeout(),
        }
    }

    /// Vision settings with a resolved key; generation params left to the model
    pub fn for_vision(config: &VisionConfig, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            api_key: api_key.into(),
            model: config.model.clone(),
            temperature: None,
            max_output_tokens: None,
            timeout: config.timeout(),
        }
    }
}

/// Thin `generateContent` client
pub struct GeminiClient {
    config: GeminiConfig,
    client: Client,
}

impl GeminiClient {
    pub fn new(config: GeminiConfig) -> std::result::Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::Configuration("Gemini requires an API key".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Network(e.to_string()))?;

        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }

    fn generation_config(&self) -> Option<GenerationConfig> {
        if self.config.temperature.is_none() && self.config.max_output_tokens.is_none() {
            return None;
        }
        Some(GenerationConfig {
            temperature: self.config.temperature,
            max_output_tokens: self.config.max_output_tokens,
        })
    }

    /// Send one request and return the concatenated text parts
    pub async fn generate(
        &self,
        system_instruction: Option<&str>,
        contents: Vec<Content>,
    ) -> std::result::Result<String, LlmError> {
        let request = GenerateContentRequest {
            system_instruction: system_instruction.map(|text| Content {
                role: None,
                parts: vec![Part::text(text)],
            }),
            contents,
            generation_config: self.generation_config(),
        };

        tracing::debug!(
            model = %self.config.model,
            turns = request.contents.len(),
            "Gemini request"
        );

        let response = self
            .client
            .post(self.generate_url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api(format!("HTTP {}: {}", status, error_text)));
        }

        let response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        let text = response.text();
        if text.trim().is_empty() {
            return Err(LlmError::EmptyReply);
        }
        Ok(text)
    }
}

/// Completion provider built from a prompt template (variant A)
pub struct TemplateCompletion {
    client: GeminiClient,
}

impl TemplateCompletion {
    pub fn new(config: GeminiConfig) -> std::result::Result<Self, LlmError> {
        Ok(Self {
            client: GeminiClient::new(config)?,
        })
    }
}

#[async_trait]
impl CompletionProvider for TemplateCompletion {
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ConversationTurn],
        user_text: &str,
    ) -> Result<String> {
        let rendered = PromptTemplate::chat_with_history(system_prompt).render(history, user_text);
        let contents = rendered
            .turns
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| Content::from_role(m.role, Part::text(&m.content)))
            .collect();

        self.client
            .generate(rendered.system_instruction.as_deref(), contents)
            .await
            .map_err(|e| e.into_core(Capability::Chat))
    }

    fn model_name(&self) -> &str {
        self.client.model()
    }
}

/// Image analysis through a multimodal Gemini model
pub struct GeminiVision {
    client: GeminiClient,
}

impl GeminiVision {
    pub fn new(config: GeminiConfig) -> std::result::Result<Self, LlmError> {
        Ok(Self {
            client: GeminiClient::new(config)?,
        })
    }
}

#[async_trait]
impl VisionAnalyzer for GeminiVision {
    async fn analyze(&self, image: &ImageInput, prompt: &str) -> Result<String> {
        let contents = vec![Content {
            role: Some("user".to_string()),
            parts: vec![Part::inline_image(image), Part::text(prompt)],
        }];

        self.client
            .generate(None, contents)
            .await
            .map_err(|e| e.into_core(Capability::Vision))
    }

    fn model_name(&self) -> &str {
        self.client.model()
    }
}

// Gemini API types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn from_role(role: Role, part: Part) -> Self {
        let role = match role {
            Role::Assistant => "model",
            Role::User | Role::System => "user",
        };
        Self {
            role: Some(role.to_string()),
            parts: vec![part],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl Part {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline_image(image: &ImageInput) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: image.mime_type.clone(),
                data: BASE64.encode(&image.bytes),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
    }
}

//! LLM Factory - Provider Abstraction Layer
//!
//! Creates the completion and vision providers from configuration. The
//! completion backend is chosen once, at startup, from
//! [`CompletionProviderKind`].
//!
//! ## Example
//! ```ignore
//! let settings = load_settings(None)?;
//! let completion = LlmFactory::create_completion(&settings.completion)?;
//! ```

use std::sync::Arc;

use chat_gateway_config::{CompletionConfig, CompletionProviderKind, VisionConfig};
use chat_gateway_core::{CompletionProvider, VisionAnalyzer};

use crate::{
    backend::{ChatCompletionBackend, ChatCompletionConfig},
    gemini::{GeminiConfig, GeminiVision, TemplateCompletion},
    LlmError,
};

/// Factory for creating LLM-backed providers
pub struct LlmFactory;

impl LlmFactory {
    /// Create the configured completion provider
    ///
    /// Fails with [`LlmError::Configuration`] when no credential resolves.
    pub fn create_completion(
        config: &CompletionConfig,
    ) -> std::result::Result<Arc<dyn CompletionProvider>, LlmError> {
        Self::build_completion(config, config.resolved_api_key())
    }

    /// Create the image analyzer
    pub fn create_vision(
        config: &VisionConfig,
    ) -> std::result::Result<Arc<dyn VisionAnalyzer>, LlmError> {
        Self::build_vision(config, config.resolved_api_key())
    }

    fn build_completion(
        config: &CompletionConfig,
        api_key: Option<String>,
    ) -> std::result::Result<Arc<dyn CompletionProvider>, LlmError> {
        match config.provider {
            CompletionProviderKind::Template => {
                let api_key = api_key.ok_or_else(|| {
                    LlmError::Configuration(
                        "Template completion requires GOOGLE_GENERATIVE_AI_API_KEY".to_string(),
                    )
                })?;
                let backend =
                    TemplateCompletion::new(GeminiConfig::for_completion(config, api_key))?;
                Ok(Arc::new(backend))
            }

            CompletionProviderKind::ChatCompletion => {
                let api_key = api_key.ok_or_else(|| {
                    LlmError::Configuration(
                        "Chat completion requires OPENAI_API_KEY".to_string(),
                    )
                })?;
                let backend = ChatCompletionBackend::new(ChatCompletionConfig::from_settings(
                    config, api_key,
                ))?;
                Ok(Arc::new(backend))
            }
        }
    }

    fn build_vision(
        config: &VisionConfig,
        api_key: Option<String>,
    ) -> std::result::Result<Arc<dyn VisionAnalyzer>, LlmError> {
        let api_key = api_key.ok_or_else(|| {
            LlmError::Configuration("Vision requires GOOGLE_GENERATIVE_AI_API_KEY".to_string())
        })?;
        Ok(Arc::new(GeminiVision::new(GeminiConfig::for_vision(config, api_key))?))
    }
}

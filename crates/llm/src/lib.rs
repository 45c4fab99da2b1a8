//! LLM integration for the chat gateway
//!
//! Features:
//! - Template-based completion over Gemini `generateContent`
//! - Explicit message-list completion over OpenAI-compatible APIs
//! - Image analysis with inline image data
//! - Prompt windowing shared by both completion backends

pub mod backend;
pub mod factory;
pub mod gemini;
pub mod prompt;

pub use backend::{ChatCompletionBackend, ChatCompletionConfig};
pub use factory::LlmFactory;
pub use gemini::{GeminiClient, GeminiConfig, GeminiVision, TemplateCompletion};
pub use prompt::{
    build_chat_messages, strip_leading_assistant, Message, PromptTemplate, RenderedPrompt, Role,
    TemplateSegment,
};

use chat_gateway_core::Capability;
use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Model returned an empty reply")]
    EmptyReply,

    #[error("Timeout")]
    Timeout,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Map onto the shared taxonomy for a capability
    pub fn into_core(self, capability: Capability) -> chat_gateway_core::Error {
        match self {
            LlmError::Configuration(msg) => chat_gateway_core::Error::configuration(msg),
            other => chat_gateway_core::Error::provider(capability, other.to_string()),
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for chat_gateway_core::Error {
    fn from(err: LlmError) -> Self {
        err.into_core(Capability::Chat)
    }
}

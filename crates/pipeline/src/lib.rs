//! Speech, translation and conversation orchestration
//!
//! Features:
//! - HTTP adapters for the speech/translation service (STT, TTS, translate)
//! - Rate-limited gateways that validate, check readiness, then consume budget
//! - Fail-fast stand-ins for providers without credentials
//! - The per-request conversation state machine

pub mod client;
pub mod gateway;
pub mod orchestrator;
pub mod stt;
pub mod translation;
pub mod tts;
pub mod unconfigured;

pub use client::SpeechServiceClient;
pub use gateway::{Metered, SpeechGateway, SynthesisGateway, TranslationGateway};
pub use orchestrator::{
    ConversationOrchestrator, OrchestratorOptions, PipelineInput, PipelineOutcome, PipelineStage,
    Providers, StagePlan, StageRecord, StageStatus, Utterance,
};
pub use stt::{HttpStt, HttpSttConfig};
pub use translation::{HttpTranslator, HttpTranslatorConfig};
pub use tts::{HttpTts, HttpTtsConfig};
pub use unconfigured::UnconfiguredProvider;

use chat_gateway_core::Capability;
use thiserror::Error;

/// Pipeline errors
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl PipelineError {
    /// Map onto the shared taxonomy for a capability
    pub fn into_core(self, capability: Capability) -> chat_gateway_core::Error {
        match self {
            PipelineError::Configuration(msg) => chat_gateway_core::Error::configuration(msg),
            other => chat_gateway_core::Error::provider(capability, other.to_string()),
        }
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        PipelineError::Http(err.to_string())
    }
}

impl From<hound::Error> for PipelineError {
    fn from(err: hound::Error) -> Self {
        PipelineError::Audio(err.to_string())
    }
}

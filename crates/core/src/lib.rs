//! Core traits and types for the chat gateway
//!
//! This crate provides foundational types used across all other crates:
//! - Provider traits for pluggable backends (STT, TTS, translation, completion, vision)
//! - Language table and pivot-language helpers
//! - Conversation turns and history windowing
//! - The fixed-window rate limiter shared by every capability
//! - Error taxonomy

pub mod conversation;
pub mod error;
pub mod language;
pub mod onboarding;
pub mod rate_limit;
pub mod request;
pub mod traits;
pub mod voice_config;

pub use conversation::{ConversationHistory, ConversationTurn, TurnRole, MAX_CONTEXT_TURNS};
pub use error::{Error, Result};
pub use language::{
    LanguageCode, LanguageInfo, SourceLanguage, SpeakerGender, AUTO_DETECT,
    DEFAULT_PIVOT_LANGUAGE, SUPPORTED_LANGUAGES,
};
pub use onboarding::{OnboardingReply, OnboardingStep};
pub use rate_limit::{
    Capability, ClientIdentity, RateLimitDecision, RateLimitPolicy, RateLimiter,
};
pub use request::{AudioPayload, ChatRequest, ResponseEnvelope};
pub use voice_config::VoiceParams;

// Trait re-exports
pub use traits::{
    AudioInput, CompletionProvider, ImageInput, SpeechToText, TextToSpeech, Transcript,
    TranslatedText, TranslationRequest, Translator, VisionAnalyzer,
};

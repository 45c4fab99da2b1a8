//! Centralized constants for the chat gateway
//!
//! Default endpoints, models and limits live here so that settings defaults
//! and provider constructors agree on one value.

/// Provider API endpoints
pub mod endpoints {
    /// Google Generative Language API (completion variant A and vision)
    pub const GEMINI_DEFAULT: &str = "https://generativelanguage.googleapis.com/v1beta";

    /// OpenAI-compatible API (completion variant B)
    pub const OPENAI_DEFAULT: &str = "https://api.openai.com/v1";

    /// Speech and translation service (STT, TTS, translate)
    pub const SPEECH_DEFAULT: &str = "https://api.sarvam.ai";
}

/// Environment variables consulted when a credential is not set in config
pub mod credentials {
    pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_GENERATIVE_AI_API_KEY";
    pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
    pub const SPEECH_API_KEY_ENV: &str = "SARVAM_AI_API_KEY";
}

/// Model identifiers
pub mod models {
    pub const GEMINI_CHAT: &str = "gemini-2.5-flash";
    pub const GEMINI_VISION: &str = "gemini-2.0-flash-exp";
    pub const OPENAI_CHAT: &str = "gpt-4o-mini";
    pub const STT: &str = "saarika:v2.5";
    pub const TTS: &str = "bulbul:v1";
    pub const TTS_SPEAKER: &str = "meera";
    pub const TRANSLATE: &str = "mayura:v1";
}

/// Timeouts (in milliseconds unless noted)
pub mod timeouts {
    /// LLM request timeout (ms)
    pub const LLM_REQUEST_MS: u64 = 60_000;

    /// Speech and translation request timeout (ms)
    pub const SPEECH_REQUEST_MS: u64 = 30_000;

    /// Whole HTTP request timeout (seconds)
    ///
    /// Covers the longest pipeline run: four speech/translation calls plus one
    /// completion, with headroom for reading uploads.
    pub const HTTP_REQUEST_SECS: u64 = 190;
}

/// Per-capability daily budgets
pub mod limits {
    pub const WINDOW_SECS: u64 = 24 * 60 * 60;
    pub const CHAT_PER_WINDOW: u32 = 100;
    pub const TRANSLATE_PER_WINDOW: u32 = 20;
    pub const STT_PER_WINDOW: u32 = 15;
    pub const TTS_PER_WINDOW: u32 = 15;
    pub const VISION_PER_WINDOW: u32 = 15;
}

/// Prompt defaults
pub mod prompts {
    pub const SYSTEM_PROMPT: &str = "You are a helpful AI assistant in a WhatsApp-style chat. \
        Be friendly, conversational, and concise. Keep responses natural and engaging.";

    pub const VISION_PROMPT: &str = "What's in this image?";
}

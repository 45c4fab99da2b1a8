//! Main settings module

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use chat_gateway_core::{language, Capability, LanguageCode, RateLimitPolicy};

use crate::constants::{credentials, endpoints, limits, models, prompts, timeouts};
use crate::ConfigError;

/// Prefix for environment overrides, e.g. `CHAT_GATEWAY__SERVER__PORT=9000`
pub const ENV_PREFIX: &str = "CHAT_GATEWAY";

/// Runtime environment enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    /// Development mode - permissive CORS allowed
    #[default]
    Development,
    /// Staging mode - stricter validation
    Staging,
    /// Production mode - all validations enforced
    Production,
}

impl RuntimeEnvironment {
    /// Check if strict validation should be applied
    pub fn is_strict(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: RuntimeEnvironment,

    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Chat completion provider
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Image analysis provider
    #[serde(default)]
    pub vision: VisionConfig,

    /// Speech and translation provider
    #[serde(default)]
    pub speech: SpeechConfig,

    /// Pipeline behavior
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Per-capability budgets
    #[serde(default)]
    pub rate_limits: RateLimitConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Validate settings
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_server()?;
        self.validate_completion()?;
        self.validate_pipeline()?;
        self.validate_rate_limits()?;
        Ok(())
    }

    /// Worst-case provider time for one pipeline run
    ///
    /// Voice chat makes four speech/translation calls (STT, translate in,
    /// translate out, TTS) around one completion; an image run makes fewer
    /// speech calls around one vision call.
    pub fn pipeline_budget(&self) -> Duration {
        let model = self.completion.timeout().max(self.vision.timeout());
        self.speech.timeout() * 4 + model
    }

    fn validate_server(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".to_string(),
                message: "Port must be non-zero".to_string(),
            });
        }

        if self.server.max_body_bytes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_body_bytes".to_string(),
                message: "Body limit must be non-zero".to_string(),
            });
        }

        let budget = self.pipeline_budget();
        if self.server.request_timeout() < budget {
            return Err(ConfigError::InvalidValue {
                field: "server.timeout_seconds".to_string(),
                message: format!(
                    "Must cover the provider timeouts of a full pipeline run ({}s)",
                    budget.as_secs()
                ),
            });
        }

        if self.environment.is_strict() && !self.server.cors_enabled {
            return Err(ConfigError::InvalidValue {
                field: "server.cors_enabled".to_string(),
                message: "CORS must be enabled outside development".to_string(),
            });
        }

        Ok(())
    }

    fn validate_completion(&self) -> Result<(), ConfigError> {
        let temperature = self.completion.temperature;
        if !(0.0..=2.0).contains(&temperature) {
            return Err(ConfigError::InvalidValue {
                field: "completion.temperature".to_string(),
                message: format!("Must be between 0.0 and 2.0, got {}", temperature),
            });
        }

        if self.completion.max_tokens == 0 {
            return Err(ConfigError::InvalidValue {
                field: "completion.max_tokens".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }

    fn validate_pipeline(&self) -> Result<(), ConfigError> {
        let pivot = &self.pipeline.pivot_language;
        if !language::is_supported(pivot) {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.pivot_language".to_string(),
                message: format!("'{}' is not a supported language", pivot),
            });
        }

        if self.pipeline.system_prompt.trim().is_empty() {
            return Err(ConfigError::MissingField("pipeline.system_prompt".to_string()));
        }

        Ok(())
    }

    fn validate_rate_limits(&self) -> Result<(), ConfigError> {
        let rl = &self.rate_limits;
        if rl.window_seconds == 0 {
            return Err(ConfigError::InvalidValue {
                field: "rate_limits.window_seconds".to_string(),
                message: "Window must be at least one second".to_string(),
            });
        }

        if rl.enabled {
            for capability in Capability::ALL {
                if rl.limit_for(capability) == 0 {
                    return Err(ConfigError::InvalidValue {
                        field: format!("rate_limits.{}", capability),
                        message: "Limit must be greater than 0 while rate limiting is enabled"
                            .to_string(),
                    });
                }
            }
        }

        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server host
    #[serde(default = "default_host")]
    pub host: String,

    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Maximum request body (uploads included)
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Enable CORS
    #[serde(default = "default_true")]
    pub cors_enabled: bool,

    /// CORS allowed origins
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Trust `X-Forwarded-For` / `X-Real-IP` for client identity
    #[serde(default = "default_true")]
    pub trust_forwarded_headers: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_timeout() -> u64 {
    timeouts::HTTP_REQUEST_SECS
}
fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}
fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_seconds: default_timeout(),
            max_body_bytes: default_max_body_bytes(),
            cors_enabled: true,
            cors_origins: Vec::new(),
            trust_forwarded_headers: true,
        }
    }
}

impl ServerConfig {
    /// Deadline for one whole request
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

/// Which completion backend serves chat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CompletionProviderKind {
    /// Prompt template with a history placeholder (Gemini `generateContent`)
    #[default]
    #[serde(alias = "gemini")]
    Template,
    /// Explicit message list (OpenAI-compatible `chat/completions`)
    #[serde(alias = "openai")]
    ChatCompletion,
}

impl CompletionProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::ChatCompletion => "chat_completion",
        }
    }

    fn api_key_env(&self) -> &'static str {
        match self {
            Self::Template => credentials::GOOGLE_API_KEY_ENV,
            Self::ChatCompletion => credentials::OPENAI_API_KEY_ENV,
        }
    }
}

/// Chat completion provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    /// Backend selector, fixed for the life of the process
    #[serde(default)]
    pub provider: CompletionProviderKind,

    /// API key; falls back to the provider's environment variable
    #[serde(default)]
    pub api_key: Option<String>,

    /// API base URL; provider default when unset
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Model name; provider default when unset
    #[serde(default)]
    pub model: Option<String>,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_temperature() -> f32 {
    0.7
}
fn default_max_tokens() -> usize {
    1024
}
fn default_llm_timeout_ms() -> u64 {
    timeouts::LLM_REQUEST_MS
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            provider: CompletionProviderKind::default(),
            api_key: None,
            endpoint: None,
            model: None,
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_ms: default_llm_timeout_ms(),
        }
    }
}

impl CompletionConfig {
    /// Configured key, else the provider's environment variable
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_secret(self.api_key.as_deref(), self.provider.api_key_env())
    }

    pub fn resolved_endpoint(&self) -> String {
        self.endpoint.clone().unwrap_or_else(|| {
            match self.provider {
                CompletionProviderKind::Template => endpoints::GEMINI_DEFAULT,
                CompletionProviderKind::ChatCompletion => endpoints::OPENAI_DEFAULT,
            }
            .to_string()
        })
    }

    pub fn resolved_model(&self) -> String {
        self.model.clone().unwrap_or_else(|| {
            match self.provider {
                CompletionProviderKind::Template => models::GEMINI_CHAT,
                CompletionProviderKind::ChatCompletion => models::OPENAI_CHAT,
            }
            .to_string()
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Image analysis provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisionConfig {
    /// API key; falls back to `GOOGLE_GENERATIVE_AI_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_gemini_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_vision_model")]
    pub model: String,

    #[serde(default = "default_llm_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_gemini_endpoint() -> String {
    endpoints::GEMINI_DEFAULT.to_string()
}
fn default_vision_model() -> String {
    models::GEMINI_VISION.to_string()
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: default_gemini_endpoint(),
            model: default_vision_model(),
            timeout_ms: default_llm_timeout_ms(),
        }
    }
}

impl VisionConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_secret(self.api_key.as_deref(), credentials::GOOGLE_API_KEY_ENV)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Speech-to-text, text-to-speech and translation service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// API key; falls back to `SARVAM_AI_API_KEY`
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_speech_endpoint")]
    pub base_url: String,

    #[serde(default = "default_stt_model")]
    pub stt_model: String,

    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    #[serde(default = "default_tts_speaker")]
    pub tts_speaker: String,

    #[serde(default = "default_translate_model")]
    pub translate_model: String,

    #[serde(default = "default_speech_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_speech_endpoint() -> String {
    endpoints::SPEECH_DEFAULT.to_string()
}
fn default_stt_model() -> String {
    models::STT.to_string()
}
fn default_tts_model() -> String {
    models::TTS.to_string()
}
fn default_tts_speaker() -> String {
    models::TTS_SPEAKER.to_string()
}
fn default_translate_model() -> String {
    models::TRANSLATE.to_string()
}
fn default_speech_timeout_ms() -> u64 {
    timeouts::SPEECH_REQUEST_MS
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_speech_endpoint(),
            stt_model: default_stt_model(),
            tts_model: default_tts_model(),
            tts_speaker: default_tts_speaker(),
            translate_model: default_translate_model(),
            timeout_ms: default_speech_timeout_ms(),
        }
    }
}

impl SpeechConfig {
    pub fn resolved_api_key(&self) -> Option<String> {
        resolve_secret(self.api_key.as_deref(), credentials::SPEECH_API_KEY_ENV)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Pipeline behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Language all prompts and completions are authored in
    #[serde(default = "default_pivot_language")]
    pub pivot_language: String,

    /// Fixed system instruction for chat completions
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,

    /// Attempt speech synthesis for every reply
    #[serde(default = "default_true")]
    pub synthesize_replies: bool,

    /// Prompt used when an image arrives without one
    #[serde(default = "default_vision_prompt")]
    pub default_vision_prompt: String,
}

fn default_pivot_language() -> String {
    language::DEFAULT_PIVOT_LANGUAGE.to_string()
}
fn default_system_prompt() -> String {
    prompts::SYSTEM_PROMPT.to_string()
}
fn default_vision_prompt() -> String {
    prompts::VISION_PROMPT.to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            pivot_language: default_pivot_language(),
            system_prompt: default_system_prompt(),
            synthesize_replies: true,
            default_vision_prompt: default_vision_prompt(),
        }
    }
}

impl PipelineConfig {
    pub fn pivot(&self) -> LanguageCode {
        LanguageCode::new(self.pivot_language.as_str())
    }
}

/// Fixed-window budgets per capability
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Enable rate limiting
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Window length; one day by default
    #[serde(default = "default_window_seconds")]
    pub window_seconds: u64,

    #[serde(default = "default_chat_limit")]
    pub chat: u32,

    #[serde(default = "default_translate_limit")]
    pub translate: u32,

    #[serde(default = "default_stt_limit")]
    pub stt: u32,

    #[serde(default = "default_tts_limit")]
    pub tts: u32,

    #[serde(default = "default_vision_limit")]
    pub vision: u32,
}

fn default_window_seconds() -> u64 {
    limits::WINDOW_SECS
}
fn default_chat_limit() -> u32 {
    limits::CHAT_PER_WINDOW
}
fn default_translate_limit() -> u32 {
    limits::TRANSLATE_PER_WINDOW
}
fn default_stt_limit() -> u32 {
    limits::STT_PER_WINDOW
}
fn default_tts_limit() -> u32 {
    limits::TTS_PER_WINDOW
}
fn default_vision_limit() -> u32 {
    limits::VISION_PER_WINDOW
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_seconds: default_window_seconds(),
            chat: default_chat_limit(),
            translate: default_translate_limit(),
            stt: default_stt_limit(),
            tts: default_tts_limit(),
            vision: default_vision_limit(),
        }
    }
}

impl RateLimitConfig {
    pub fn limit_for(&self, capability: Capability) -> u32 {
        match capability {
            Capability::Chat => self.chat,
            Capability::Translate => self.translate,
            Capability::Stt => self.stt,
            Capability::Tts => self.tts,
            Capability::Vision => self.vision,
        }
    }

    /// Build the limiter policy
    pub fn to_policy(&self) -> RateLimitPolicy {
        let mut policy =
            RateLimitPolicy::daily().with_window(Duration::from_secs(self.window_seconds));
        policy.enabled = self.enabled;
        Capability::ALL
            .into_iter()
            .fold(policy, |policy, capability| {
                policy.with_limit(capability, self.limit_for(capability))
            })
    }
}

/// Observability configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub log_json: bool,

    /// Enable tracing export
    #[serde(default = "default_true")]
    pub tracing_enabled: bool,

    /// OTLP endpoint for traces
    #[serde(default)]
    pub otlp_endpoint: Option<String>,

    /// Enable metrics
    #[serde(default = "default_true")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            tracing_enabled: true,
            otlp_endpoint: None,
            metrics_enabled: true,
        }
    }
}

/// Non-blank configured value, else a non-blank environment variable
fn resolve_secret(configured: Option<&str>, env_var: &str) -> Option<String> {
    configured
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .or_else(|| {
            std::env::var(env_var)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        })
}

/// Load settings from `config/` relative to the working directory
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    load_settings_from(Path::new("config"), env)
}

/// Load settings from a config directory
///
/// Priority: env vars > {dir}/{env} > {dir}/default > defaults
pub fn load_settings_from(dir: &Path, env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    // Load default config
    builder = builder.add_source(File::from(dir.join("default")).required(false));

    // Load environment-specific config
    if let Some(env_name) = env {
        builder = builder.add_source(File::from(dir.join(env_name)).required(false));
    }

    // Load from environment variables
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;
    let settings: Settings = config.try_deserialize()?;

    // Validate
    settings.validate()?;

    Ok(settings)
}

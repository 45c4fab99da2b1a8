//! Configuration management for the chat gateway
//!
//! Supports loading configuration from:
//! - YAML/TOML files under `config/` (`default`, then `{env}`)
//! - Environment variables (`CHAT_GATEWAY__` prefix, `__` separator)
//!
//! Provider credentials that are not set in config fall back to the
//! well-known provider environment variables (see [`constants::credentials`]).

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, load_settings_from, CompletionConfig, CompletionProviderKind,
    ObservabilityConfig, PipelineConfig, RateLimitConfig, RuntimeEnvironment, ServerConfig,
    Settings, SpeechConfig, VisionConfig, ENV_PREFIX,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for chat_gateway_core::Error {
    fn from(err: ConfigError) -> Self {
        chat_gateway_core::Error::configuration(err.to_string())
    }
}

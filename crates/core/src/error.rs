//! Error types for the chat gateway

use thiserror::Error;

use crate::rate_limit::{Capability, RateLimitDecision};

/// Result type alias using our Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the chat gateway
///
/// The variants form the taxonomy every boundary maps onto a response:
/// validation is a client fault, configuration is an operator fault,
/// provider is an upstream fault, and rate limiting carries the window
/// metadata needed to tell the caller when to retry.
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed or missing required input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing credential or misconfigured provider
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Upstream call failed or returned a non-success status
    #[error("{capability} provider error: {message}")]
    Provider {
        capability: Capability,
        message: String,
    },

    /// Per-client budget exhausted for a capability
    #[error("Rate limit exceeded for {capability}")]
    RateLimited {
        capability: Capability,
        decision: RateLimitDecision,
    },

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a provider error for a capability
    pub fn provider(capability: Capability, message: impl Into<String>) -> Self {
        Self::Provider {
            capability,
            message: message.into(),
        }
    }

    /// Category used for log fields and metric labels
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Configuration(_) => "configuration",
            Error::Provider { .. } => "provider",
            Error::RateLimited { .. } => "rate_limited",
            Error::Serialization(_) => "serialization",
        }
    }
}

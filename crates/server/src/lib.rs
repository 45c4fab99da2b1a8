//! Chat Gateway Server
//!
//! Provides the HTTP endpoints for chat, voice, translation, speech and
//! image analysis on top of the conversation pipeline.

pub mod http;
pub mod media;
pub mod metrics;
pub mod rate_limit;
pub mod state;

pub use http::create_router;
pub use metrics::{
    init_metrics, record_degraded_translation, record_error, record_rate_limited, record_request,
    record_request_latency, record_stage,
};
pub use rate_limit::{client_identity, quota_headers, spawn_purge_task, ClientId};
pub use state::{build_providers, AppState};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chat_gateway_core::{Capability, Error, RateLimitDecision};
use thiserror::Error;

use crate::rate_limit::limit_message;

/// Server errors
///
/// Every variant renders as a JSON body; none ever exposes provider detail
/// to the caller.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not configured: {0}")]
    NotConfigured(String),

    #[error("Rate limit exceeded for {capability}")]
    RateLimited {
        capability: Capability,
        decision: RateLimitDecision,
    },

    #[error("{capability} failed: {message}")]
    Upstream {
        capability: Capability,
        message: String,
    },

    #[error("Request exceeded {0:?}")]
    Timeout(std::time::Duration),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Convert a pipeline error raised while serving `capability`
    ///
    /// Provider failures keep the capability that actually failed, so a
    /// voice chat whose transcription failed reports a transcription error.
    pub fn from_core(capability: Capability, err: Error) -> Self {
        match err {
            Error::Validation(msg) => ServerError::InvalidRequest(msg),
            Error::Configuration(msg) => ServerError::NotConfigured(msg),
            Error::RateLimited {
                capability,
                decision,
            } => ServerError::RateLimited {
                capability,
                decision,
            },
            Error::Provider {
                capability: failed,
                message,
            } => ServerError::Upstream {
                capability: failed,
                message,
            },
            Error::Serialization(e) => ServerError::Upstream {
                capability,
                message: e.to_string(),
            },
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ServerError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServerError::NotConfigured(_)
            | ServerError::Upstream { .. }
            | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Error category used in logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::InvalidRequest(_) => "validation",
            ServerError::NotConfigured(_) => "configuration",
            ServerError::RateLimited { .. } => "rate_limited",
            ServerError::Upstream { .. } => "provider",
            ServerError::Timeout(_) => "timeout",
            ServerError::Internal(_) => "internal",
        }
    }
}

/// Generic failure text shown to callers per capability
pub fn failure_message(capability: Capability) -> &'static str {
    match capability {
        Capability::Chat => "Failed to get AI response",
        Capability::Translate => "Failed to translate text",
        Capability::Stt => "Failed to transcribe audio",
        Capability::Tts => "Failed to generate speech",
        Capability::Vision => "Failed to analyze image",
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        record_error(self.kind());

        match self {
            ServerError::InvalidRequest(message) => {
                tracing::debug!(error = %message, "Rejected invalid request");
                (status, Json(serde_json::json!({ "error": message }))).into_response()
            }
            ServerError::NotConfigured(detail) => {
                tracing::error!(
                    kind = "configuration",
                    detail = %detail,
                    "Provider not configured"
                );
                (
                    status,
                    Json(serde_json::json!({ "error": "API key not configured" })),
                )
                    .into_response()
            }
            ServerError::RateLimited {
                capability,
                decision,
            } => {
                record_rate_limited(capability);
                let body = serde_json::json!({
                    "error": limit_message(capability, decision.limit),
                    "limit": decision.limit,
                    "remaining": 0,
                    "resetAt": rate_limit::reset_at_rfc3339(&decision),
                });
                (status, quota_headers(&decision), Json(body)).into_response()
            }
            ServerError::Upstream {
                capability,
                message,
            } => {
                tracing::error!(
                    capability = %capability,
                    kind = "provider",
                    error = %message,
                    "Upstream failure"
                );
                (
                    status,
                    Json(serde_json::json!({ "error": failure_message(capability) })),
                )
                    .into_response()
            }
            ServerError::Timeout(deadline) => {
                tracing::error!(
                    kind = "timeout",
                    deadline_ms = deadline.as_millis() as u64,
                    "Request deadline exceeded"
                );
                (
                    status,
                    Json(serde_json::json!({ "error": "Request timed out" })),
                )
                    .into_response()
            }
            ServerError::Internal(message) => {
                tracing::error!(kind = "internal", error = %message, "Internal error");
                (
                    status,
                    Json(serde_json::json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

//! Observability Metrics
//!
//! Prometheus metrics endpoint for monitoring.

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
};
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;

use chat_gateway_core::Capability;
use chat_gateway_pipeline::StageRecord;

/// Global Prometheus handle
static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize metrics recorder
///
/// Must be called once at startup before recording any metrics.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_default_metrics();

    METRICS_HANDLE.get_or_init(|| handle.clone());
    Ok(handle)
}

/// Get the global metrics handle
pub fn get_metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Register default application metrics
fn register_default_metrics() {
    let endpoints = [
        "chat",
        "chat_voice",
        "translate",
        "transcribe",
        "synthesize",
        "analyze_image",
    ];
    for endpoint in endpoints {
        counter!("chat_gateway_requests_total", "endpoint" => endpoint).absolute(0);
    }

    for capability in Capability::ALL {
        counter!("chat_gateway_rate_limited_total", "capability" => capability.as_str())
            .absolute(0);
    }

    counter!("chat_gateway_degraded_translations_total").absolute(0);

    for kind in [
        "validation",
        "configuration",
        "rate_limited",
        "provider",
        "timeout",
        "internal",
    ] {
        counter!("chat_gateway_errors_total", "kind" => kind).absolute(0);
    }
}

/// Record request to endpoint
pub fn record_request(endpoint: &'static str) {
    counter!("chat_gateway_requests_total", "endpoint" => endpoint).increment(1);
}

/// Record end-to-end handler latency
pub fn record_request_latency(endpoint: &'static str, elapsed: Duration) {
    histogram!("chat_gateway_request_duration_seconds", "endpoint" => endpoint)
        .record(elapsed.as_secs_f64());
}

/// Record one pipeline stage
pub fn record_stage(record: &StageRecord) {
    histogram!(
        "chat_gateway_stage_duration_seconds",
        "stage" => record.stage.as_str(),
        "status" => record.status.as_str()
    )
    .record(record.latency.as_secs_f64());
}

/// Record a single-capability call made outside the pipeline
pub fn record_capability_latency(capability: Capability, elapsed: Duration) {
    histogram!("chat_gateway_capability_duration_seconds", "capability" => capability.as_str())
        .record(elapsed.as_secs_f64());
}

/// Record a 429
pub fn record_rate_limited(capability: Capability) {
    counter!("chat_gateway_rate_limited_total", "capability" => capability.as_str()).increment(1);
}

/// Record a reply delivered with untranslated text
pub fn record_degraded_translation() {
    counter!("chat_gateway_degraded_translations_total").increment(1);
}

/// Record error by kind
pub fn record_error(kind: &'static str) {
    counter!("chat_gateway_errors_total", "kind" => kind).increment(1);
}

/// Metrics endpoint handler
///
/// Returns Prometheus-formatted metrics.
pub async fn metrics_handler() -> impl IntoResponse {
    match get_metrics_handle() {
        Some(handle) => (
            StatusCode::OK,
            [(
                header::CONTENT_TYPE,
                "text/plain; version=0.0.4; charset=utf-8",
            )],
            handle.render(),
        ),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            [(header::CONTENT_TYPE, "text/plain")],
            "Metrics not initialized".to_string(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_gateway_pipeline::{PipelineStage, StageStatus};

    #[test]
    fn test_metric_helpers() {
        // No recorder installed; these must not panic
        record_request("chat");
        record_request_latency("chat", Duration::from_millis(120));
        record_stage(&StageRecord {
            stage: PipelineStage::Completing,
            status: StageStatus::Completed,
            cause: None,
            latency: Duration::from_millis(80),
        });
        record_capability_latency(Capability::Tts, Duration::from_millis(40));
        record_rate_limited(Capability::Tts);
        record_degraded_translation();
        record_error("provider");
    }
}

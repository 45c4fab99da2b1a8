//! HTTP Endpoints
//!
//! REST API for the chat gateway. Multipart endpoints live in [`crate::media`].

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, DefaultBodyLimit, Json, Path, State},
    http::{HeaderValue, Method, Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use chat_gateway_core::language::{self, SUPPORTED_LANGUAGES};
use chat_gateway_core::onboarding::welcome_message;
use chat_gateway_core::{
    Capability, ChatRequest, ConversationTurn, LanguageCode, OnboardingStep, ResponseEnvelope,
    SourceLanguage, SpeakerGender, Transcript, TranslationRequest, VoiceParams,
};
use chat_gateway_pipeline::{PipelineInput, PipelineOutcome};

use crate::media;
use crate::metrics::{
    metrics_handler, record_capability_latency, record_degraded_translation, record_request,
    record_rate_limited, record_request_latency, record_stage,
};
use crate::rate_limit::{quota_headers, ClientId};
use crate::state::AppState;
use crate::ServerError;

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.get_config().server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    let body_limit = server.max_body_bytes;

    Router::new()
        // Conversation
        .route("/api/chat", post(chat))
        .route("/api/chat/voice", post(media::voice_chat))
        .route("/api/analyze-image", post(media::analyze_image))
        // Single capabilities
        .route("/api/translate", post(translate))
        .route("/api/transcribe", post(media::transcribe))
        .route("/api/synthesize", post(synthesize))
        // Languages and onboarding
        .route("/api/languages", get(list_languages))
        .route("/api/greeting/:code", get(greeting))
        .route("/api/onboarding", get(onboarding_welcome).post(onboarding))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "http_request",
                        request_id = %Uuid::new_v4(),
                        method = %request.method(),
                        uri = %request.uri(),
                    )
                }))
                .layer(CompressionLayer::new())
                .layer(cors_layer),
        )
        .with_state(state)
}

/// Build CORS layer from configured origins
///
/// - If cors_enabled is false, returns permissive layer (for dev)
/// - If cors_origins is empty, defaults to localhost:3000
/// - Otherwise, uses the configured origins
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (NOT FOR PRODUCTION)");
        return CorsLayer::permissive();
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin(HeaderValue::from_static("http://localhost:3000"))
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers(Any);
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    CorsLayer::new()
        .allow_origin(parsed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// Unwrap a JSON body, turning extractor rejections into the error envelope
pub(crate) fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ServerError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ServerError::InvalidRequest(rejection.body_text()))
}

/// Run provider work under the request deadline
///
/// Elapsed work is dropped and answered with a JSON 504.
pub(crate) async fn within_deadline<T>(
    deadline: Duration,
    work: impl Future<Output = Result<T, ServerError>>,
) -> Result<T, ServerError> {
    match tokio::time::timeout(deadline, work).await {
        Ok(result) => result,
        Err(_elapsed) => Err(ServerError::Timeout(deadline)),
    }
}

/// One prior message, either a full turn (`{role, text, occurredAt}`) or
/// the chat client's stored bubble (`{message, sent}`)
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum HistoryEntry {
    Turn(ConversationTurn),
    Message {
        message: String,
        /// True for messages the user sent
        sent: bool,
    },
}

impl From<HistoryEntry> for ConversationTurn {
    fn from(entry: HistoryEntry) -> Self {
        match entry {
            HistoryEntry::Turn(turn) => turn,
            HistoryEntry::Message { message, sent: true } => ConversationTurn::user(message),
            HistoryEntry::Message { message, sent: false } => ConversationTurn::assistant(message),
        }
    }
}

/// Reply of every conversation endpoint
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    #[serde(flatten)]
    pub envelope: ResponseEnvelope,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<Transcript>,
    pub remaining: u32,
}

/// Record stage metrics for a finished pipeline run
pub(crate) fn observe_outcome(
    endpoint: &'static str,
    started: Instant,
    outcome: &PipelineOutcome,
) {
    for record in &outcome.stages {
        record_stage(record);
    }
    for capability in outcome.exhausted_capabilities() {
        record_rate_limited(capability);
    }
    if outcome.envelope.translation_degraded {
        record_degraded_translation();
    }
    record_request_latency(endpoint, started.elapsed());
}

/// Pipeline result as an HTTP response with quota headers
pub(crate) fn conversation_response(outcome: PipelineOutcome) -> impl IntoResponse {
    let headers = quota_headers(&outcome.quota);
    let body = ConversationResponse {
        remaining: outcome.quota.remaining,
        transcript: outcome.transcript,
        envelope: outcome.envelope,
    };
    (headers, Json(body))
}

/// Chat request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChatBody {
    #[serde(default, alias = "userText")]
    message: String,
    #[serde(default)]
    history: Vec<HistoryEntry>,
    /// Selected conversation language; the pivot when absent
    #[serde(default, alias = "targetLanguage", alias = "selectedLanguage")]
    language_code: Option<String>,
    /// Request spoken audio for the reply
    #[serde(default)]
    synthesize: Option<bool>,
    #[serde(default)]
    voice_params: Option<VoiceParams>,
}

/// Chat endpoint
///
/// POST /api/chat
async fn chat(
    State(state): State<AppState>,
    ClientId(client): ClientId,
    body: Result<Json<ChatBody>, JsonRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let started = Instant::now();
    record_request("chat");
    let body = json_body(body)?;

    let pivot = state.orchestrator.options().pivot.clone();
    let history = body.history.into_iter().map(ConversationTurn::from).collect();
    let request = ChatRequest::new(
        body.message,
        history,
        body.language_code.map(LanguageCode::new),
        &pivot,
    )
    .map_err(|e| ServerError::from_core(Capability::Chat, e))?;

    let mut input = PipelineInput::from(request);
    if let Some(synthesize) = body.synthesize {
        input = input.with_synthesis(synthesize);
    }
    if let Some(voice) = body.voice_params {
        input = input.with_voice_params(voice);
    }

    let outcome = within_deadline(state.request_deadline(), async {
        state
            .orchestrator
            .run(&client, input)
            .await
            .map_err(|e| ServerError::from_core(Capability::Chat, e))
    })
    .await?;

    observe_outcome("chat", started, &outcome);
    Ok(conversation_response(outcome))
}

fn default_source_language() -> String {
    language::AUTO_DETECT.to_string()
}

/// Translate request; accepts camelCase and the provider's snake_case names
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslateBody {
    #[serde(default, alias = "input")]
    text: String,
    #[serde(
        default = "default_source_language",
        alias = "source_language_code",
        alias = "sourceLanguageCode"
    )]
    source_language: String,
    #[serde(default, alias = "target_language_code", alias = "targetLanguageCode")]
    target_language: String,
    #[serde(default, alias = "speaker_gender")]
    speaker_gender: SpeakerGender,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateResponse {
    translated_text: String,
    source_language: String,
    target_language: LanguageCode,
    remaining: u32,
}

/// Translate endpoint
///
/// POST /api/translate
async fn translate(
    State(state): State<AppState>,
    ClientId(client): ClientId,
    body: Result<Json<TranslateBody>, JsonRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let started = Instant::now();
    record_request("translate");
    let body = json_body(body)?;

    let request = TranslationRequest::new(
        body.text,
        SourceLanguage::from(body.source_language),
        LanguageCode::new(body.target_language.trim()),
    )
    .with_speaker_gender(body.speaker_gender);

    let metered = within_deadline(state.request_deadline(), async {
        state
            .orchestrator
            .translation()
            .translate(&client, &request)
            .await
            .map_err(|e| ServerError::from_core(Capability::Translate, e))
    })
    .await?;

    record_capability_latency(Capability::Translate, started.elapsed());
    record_request_latency("translate", started.elapsed());

    let response = TranslateResponse {
        translated_text: metered.value.text,
        source_language: metered.value.source_language,
        target_language: metered.value.target_language,
        remaining: metered.quota.remaining,
    };
    Ok((quota_headers(&metered.quota), Json(response)))
}

/// Synthesis request; voice parameters may be flat or nested
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeBody {
    #[serde(default, alias = "input")]
    text: String,
    #[serde(default, alias = "target_language_code", alias = "targetLanguageCode")]
    target_language: String,
    #[serde(default)]
    voice_params: Option<VoiceParams>,
    #[serde(flatten)]
    flat_params: VoiceParams,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_base64: String,
    remaining: u32,
}

/// Speech synthesis endpoint
///
/// POST /api/synthesize
async fn synthesize(
    State(state): State<AppState>,
    ClientId(client): ClientId,
    body: Result<Json<SynthesizeBody>, JsonRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let started = Instant::now();
    record_request("synthesize");
    let body = json_body(body)?;

    let params = match body.voice_params {
        Some(nested) => nested.or(&body.flat_params),
        None => body.flat_params,
    };
    let language = LanguageCode::new(body.target_language.trim());

    let metered = within_deadline(state.request_deadline(), async {
        state
            .orchestrator
            .synthesis()
            .synthesize(&client, &body.text, &language, &params)
            .await
            .map_err(|e| ServerError::from_core(Capability::Tts, e))
    })
    .await?;

    record_capability_latency(Capability::Tts, started.elapsed());
    record_request_latency("synthesize", started.elapsed());

    let response = SynthesizeResponse {
        audio_base64: metered.value.into_base64(),
        remaining: metered.quota.remaining,
    };
    Ok((quota_headers(&metered.quota), Json(response)))
}

/// List supported languages in onboarding order
///
/// GET /api/languages
async fn list_languages(State(state): State<AppState>) -> Json<serde_json::Value> {
    let pivot = state.get_config().pipeline.pivot_language.clone();
    let languages: Vec<serde_json::Value> = SUPPORTED_LANGUAGES
        .iter()
        .enumerate()
        .map(|(i, l)| {
            serde_json::json!({
                "number": i + 1,
                "code": l.code,
                "name": l.name,
                "nativeName": l.native_name,
            })
        })
        .collect();

    Json(serde_json::json!({
        "pivot": pivot,
        "languages": languages,
    }))
}

/// Localized greeting
///
/// GET /api/greeting/:code
async fn greeting(Path(code): Path<String>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "languageCode": code,
        "supported": language::is_supported(&code),
        "greeting": language::greeting(&code),
    }))
}

#[derive(Debug, Deserialize)]
struct OnboardingBody {
    #[serde(default)]
    step: OnboardingStep,
    #[serde(default)]
    input: String,
}

/// GET /api/onboarding
async fn onboarding_welcome() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "reply": welcome_message(),
        "nextStep": OnboardingStep::AwaitingPermission,
        "updates": [],
    }))
}

/// Advance the onboarding flow by one user input
///
/// POST /api/onboarding
async fn onboarding(
    body: Result<Json<OnboardingBody>, JsonRejection>,
) -> Result<impl IntoResponse, ServerError> {
    let body = json_body(body)?;
    Ok(Json(body.step.advance(&body.input)))
}

/// Liveness with a configured/unconfigured report per capability
///
/// GET /health
async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let mut providers = serde_json::Map::new();
    for (capability, readiness) in state.provider_readiness() {
        let status = if readiness.is_ok() { "configured" } else { "unconfigured" };
        providers.insert(capability.as_str().to_string(), serde_json::json!(status));
    }

    Json(serde_json::json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": providers,
        "rateLimitKeys": state.limiter().tracked_keys(),
    }))
}

/// Ready when the chat provider can be called
///
/// GET /ready
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let mut checks = serde_json::Map::new();
    let mut ready = true;

    for (capability, readiness) in state.provider_readiness() {
        let ok = readiness.is_ok();
        if capability == Capability::Chat && !ok {
            ready = false;
        }
        checks.insert(
            capability.as_str().to_string(),
            serde_json::json!({
                "status": if ok { "ok" } else { "unconfigured" },
            }),
        );
    }

    let status_code = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(serde_json::json!({
            "status": if ready { "ready" } else { "not_ready" },
            "checks": checks,
        })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_gateway_config::Settings;
    use chat_gateway_pipeline::Providers;

    #[test]
    fn test_router_creation() {
        let state = AppState::with_providers(Settings::default(), Providers::unconfigured());
        let _ = create_router(state);
    }

    #[test]
    fn test_history_entry_roles() {
        let entries: Vec<HistoryEntry> = serde_json::from_str(
            r#"[{"message":"hi","sent":true},{"message":"hello","sent":false}]"#,
        )
        .unwrap();
        let turns: Vec<ConversationTurn> = entries.into_iter().map(Into::into).collect();
        assert_eq!(turns[0].role(), chat_gateway_core::TurnRole::User);
        assert_eq!(turns[1].role(), chat_gateway_core::TurnRole::Assistant);
    }

    #[test]
    fn test_history_entry_accepts_turn_shape() {
        let entries: Vec<HistoryEntry> = serde_json::from_str(
            r#"[{"role":"assistant","text":"welcome","occurredAt":"2026-01-05T09:30:00Z"},
                {"message":"hi","sent":true}]"#,
        )
        .unwrap();
        let turns: Vec<ConversationTurn> = entries.into_iter().map(Into::into).collect();
        assert_eq!(turns[0].role(), chat_gateway_core::TurnRole::Assistant);
        assert_eq!(turns[0].text(), "welcome");
        assert_eq!(turns[0].occurred_at().to_rfc3339(), "2026-01-05T09:30:00+00:00");
        assert_eq!(turns[1].role(), chat_gateway_core::TurnRole::User);
    }

    #[test]
    fn test_translate_body_accepts_snake_case() {
        let body: TranslateBody = serde_json::from_str(
            r#"{"input":"Hello","target_language_code":"hi-IN","speaker_gender":"Female"}"#,
        )
        .unwrap();
        assert_eq!(body.text, "Hello");
        assert_eq!(body.source_language, "auto");
        assert_eq!(body.target_language, "hi-IN");
        assert_eq!(body.speaker_gender, SpeakerGender::Female);
    }

    #[test]
    fn test_synthesize_body_flat_params() {
        let body: SynthesizeBody = serde_json::from_str(
            r#"{"input":"नमस्ते","target_language_code":"hi-IN","speaker":"arvind","pace":1.2}"#,
        )
        .unwrap();
        assert_eq!(body.flat_params.speaker.as_deref(), Some("arvind"));
        assert_eq!(body.flat_params.pace, Some(1.2));
        assert!(body.voice_params.is_none());
    }
}

//! HTTP-level tests: routing, status codes, error bodies and quota headers

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use chat_gateway_config::Settings;
use chat_gateway_core::{
    AudioInput, AudioPayload, Capability, CompletionProvider, ConversationTurn, Error, ImageInput,
    LanguageCode, Result, SpeechToText, TextToSpeech, Transcript, TranslatedText,
    TranslationRequest, Translator, VisionAnalyzer, VoiceParams,
};
use chat_gateway_pipeline::Providers;
use chat_gateway_server::{create_router, AppState};

struct EchoCompletion;

#[async_trait]
impl CompletionProvider for EchoCompletion {
    async fn complete(
        &self,
        _: &str,
        history: &[ConversationTurn],
        user_text: &str,
    ) -> Result<String> {
        Ok(format!("echo({}): {}", history.len(), user_text))
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

struct FailingCompletion;

#[async_trait]
impl CompletionProvider for FailingCompletion {
    async fn complete(&self, _: &str, _: &[ConversationTurn], _: &str) -> Result<String> {
        Err(Error::provider(Capability::Chat, "HTTP 401: API key invalid"))
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Answers only after the request deadline has passed
struct SlowCompletion;

#[async_trait]
impl CompletionProvider for SlowCompletion {
    async fn complete(&self, _: &str, _: &[ConversationTurn], _: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok("too late".to_string())
    }

    fn model_name(&self) -> &str {
        "slow"
    }
}

struct TaggingTranslator;

#[async_trait]
impl Translator for TaggingTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslatedText> {
        Ok(TranslatedText {
            text: format!("<{}>{}", request.target, request.text),
            source_language: request.source.as_str().to_string(),
            target_language: request.target.clone(),
        })
    }

    fn name(&self) -> &str {
        "tagging"
    }
}

#[derive(Default)]
struct FixedStt {
    calls: AtomicUsize,
}

#[async_trait]
impl SpeechToText for FixedStt {
    async fn transcribe(
        &self,
        _: &AudioInput,
        language: &LanguageCode,
        _: Option<&str>,
    ) -> Result<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Transcript {
            text: "नमस्ते".to_string(),
            language_code: language.clone(),
            duration_seconds: Some(0.8),
        })
    }

    fn model_name(&self) -> &str {
        "fixed"
    }
}

struct ToneTts;

#[async_trait]
impl TextToSpeech for ToneTts {
    async fn synthesize(&self, _: &str, _: &LanguageCode, _: &VoiceParams) -> Result<AudioPayload> {
        Ok(AudioPayload::new("UklGRg=="))
    }

    fn model_name(&self) -> &str {
        "tone"
    }
}

struct CaptionVision;

#[async_trait]
impl VisionAnalyzer for CaptionVision {
    async fn analyze(&self, image: &ImageInput, _: &str) -> Result<String> {
        Ok(format!("A picture ({} bytes)", image.bytes.len()))
    }

    fn model_name(&self) -> &str {
        "caption"
    }
}

fn working_providers() -> Providers {
    Providers {
        completion: Arc::new(EchoCompletion),
        vision: Arc::new(CaptionVision),
        translator: Arc::new(TaggingTranslator),
        stt: Arc::new(FixedStt::default()),
        tts: Arc::new(ToneTts),
    }
}

fn app_with(settings: Settings, providers: Providers) -> Router {
    create_router(AppState::with_providers(settings, providers))
}

fn app() -> Router {
    app_with(Settings::default(), working_providers())
}

fn post_json(uri: &str, client: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", client)
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

const BOUNDARY: &str = "chat-gateway-test-boundary";

fn post_multipart(
    uri: &str,
    fields: &[(&str, &str)],
    file: Option<(&str, &[u8])>,
) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
    }
    if let Some((mime, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; \
                 filename=\"upload\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, mime
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .header("x-forwarded-for", "198.51.100.20")
        .body(Body::from(body))
        .unwrap()
}

async fn json_of(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn header_str<'a>(response: &'a axum::response::Response, name: &str) -> &'a str {
    response.headers()[name].to_str().unwrap()
}

#[tokio::test]
async fn test_chat_at_pivot_language() {
    let response = app()
        .oneshot(post_json(
            "/api/chat",
            "203.0.113.7",
            json!({ "message": "Hello", "languageCode": "en-IN" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-ratelimit-limit"), "100");
    assert_eq!(header_str(&response, "x-ratelimit-remaining"), "99");
    assert!(header_str(&response, "x-ratelimit-reset").parse::<i64>().is_ok());

    let body = json_of(response).await;
    assert_eq!(body["replyText"], "echo(0): Hello");
    assert_eq!(body["translationDegraded"], false);
    assert_eq!(body["remaining"], 99);
    assert_eq!(body["audio"], "UklGRg==");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_chat_translates_both_ways() {
    let response = app()
        .oneshot(post_json(
            "/api/chat",
            "203.0.113.7",
            json!({
                "message": "नमस्ते",
                "languageCode": "hi-IN",
                "history": [
                    { "message": "पहला", "sent": true },
                    { "message": "first reply", "sent": false }
                ],
                "synthesize": false
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_of(response).await;
    assert_eq!(body["replyText"], "<hi-IN>echo(2): <en-IN>नमस्ते");
    assert!(body.get("audio").is_none());
}

#[tokio::test]
async fn test_chat_accepts_stored_turns_as_history() {
    let response = app()
        .oneshot(post_json(
            "/api/chat",
            "203.0.113.7",
            json!({
                "message": "Hello again",
                "languageCode": "en-IN",
                "history": [
                    { "role": "user", "text": "hi", "occurredAt": "2026-01-05T09:30:00Z" },
                    { "role": "assistant", "text": "hello", "occurredAt": "2026-01-05T09:30:02Z" },
                    { "message": "and one more", "sent": true }
                ],
                "synthesize": false
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_of(response).await["replyText"], "echo(3): Hello again");
}

#[tokio::test]
async fn test_slow_provider_times_out_with_json_body() {
    let mut settings = Settings::default();
    settings.server.timeout_seconds = 1;
    let providers = Providers {
        completion: Arc::new(SlowCompletion),
        ..working_providers()
    };

    let started = std::time::Instant::now();
    let response = app_with(settings, providers)
        .oneshot(post_json("/api/chat", "203.0.113.7", json!({ "message": "Hello" })))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(4));
    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(
        header_str(&response, "content-type"),
        "application/json"
    );
    assert_eq!(json_of(response).await, json!({ "error": "Request timed out" }));
}

#[tokio::test]
async fn test_blank_message_is_rejected() {
    let response = app()
        .oneshot(post_json("/api/chat", "203.0.113.7", json!({ "message": "   " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get("x-ratelimit-remaining").is_none());
    assert_eq!(json_of(response).await, json!({ "error": "Message is required" }));
}

#[tokio::test]
async fn test_malformed_json_is_rejected() {
    let request = Request::builder()
        .method("POST")
        .uri("/api/translate")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_of(response).await["error"].is_string());
}

#[tokio::test]
async fn test_translate_exhausted_budget_returns_429() {
    let mut settings = Settings::default();
    settings.rate_limits.translate = 1;
    let app = app_with(settings, working_providers());
    let body = json!({ "text": "Hello", "targetLanguage": "ta-IN" });

    let first = app
        .clone()
        .oneshot(post_json("/api/translate", "203.0.113.7", body.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(header_str(&first, "x-ratelimit-remaining"), "0");
    let first_body = json_of(first).await;
    assert_eq!(first_body["translatedText"], "<ta-IN>Hello");
    assert_eq!(first_body["remaining"], 0);

    let second = app
        .clone()
        .oneshot(post_json("/api/translate", "203.0.113.7", body.clone()))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header_str(&second, "x-ratelimit-limit"), "1");
    assert_eq!(header_str(&second, "x-ratelimit-remaining"), "0");
    let second_body = json_of(second).await;
    assert_eq!(
        second_body["error"],
        "Daily limit reached. You can translate 1 times per day."
    );
    assert_eq!(second_body["limit"], 1);
    assert_eq!(second_body["remaining"], 0);
    assert!(second_body["resetAt"].as_str().unwrap().ends_with('Z'));

    // Another client has its own window
    let other = app
        .oneshot(post_json("/api/translate", "198.51.100.9", body))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_unconfigured_provider_returns_500() {
    let response = app_with(Settings::default(), Providers::unconfigured())
        .oneshot(post_json("/api/chat", "203.0.113.7", json!({ "message": "Hello" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_of(response).await, json!({ "error": "API key not configured" }));
}

#[tokio::test]
async fn test_provider_failure_hides_detail() {
    let providers = Providers {
        completion: Arc::new(FailingCompletion),
        ..working_providers()
    };
    let response = app_with(Settings::default(), providers)
        .oneshot(post_json("/api/chat", "203.0.113.7", json!({ "message": "Hello" })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_of(response).await, json!({ "error": "Failed to get AI response" }));
}

#[tokio::test]
async fn test_synthesize_returns_audio() {
    let response = app()
        .oneshot(post_json(
            "/api/synthesize",
            "203.0.113.7",
            json!({ "text": "नमस्ते", "targetLanguage": "hi-IN", "speaker": "meera" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-ratelimit-limit"), "15");
    let body = json_of(response).await;
    assert_eq!(body["audioBase64"], "UklGRg==");
    assert_eq!(body["remaining"], 14);
}

#[tokio::test]
async fn test_transcribe_multipart() {
    let response = app()
        .oneshot(post_multipart(
            "/api/transcribe",
            &[("languageCode", "hi-IN")],
            Some(("audio/wav", b"RIFF....WAVE")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_of(response).await;
    assert_eq!(body["transcript"], "नमस्ते");
    assert_eq!(body["languageCode"], "hi-IN");
    assert_eq!(body["remaining"], 14);
}

#[tokio::test]
async fn test_transcribe_requires_file() {
    let response = app()
        .oneshot(post_multipart("/api/transcribe", &[("languageCode", "hi-IN")], None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_of(response).await, json!({ "error": "Audio file is required" }));
}

#[tokio::test]
async fn test_analyze_image_in_selected_language() {
    let response = app()
        .oneshot(post_multipart(
            "/api/analyze-image",
            &[("selectedLanguage", "bn-IN")],
            Some(("image/png", &[0x89, b'P', b'N', b'G'])),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(header_str(&response, "x-ratelimit-limit"), "15");
    let body = json_of(response).await;
    assert_eq!(body["replyText"], "<bn-IN>A picture (4 bytes)");
    assert_eq!(body["translationDegraded"], false);
}

#[tokio::test]
async fn test_voice_chat_returns_transcript() {
    let response = app()
        .oneshot(post_multipart(
            "/api/chat/voice",
            &[
                ("languageCode", "hi-IN"),
                ("history", r#"[{"message":"hi","sent":true}]"#),
                ("synthesize", "false"),
            ],
            Some(("audio/webm", b"webm-bytes")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_of(response).await;
    assert_eq!(body["transcript"]["text"], "नमस्ते");
    assert_eq!(body["replyText"], "<hi-IN>echo(1): <en-IN>नमस्ते");
    assert_eq!(body["remaining"], 99);
}

#[tokio::test]
async fn test_languages_listing() {
    let response = app().oneshot(get("/api/languages")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_of(response).await;
    assert_eq!(body["pivot"], "en-IN");
    let languages = body["languages"].as_array().unwrap();
    assert!(!languages.is_empty());
    assert_eq!(languages[0]["number"], 1);
    assert!(languages.iter().any(|l| l["code"] == "hi-IN"));
}

#[tokio::test]
async fn test_health_reports_unconfigured_providers() {
    let app = app_with(Settings::default(), Providers::unconfigured());

    let health = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    let body = json_of(health).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["providers"]["chat"], "unconfigured");
    assert_eq!(body["providers"]["tts"], "unconfigured");

    let ready = app.oneshot(get("/ready")).await.unwrap();
    assert_eq!(ready.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_of(ready).await["status"], "not_ready");
}

#[tokio::test]
async fn test_ready_with_configured_chat() {
    let response = app().oneshot(get("/ready")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_of(response).await["checks"]["chat"]["status"], "ok");
}

#[tokio::test]
async fn test_voice_chat_with_spent_speech_budget() {
    let mut settings = Settings::default();
    settings.rate_limits.stt = 1;
    let stt = Arc::new(FixedStt::default());
    let providers = Providers {
        stt: stt.clone(),
        ..working_providers()
    };
    let app = app_with(settings, providers);

    let transcribed = app
        .clone()
        .oneshot(post_multipart(
            "/api/transcribe",
            &[("languageCode", "hi-IN")],
            Some(("audio/wav", b"RIFF....WAVE")),
        ))
        .await
        .unwrap();
    assert_eq!(transcribed.status(), StatusCode::OK);

    let response = app
        .oneshot(post_multipart(
            "/api/chat/voice",
            &[("languageCode", "hi-IN"), ("synthesize", "false")],
            Some(("audio/webm", b"webm-bytes")),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(header_str(&response, "x-ratelimit-limit"), "1");
    assert_eq!(header_str(&response, "x-ratelimit-remaining"), "0");
    let body = json_of(response).await;
    assert_eq!(body["limit"], 1);
    assert_eq!(body["remaining"], 0);
    assert_eq!(stt.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_voice_chat_rejects_non_audio_upload() {
    let mut settings = Settings::default();
    settings.rate_limits.stt = 1;
    let stt = Arc::new(FixedStt::default());
    let providers = Providers {
        stt: stt.clone(),
        ..working_providers()
    };
    let app = app_with(settings, providers);

    let rejected = app
        .clone()
        .oneshot(post_multipart(
            "/api/chat/voice",
            &[("languageCode", "hi-IN")],
            Some(("image/png", &[0x89, b'P', b'N', b'G'])),
        ))
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        json_of(rejected).await,
        json!({ "error": "Unsupported audio type: image/png" })
    );
    assert_eq!(stt.calls.load(Ordering::SeqCst), 0);

    // The single unit of speech budget is still available
    let accepted = app
        .oneshot(post_multipart(
            "/api/transcribe",
            &[("languageCode", "hi-IN")],
            Some(("audio/wav", b"RIFF....WAVE")),
        ))
        .await
        .unwrap();
    assert_eq!(accepted.status(), StatusCode::OK);
    assert_eq!(header_str(&accepted, "x-ratelimit-remaining"), "0");
}

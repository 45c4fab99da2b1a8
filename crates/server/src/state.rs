//! Application State
//!
//! Shared state across all handlers. The orchestrator and its rate limiter
//! are the only request-spanning state; conversation history always comes
//! from the caller.

use std::sync::Arc;
use std::time::Duration;

use chat_gateway_config::Settings;
use chat_gateway_core::{Capability, RateLimiter, Result};
use chat_gateway_llm::LlmFactory;
use chat_gateway_pipeline::{
    ConversationOrchestrator, HttpStt, HttpSttConfig, HttpTranslator, HttpTranslatorConfig,
    HttpTts, HttpTtsConfig, OrchestratorOptions, Providers, SpeechServiceClient,
    UnconfiguredProvider,
};

/// Application state
///
/// Settings are fixed for the life of the process.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub orchestrator: Arc<ConversationOrchestrator>,
}

impl AppState {
    /// Build providers from settings and wire the pipeline
    pub fn new(config: Settings) -> Self {
        let providers = build_providers(&config);
        Self::with_providers(config, providers)
    }

    /// Wire the pipeline around explicit providers
    pub fn with_providers(config: Settings, providers: Providers) -> Self {
        let limiter = Arc::new(RateLimiter::new(config.rate_limits.to_policy()));
        let options = OrchestratorOptions::from(&config.pipeline);
        let orchestrator = ConversationOrchestrator::new(providers, limiter, options);

        Self {
            config: Arc::new(config),
            orchestrator: Arc::new(orchestrator),
        }
    }

    pub fn get_config(&self) -> &Settings {
        &self.config
    }

    /// Wall-clock budget for one request, upload included
    pub fn request_deadline(&self) -> Duration {
        self.config.server.request_timeout()
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        self.orchestrator.limiter()
    }

    /// Readiness of every capability's provider
    pub fn provider_readiness(&self) -> Vec<(Capability, Result<()>)> {
        let o = &self.orchestrator;
        vec![
            (Capability::Chat, o.completion_readiness()),
            (Capability::Translate, o.translation().readiness()),
            (Capability::Stt, o.speech().readiness()),
            (Capability::Tts, o.synthesis().readiness()),
            (Capability::Vision, o.vision_readiness()),
        ]
    }
}

/// Create every provider, substituting a fail-fast stand-in for each one
/// whose credential is missing
pub fn build_providers(settings: &Settings) -> Providers {
    let mut providers = Providers::unconfigured();

    match LlmFactory::create_completion(&settings.completion) {
        Ok(completion) => {
            tracing::info!(
                provider = settings.completion.provider.as_str(),
                model = completion.model_name(),
                "Completion provider ready"
            );
            providers.completion = completion;
        }
        Err(e) => {
            tracing::error!(
                kind = "configuration",
                capability = "chat",
                error = %e,
                "Completion provider not configured"
            );
            providers.completion = Arc::new(UnconfiguredProvider::with_reason(
                Capability::Chat,
                e.to_string(),
            ));
        }
    }

    match LlmFactory::create_vision(&settings.vision) {
        Ok(vision) => {
            tracing::info!(model = vision.model_name(), "Vision provider ready");
            providers.vision = vision;
        }
        Err(e) => {
            tracing::error!(
                kind = "configuration",
                capability = "vision",
                error = %e,
                "Vision provider not configured"
            );
            providers.vision = Arc::new(UnconfiguredProvider::with_reason(
                Capability::Vision,
                e.to_string(),
            ));
        }
    }

    match SpeechServiceClient::from_settings(&settings.speech) {
        Ok(client) => {
            let client = Arc::new(client);
            tracing::info!(base_url = client.base_url(), "Speech service ready");
            providers.translator = Arc::new(HttpTranslator::new(
                client.clone(),
                HttpTranslatorConfig::from(&settings.speech),
            ));
            providers.stt = Arc::new(HttpStt::new(
                client.clone(),
                HttpSttConfig::from(&settings.speech),
            ));
            providers.tts = Arc::new(HttpTts::new(client, HttpTtsConfig::from(&settings.speech)));
        }
        Err(e) => {
            tracing::error!(
                kind = "configuration",
                capabilities = "translate,stt,tts",
                error = %e,
                "Speech service not configured"
            );
            let reason = e.to_string();
            providers.translator = Arc::new(UnconfiguredProvider::with_reason(
                Capability::Translate,
                reason.clone(),
            ));
            providers.stt = Arc::new(UnconfiguredProvider::with_reason(
                Capability::Stt,
                reason.clone(),
            ));
            providers.tts = Arc::new(UnconfiguredProvider::with_reason(Capability::Tts, reason));
        }
    }

    providers
}

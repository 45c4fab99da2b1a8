//! Conversation Orchestrator
//!
//! Runs one request through the fixed pipeline
//! `Received → (Transcribing) → (TranslatingIn) → Completing → (TranslatingOut)
//! → (Synthesizing) → Done`.
//!
//! Which optional stages run is decided once per request by a [`StagePlan`].
//! Each stage then has a single fallback rule:
//! - Transcribing and Completing have no fallback; their failure ends the request
//! - TranslatingIn / TranslatingOut fall back to the untranslated text and mark
//!   the reply as degraded
//! - Synthesizing failure only drops the audio
//!
//! A reply left untranslated is spoken in the pivot language.
//!
//! The image path swaps the chat completion for image analysis inside the
//! Completing stage; the translation wrapping around it is identical.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chat_gateway_config::constants::prompts;
use chat_gateway_config::PipelineConfig;
use chat_gateway_core::request::now_timestamp;
use chat_gateway_core::{
    AudioInput, AudioPayload, Capability, ChatRequest, ClientIdentity, CompletionProvider,
    ConversationHistory, Error, ImageInput, LanguageCode, RateLimitDecision, RateLimiter,
    ResponseEnvelope, Result, SourceLanguage, SpeechToText, TextToSpeech, Transcript,
    TranslationRequest, Translator, VisionAnalyzer, VoiceParams,
};

use crate::gateway::{SpeechGateway, SynthesisGateway, TranslationGateway};
use crate::unconfigured::UnconfiguredProvider;

/// Pipeline stage of a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStage {
    Received,
    Transcribing,
    TranslatingIn,
    Completing,
    TranslatingOut,
    Synthesizing,
    Done,
}

/// Static stage transition map
static STAGE_TRANSITIONS: Lazy<HashMap<PipelineStage, Vec<PipelineStage>>> = Lazy::new(|| {
    use PipelineStage::*;
    let mut m = HashMap::new();
    m.insert(Received, vec![Transcribing, TranslatingIn, Completing]);
    m.insert(Transcribing, vec![TranslatingIn, Completing]);
    m.insert(TranslatingIn, vec![Completing]);
    m.insert(Completing, vec![TranslatingOut, Synthesizing, Done]);
    m.insert(TranslatingOut, vec![Synthesizing, Done]);
    m.insert(Synthesizing, vec![Done]);
    m.insert(Done, vec![]);
    m
});

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Received => "received",
            PipelineStage::Transcribing => "transcribing",
            PipelineStage::TranslatingIn => "translating_in",
            PipelineStage::Completing => "completing",
            PipelineStage::TranslatingOut => "translating_out",
            PipelineStage::Synthesizing => "synthesizing",
            PipelineStage::Done => "done",
        }
    }

    /// Valid next stages from this stage
    pub fn allowed_transitions(&self) -> &'static [PipelineStage] {
        STAGE_TRANSITIONS
            .get(self)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn can_transition_to(&self, next: PipelineStage) -> bool {
        self.allowed_transitions().contains(&next)
    }

    /// Metered capability the stage spends, when it has a budget of its own
    pub fn metered_capability(&self) -> Option<Capability> {
        match self {
            PipelineStage::Transcribing => Some(Capability::Stt),
            PipelineStage::TranslatingIn | PipelineStage::TranslatingOut => {
                Some(Capability::Translate)
            }
            PipelineStage::Synthesizing => Some(Capability::Tts),
            PipelineStage::Received | PipelineStage::Completing | PipelineStage::Done => None,
        }
    }
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which optional stages run for one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StagePlan {
    pub transcribe: bool,
    pub translate_in: bool,
    pub translate_out: bool,
    pub synthesize: bool,
}

impl StagePlan {
    /// Next stage after `stage` under this plan
    pub fn after(&self, stage: PipelineStage) -> PipelineStage {
        use PipelineStage::*;
        match stage {
            Received if self.transcribe => Transcribing,
            Received | Transcribing if self.translate_in => TranslatingIn,
            Received | Transcribing | TranslatingIn => Completing,
            Completing if self.translate_out => TranslatingOut,
            Completing | TranslatingOut if self.synthesize => Synthesizing,
            Completing | TranslatingOut | Synthesizing | Done => Done,
        }
    }

    /// Stages visited, excluding `Received`, ending with `Done`
    pub fn stages(&self) -> Vec<PipelineStage> {
        let mut stages = Vec::new();
        let mut stage = PipelineStage::Received;
        while stage != PipelineStage::Done {
            stage = self.after(stage);
            stages.push(stage);
        }
        stages
    }
}

/// What the user sent
#[derive(Debug, Clone)]
pub enum Utterance {
    Text(String),
    Voice {
        audio: AudioInput,
        model: Option<String>,
    },
    Image {
        image: ImageInput,
        prompt: Option<String>,
    },
}

/// One request's input to the pipeline
#[derive(Debug, Clone)]
pub struct PipelineInput {
    pub utterance: Utterance,
    pub history: ConversationHistory,
    /// The conversation's selected language
    pub language: LanguageCode,
    pub voice: VoiceParams,
    /// Attempt speech synthesis of the reply
    pub synthesize: bool,
}

impl PipelineInput {
    pub fn text(
        text: impl Into<String>,
        history: ConversationHistory,
        language: LanguageCode,
    ) -> Self {
        Self {
            utterance: Utterance::Text(text.into()),
            history,
            language,
            voice: VoiceParams::default(),
            synthesize: true,
        }
    }

    pub fn voice(audio: AudioInput, history: ConversationHistory, language: LanguageCode) -> Self {
        Self {
            utterance: Utterance::Voice { audio, model: None },
            history,
            language,
            voice: VoiceParams::default(),
            synthesize: true,
        }
    }

    pub fn image(image: ImageInput, prompt: Option<String>, language: LanguageCode) -> Self {
        Self {
            utterance: Utterance::Image { image, prompt },
            history: ConversationHistory::new(),
            language,
            voice: VoiceParams::default(),
            synthesize: false,
        }
    }

    pub fn with_voice_params(mut self, voice: VoiceParams) -> Self {
        self.voice = voice;
        self
    }

    pub fn with_synthesis(mut self, synthesize: bool) -> Self {
        self.synthesize = synthesize;
        self
    }

    /// Capability whose budget admits the request
    pub fn primary_capability(&self) -> Capability {
        match self.utterance {
            Utterance::Image { .. } => Capability::Vision,
            Utterance::Text(_) | Utterance::Voice { .. } => Capability::Chat,
        }
    }
}

impl From<ChatRequest> for PipelineInput {
    fn from(request: ChatRequest) -> Self {
        let (text, history, language) = request.into_parts();
        PipelineInput::text(text, history, language)
    }
}

/// How a stage ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageStatus {
    Completed,
    /// Fell back to untranslated text
    Degraded,
    /// Failed without affecting the reply (synthesis only)
    Failed,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Completed => "completed",
            StageStatus::Degraded => "degraded",
            StageStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageRecord {
    pub stage: PipelineStage,
    pub status: StageStatus,
    /// Error kind behind a `Degraded` or `Failed` status
    pub cause: Option<&'static str>,
    pub latency: Duration,
}

/// Result of a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub envelope: ResponseEnvelope,
    /// Budget decision for the request's primary capability
    pub quota: RateLimitDecision,
    /// Present for voice input
    pub transcript: Option<Transcript>,
    pub stages: Vec<StageRecord>,
}

impl PipelineOutcome {
    /// Capabilities whose exhausted budget forced a fallback in this run
    pub fn exhausted_capabilities(&self) -> Vec<Capability> {
        self.stages
            .iter()
            .filter(|record| record.cause == Some("rate_limited"))
            .filter_map(|record| record.stage.metered_capability())
            .collect()
    }
}

/// Pipeline behavior knobs
#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub pivot: LanguageCode,
    pub system_prompt: String,
    pub synthesize_replies: bool,
    pub default_vision_prompt: String,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            pivot: LanguageCode::default_pivot(),
            system_prompt: prompts::SYSTEM_PROMPT.to_string(),
            synthesize_replies: true,
            default_vision_prompt: prompts::VISION_PROMPT.to_string(),
        }
    }
}

impl From<&PipelineConfig> for OrchestratorOptions {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            pivot: config.pivot(),
            system_prompt: config.system_prompt.clone(),
            synthesize_replies: config.synthesize_replies,
            default_vision_prompt: config.default_vision_prompt.clone(),
        }
    }
}

/// Providers behind each capability
#[derive(Clone)]
pub struct Providers {
    pub completion: Arc<dyn CompletionProvider>,
    pub vision: Arc<dyn VisionAnalyzer>,
    pub translator: Arc<dyn Translator>,
    pub stt: Arc<dyn SpeechToText>,
    pub tts: Arc<dyn TextToSpeech>,
}

impl Providers {
    /// Every capability unconfigured
    pub fn unconfigured() -> Self {
        Self {
            completion: Arc::new(UnconfiguredProvider::new(Capability::Chat)),
            vision: Arc::new(UnconfiguredProvider::new(Capability::Vision)),
            translator: Arc::new(UnconfiguredProvider::new(Capability::Translate)),
            stt: Arc::new(UnconfiguredProvider::new(Capability::Stt)),
            tts: Arc::new(UnconfiguredProvider::new(Capability::Tts)),
        }
    }
}

/// Intermediate values of one run
struct RunState {
    text: String,
    reply: String,
    /// Language `reply` is written in
    reply_language: LanguageCode,
    degraded: bool,
    audio: Option<AudioPayload>,
    transcript: Option<Transcript>,
    stages: Vec<StageRecord>,
}

/// Stateless per-request pipeline; the rate limiter is the only shared state
pub struct ConversationOrchestrator {
    completion: Arc<dyn CompletionProvider>,
    vision: Arc<dyn VisionAnalyzer>,
    translation: TranslationGateway,
    speech: SpeechGateway,
    synthesis: SynthesisGateway,
    limiter: Arc<RateLimiter>,
    options: OrchestratorOptions,
}

impl ConversationOrchestrator {
    pub fn new(
        providers: Providers,
        limiter: Arc<RateLimiter>,
        options: OrchestratorOptions,
    ) -> Self {
        Self {
            completion: providers.completion,
            vision: providers.vision,
            translation: TranslationGateway::new(providers.translator, limiter.clone()),
            speech: SpeechGateway::new(providers.stt, limiter.clone()),
            synthesis: SynthesisGateway::new(providers.tts, limiter.clone()),
            limiter,
            options,
        }
    }

    pub fn translation(&self) -> &TranslationGateway {
        &self.translation
    }

    pub fn speech(&self) -> &SpeechGateway {
        &self.speech
    }

    pub fn synthesis(&self) -> &SynthesisGateway {
        &self.synthesis
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn options(&self) -> &OrchestratorOptions {
        &self.options
    }

    pub fn completion_readiness(&self) -> Result<()> {
        self.completion.readiness()
    }

    pub fn vision_readiness(&self) -> Result<()> {
        self.vision.readiness()
    }

    /// Decide the optional stages for an input
    pub fn plan(&self, input: &PipelineInput) -> StagePlan {
        let needs_translation = input.language != self.options.pivot;
        let has_user_text = match &input.utterance {
            Utterance::Image { prompt, .. } => {
                prompt.as_deref().is_some_and(|p| !p.trim().is_empty())
            }
            Utterance::Text(_) | Utterance::Voice { .. } => true,
        };

        StagePlan {
            transcribe: matches!(input.utterance, Utterance::Voice { .. }),
            translate_in: needs_translation && has_user_text,
            translate_out: needs_translation,
            synthesize: input.synthesize && self.options.synthesize_replies,
        }
    }

    fn validate(&self, input: &PipelineInput) -> Result<()> {
        if !input.language.is_supported() {
            return Err(Error::validation(format!(
                "Unsupported language: {}",
                input.language
            )));
        }

        match &input.utterance {
            Utterance::Text(text) if text.trim().is_empty() => {
                Err(Error::validation("Message is required"))
            }
            Utterance::Voice { audio, .. } if audio.is_empty() => {
                Err(Error::validation("Audio file is required"))
            }
            Utterance::Voice { audio, .. } if !audio.is_audio() => Err(Error::validation(format!(
                "Unsupported audio type: {}",
                audio.mime_type
            ))),
            Utterance::Image { image, .. } if image.is_empty() => {
                Err(Error::validation("Image file is required"))
            }
            _ => Ok(()),
        }
    }

    fn readiness(&self, input: &PipelineInput) -> Result<()> {
        match &input.utterance {
            Utterance::Text(_) => self.completion.readiness(),
            Utterance::Voice { .. } => {
                self.completion.readiness()?;
                self.speech.readiness()
            }
            Utterance::Image { .. } => self.vision.readiness(),
        }
    }

    /// Run one request through the pipeline
    ///
    /// Validation and configuration checks come first; only then is the
    /// primary capability's budget consumed.
    pub async fn run(
        &self,
        client: &ClientIdentity,
        input: PipelineInput,
    ) -> Result<PipelineOutcome> {
        self.validate(&input)?;
        self.readiness(&input)?;

        let capability = input.primary_capability();
        let quota = self.limiter.check_and_consume(capability, client);
        if !quota.allowed {
            return Err(Error::RateLimited {
                capability,
                decision: quota,
            });
        }

        let plan = self.plan(&input);
        let started = Instant::now();

        let initial_text = match &input.utterance {
            Utterance::Text(text) => text.trim().to_string(),
            Utterance::Voice { .. } => String::new(),
            Utterance::Image { prompt, .. } => prompt
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .unwrap_or(self.options.default_vision_prompt.as_str())
                .to_string(),
        };

        let mut state = RunState {
            text: initial_text,
            reply: String::new(),
            reply_language: self.options.pivot.clone(),
            degraded: false,
            audio: None,
            transcript: None,
            stages: Vec::new(),
        };

        let mut stage = PipelineStage::Received;
        loop {
            let next = plan.after(stage);
            debug_assert!(stage.can_transition_to(next));
            stage = next;
            if stage == PipelineStage::Done {
                break;
            }

            let stage_started = Instant::now();
            let result = self.run_stage(stage, client, &input, &mut state).await;
            let (status, cause) = match result {
                Ok(end) => end,
                Err(e) => {
                    state.stages.push(StageRecord {
                        stage,
                        status: StageStatus::Failed,
                        cause: Some(e.kind()),
                        latency: stage_started.elapsed(),
                    });
                    return Err(e);
                }
            };
            state.stages.push(StageRecord {
                stage,
                status,
                cause,
                latency: stage_started.elapsed(),
            });
        }

        tracing::info!(
            client = %client,
            capability = %capability,
            language = %input.language,
            degraded = state.degraded,
            audio = state.audio.is_some(),
            latency_ms = started.elapsed().as_millis() as u64,
            "Pipeline completed"
        );

        Ok(PipelineOutcome {
            envelope: ResponseEnvelope {
                reply_text: state.reply,
                timestamp: now_timestamp(),
                audio: state.audio,
                translation_degraded: state.degraded,
            },
            quota,
            transcript: state.transcript,
            stages: state.stages,
        })
    }

    async fn run_stage(
        &self,
        stage: PipelineStage,
        client: &ClientIdentity,
        input: &PipelineInput,
        state: &mut RunState,
    ) -> Result<(StageStatus, Option<&'static str>)> {
        match stage {
            PipelineStage::Transcribing => {
                let Utterance::Voice { audio, model } = &input.utterance else {
                    return Err(Error::validation("Audio file is required"));
                };
                let transcript = self
                    .speech
                    .transcribe(client, audio, &input.language, model.as_deref())
                    .await
                    .map_err(|e| log_abort(stage, e))?
                    .value;

                if transcript.text.trim().is_empty() {
                    return Err(Error::validation("No speech detected in audio"));
                }
                state.text = transcript.text.trim().to_string();
                state.transcript = Some(transcript);
                Ok((StageStatus::Completed, None))
            }

            PipelineStage::TranslatingIn => {
                let request = TranslationRequest::new(
                    state.text.as_str(),
                    SourceLanguage::Code(input.language.clone()),
                    self.options.pivot.clone(),
                );
                let end = self.translate_or_keep(stage, client, &request, &mut state.text).await;
                state.degraded |= end.0 == StageStatus::Degraded;
                Ok(end)
            }

            PipelineStage::Completing => {
                let reply = match &input.utterance {
                    Utterance::Image { image, .. } => self.vision.analyze(image, &state.text).await,
                    Utterance::Text(_) | Utterance::Voice { .. } => {
                        self.completion
                            .complete(
                                &self.options.system_prompt,
                                input.history.completion_window(),
                                &state.text,
                            )
                            .await
                    }
                }
                .map_err(|e| log_abort(stage, e))?;

                state.reply = reply;
                Ok((StageStatus::Completed, None))
            }

            PipelineStage::TranslatingOut => {
                let request = TranslationRequest::new(
                    state.reply.as_str(),
                    SourceLanguage::Code(self.options.pivot.clone()),
                    input.language.clone(),
                );
                let end = self.translate_or_keep(stage, client, &request, &mut state.reply).await;
                if end.0 == StageStatus::Degraded {
                    state.degraded = true;
                } else {
                    state.reply_language = input.language.clone();
                }
                Ok(end)
            }

            PipelineStage::Synthesizing => {
                match self
                    .synthesis
                    .synthesize(client, &state.reply, &state.reply_language, &input.voice)
                    .await
                {
                    Ok(metered) => {
                        state.audio = Some(metered.value);
                        Ok((StageStatus::Completed, None))
                    }
                    Err(e) => {
                        tracing::warn!(
                            stage = %stage,
                            kind = e.kind(),
                            error = %e,
                            "Synthesis failed, replying without audio"
                        );
                        Ok((StageStatus::Failed, Some(e.kind())))
                    }
                }
            }

            PipelineStage::Received | PipelineStage::Done => Ok((StageStatus::Completed, None)),
        }
    }

    /// Replace `text` with its translation, or keep it and report `Degraded`
    async fn translate_or_keep(
        &self,
        stage: PipelineStage,
        client: &ClientIdentity,
        request: &TranslationRequest,
        text: &mut String,
    ) -> (StageStatus, Option<&'static str>) {
        match self.translation.translate(client, request).await {
            Ok(metered) if !metered.value.text.trim().is_empty() => {
                *text = metered.value.text;
                (StageStatus::Completed, None)
            }
            Ok(_) => {
                tracing::warn!(stage = %stage, "Translation returned empty text, using original");
                (StageStatus::Degraded, Some("empty"))
            }
            Err(e) => {
                tracing::warn!(
                    stage = %stage,
                    kind = e.kind(),
                    error = %e,
                    "Translation failed, using original"
                );
                (StageStatus::Degraded, Some(e.kind()))
            }
        }
    }
}

fn log_abort(stage: PipelineStage, error: Error) -> Error {
    match &error {
        Error::Configuration(_) => tracing::error!(
            stage = %stage,
            kind = "configuration",
            error = %error,
            "Provider not configured"
        ),
        Error::RateLimited { .. } | Error::Validation(_) => {
            tracing::info!(stage = %stage, kind = error.kind(), error = %error, "Stage rejected")
        }
        _ => tracing::error!(stage = %stage, kind = error.kind(), error = %error, "Stage failed"),
    }
    error
}

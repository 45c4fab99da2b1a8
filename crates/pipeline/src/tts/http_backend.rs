//! HTTP TTS backend
//!
//! `POST {base}/text-to-speech` with the text, target language and voice
//! parameters; replies `{audios: [base64, ...]}`. Only the first clip is used.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use chat_gateway_config::constants::models;
use chat_gateway_config::SpeechConfig;
use chat_gateway_core::{
    AudioPayload, Capability, LanguageCode, Result, TextToSpeech, VoiceParams,
};

use crate::client::SpeechServiceClient;
use crate::PipelineError;

/// HTTP TTS configuration
#[derive(Debug, Clone)]
pub struct HttpTtsConfig {
    /// Defaults applied under per-call overrides
    pub defaults: VoiceParams,
}

impl Default for HttpTtsConfig {
    fn default() -> Self {
        Self {
            defaults: VoiceParams::default()
                .with_speaker(models::TTS_SPEAKER)
                .with_model(models::TTS),
        }
    }
}

impl From<&SpeechConfig> for HttpTtsConfig {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            defaults: VoiceParams::default()
                .with_speaker(config.tts_speaker.clone())
                .with_model(config.tts_model.clone()),
        }
    }
}

#[derive(Debug, Serialize)]
struct SynthesisBody<'a> {
    text: &'a str,
    target_language_code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    speaker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pitch: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pace: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    loudness: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_sample_rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    enable_preprocessing: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct SynthesisReply {
    #[serde(default)]
    audios: Vec<String>,
}

pub struct HttpTts {
    client: Arc<SpeechServiceClient>,
    config: HttpTtsConfig,
}

impl HttpTts {
    pub fn new(client: Arc<SpeechServiceClient>, config: HttpTtsConfig) -> Self {
        Self { client, config }
    }

    fn body<'a>(
        &self,
        text: &'a str,
        language: &'a LanguageCode,
        params: &VoiceParams,
    ) -> SynthesisBody<'a> {
        let params = params.clone().or(&self.config.defaults);
        SynthesisBody {
            text,
            target_language_code: language.as_str(),
            speaker: params.speaker,
            model: params.model,
            pitch: params.pitch,
            pace: params.pace,
            loudness: params.loudness,
            speech_sample_rate: params.sample_rate,
            enable_preprocessing: params.enable_preprocessing,
        }
    }

    async fn request(
        &self,
        text: &str,
        language: &LanguageCode,
        params: &VoiceParams,
    ) -> std::result::Result<AudioPayload, PipelineError> {
        let reply: SynthesisReply = self
            .client
            .post_json("/text-to-speech", &self.body(text, language, params))
            .await?;

        reply
            .audios
            .into_iter()
            .next()
            .filter(|audio| !audio.is_empty())
            .map(AudioPayload::new)
            .ok_or_else(|| PipelineError::InvalidResponse("No audio in response".to_string()))
    }
}

#[async_trait]
impl TextToSpeech for HttpTts {
    async fn synthesize(
        &self,
        text: &str,
        language: &LanguageCode,
        params: &VoiceParams,
    ) -> Result<AudioPayload> {
        self.request(text, language, params)
            .await
            .map_err(|e| e.into_core(Capability::Tts))
    }

    fn model_name(&self) -> &str {
        self.config.defaults.model.as_deref().unwrap_or(models::TTS)
    }
}

//! HTTP STT Backend - Calls the external speech-to-text service
//!
//! Sends the uploaded audio as multipart form data
//! (`file`, `model`, `language_code`) and reads back
//! `{transcript, language_code, duration}`.
//!
//! The service does not always report a duration. For WAV uploads the
//! duration is then read from the RIFF header instead.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::io::Cursor;
use std::sync::Arc;

use chat_gateway_config::constants::models;
use chat_gateway_config::SpeechConfig;
use chat_gateway_core::{AudioInput, Capability, LanguageCode, Result, SpeechToText, Transcript};

use crate::client::SpeechServiceClient;
use crate::PipelineError;

/// HTTP STT Backend configuration
#[derive(Debug, Clone)]
pub struct HttpSttConfig {
    /// Model used when the caller does not name one
    pub default_model: String,
    /// File name sent when the upload had none
    pub fallback_file_name: String,
}

impl Default for HttpSttConfig {
    fn default() -> Self {
        Self {
            default_model: models::STT.to_string(),
            fallback_file_name: "audio.wav".to_string(),
        }
    }
}

impl From<&SpeechConfig> for HttpSttConfig {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            default_model: config.stt_model.clone(),
            ..Default::default()
        }
    }
}

/// Response from the STT service
#[derive(Debug, Deserialize)]
struct SttResponse {
    transcript: String,
    #[serde(default)]
    language_code: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

/// HTTP STT Backend
pub struct HttpStt {
    client: Arc<SpeechServiceClient>,
    config: HttpSttConfig,
}

impl HttpStt {
    /// Create a new HTTP STT backend
    pub fn new(client: Arc<SpeechServiceClient>, config: HttpSttConfig) -> Self {
        Self { client, config }
    }

    fn form(
        &self,
        audio: &AudioInput,
        language: &LanguageCode,
        model: &str,
    ) -> std::result::Result<Form, PipelineError> {
        let file_name = audio
            .file_name
            .clone()
            .unwrap_or_else(|| self.config.fallback_file_name.clone());

        let file = Part::bytes(audio.bytes.clone())
            .file_name(file_name)
            .mime_str(audio.mime_essence())?;

        Ok(Form::new()
            .part("file", file)
            .text("model", model.to_string())
            .text("language_code", language.as_str().to_string()))
    }

    async fn request(
        &self,
        audio: &AudioInput,
        language: &LanguageCode,
        model: &str,
    ) -> std::result::Result<SttResponse, PipelineError> {
        let form = self.form(audio, language, model)?;
        self.client.post_multipart("/speech-to-text", form).await
    }
}

#[async_trait]
impl SpeechToText for HttpStt {
    async fn transcribe(
        &self,
        audio: &AudioInput,
        language: &LanguageCode,
        model: Option<&str>,
    ) -> Result<Transcript> {
        let model = model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(&self.config.default_model);

        let response = self
            .request(audio, language, model)
            .await
            .map_err(|e| e.into_core(Capability::Stt))?;

        let duration_seconds = response.duration.or_else(|| wav_duration(audio));

        Ok(Transcript {
            text: response.transcript,
            language_code: response
                .language_code
                .map(LanguageCode::new)
                .filter(|code| !code.is_empty())
                .unwrap_or_else(|| language.clone()),
            duration_seconds,
        })
    }

    fn model_name(&self) -> &str {
        &self.config.default_model
    }
}

fn is_wav(audio: &AudioInput) -> bool {
    let mime = audio.mime_type.to_ascii_lowercase();
    mime.contains("wav") || audio.bytes.starts_with(b"RIFF")
}

/// Duration of a WAV payload in seconds, if the header parses
fn wav_duration(audio: &AudioInput) -> Option<f64> {
    if !is_wav(audio) {
        return None;
    }
    match wav_duration_seconds(&audio.bytes) {
        Ok(seconds) => Some(seconds),
        Err(e) => {
            tracing::debug!(error = %e, "Could not read WAV header");
            None
        }
    }
}

pub(crate) fn wav_duration_seconds(bytes: &[u8]) -> std::result::Result<f64, PipelineError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    let spec = reader.spec();
    if spec.sample_rate == 0 {
        return Err(PipelineError::Audio("Sample rate is zero".to_string()));
    }
    Ok(reader.duration() as f64 / spec.sample_rate as f64)
}

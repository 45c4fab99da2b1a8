//! Speech processing traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::language::LanguageCode;
use crate::request::AudioPayload;
use crate::voice_config::VoiceParams;
use crate::Result;

/// Uploaded audio clip
#[derive(Debug, Clone)]
pub struct AudioInput {
    pub bytes: Vec<u8>,
    /// MIME type as reported by the client (e.g. `audio/wav`)
    pub mime_type: String,
    pub file_name: Option<String>,
}

impl AudioInput {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// MIME type without parameters, e.g. `audio/webm` for `audio/webm;codecs=opus`
    pub fn mime_essence(&self) -> &str {
        self.mime_type.split(';').next().unwrap_or_default().trim()
    }

    /// True for `audio/*` and `video/*` types; recorders often label webm
    /// and mp4 clips as video
    pub fn is_audio(&self) -> bool {
        match self.mime_essence().split_once('/') {
            Some((kind, subtype)) => {
                (kind.eq_ignore_ascii_case("audio") || kind.eq_ignore_ascii_case("video"))
                    && !subtype.is_empty()
                    && subtype.bytes().all(is_token_byte)
            }
            None => false,
        }
    }
}

/// Characters allowed in a MIME subtype
fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$&-^_.+".contains(&b)
}

/// Result of a transcription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transcript {
    pub text: String,
    pub language_code: LanguageCode,
    /// Clip length, when the provider or the container reports it
    pub duration_seconds: Option<f64>,
}

/// Speech-to-Text interface
///
/// The language hint is the user's selected conversation language, not the
/// pivot: transcription happens before any translation.
///
/// # Example
///
/// ```ignore
/// let stt: Arc<dyn SpeechToText> = Arc::new(HttpStt::new(client, HttpSttConfig::default()));
/// let transcript = stt.transcribe(&audio, &LanguageCode::new("hi-IN"), None).await?;
/// println!("Transcribed: {}", transcript.text);
/// ```
#[async_trait]
pub trait SpeechToText: Send + Sync + 'static {
    /// Transcribe one audio clip
    ///
    /// # Arguments
    /// * `audio` - Clip bytes and MIME type
    /// * `language` - Language spoken in the clip
    /// * `model` - Optional model override
    async fn transcribe(
        &self,
        audio: &AudioInput,
        language: &LanguageCode,
        model: Option<&str>,
    ) -> Result<Transcript>;

    /// Fails with `Configuration` when the backend cannot be called at all
    fn readiness(&self) -> Result<()> {
        Ok(())
    }

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

/// Text-to-Speech interface
///
/// # Example
///
/// ```ignore
/// let tts: Arc<dyn TextToSpeech> = Arc::new(HttpTts::new(client, HttpTtsConfig::default()));
/// let audio = tts
///     .synthesize("नमस्ते", &LanguageCode::new("hi-IN"), &VoiceParams::default())
///     .await?;
/// ```
#[async_trait]
pub trait TextToSpeech: Send + Sync + 'static {
    /// Synthesize text to base64 audio
    ///
    /// # Arguments
    /// * `text` - Text to speak
    /// * `language` - Language of the text
    /// * `params` - Overrides; unset fields use provider defaults
    async fn synthesize(
        &self,
        text: &str,
        language: &LanguageCode,
        params: &VoiceParams,
    ) -> Result<AudioPayload>;

    /// Fails with `Configuration` when the backend cannot be called at all
    fn readiness(&self) -> Result<()> {
        Ok(())
    }

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_mime_types() {
        assert!(AudioInput::new(vec![1], "audio/wav").is_audio());
        assert!(AudioInput::new(vec![1], "audio/webm;codecs=opus").is_audio());
        assert!(AudioInput::new(vec![1], "video/mp4").is_audio());
        assert!(AudioInput::new(vec![1], "Audio/MPEG").is_audio());
        assert!(AudioInput::new(vec![1], "audio/x-m4a").is_audio());

        assert!(!AudioInput::new(vec![1], "image/png").is_audio());
        assert!(!AudioInput::new(vec![1], "audio/").is_audio());
        assert!(!AudioInput::new(vec![1], "wav").is_audio());
        assert!(!AudioInput::new(vec![1], "").is_audio());
        assert!(!AudioInput::new(vec![1], "audio/we bm").is_audio());
        assert!(!AudioInput::new(vec![1], "audio/ogg/opus").is_audio());
    }

    #[test]
    fn test_mime_essence_drops_parameters() {
        let audio = AudioInput::new(vec![1], "audio/webm; codecs=opus");
        assert_eq!(audio.mime_essence(), "audio/webm");
    }
}

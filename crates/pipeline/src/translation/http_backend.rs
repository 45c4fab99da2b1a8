//! HTTP translation backend
//!
//! `POST {base}/translate` with
//! `{input, source_language_code, target_language_code, speaker_gender, model}`;
//! replies `{translated_text, source_language_code}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use chat_gateway_config::constants::models;
use chat_gateway_config::SpeechConfig;
use chat_gateway_core::{Capability, Result, TranslatedText, TranslationRequest, Translator};

use crate::client::SpeechServiceClient;

/// HTTP translator configuration
#[derive(Debug, Clone)]
pub struct HttpTranslatorConfig {
    /// Translation model identifier
    pub model: String,
}

impl Default for HttpTranslatorConfig {
    fn default() -> Self {
        Self {
            model: models::TRANSLATE.to_string(),
        }
    }
}

impl From<&SpeechConfig> for HttpTranslatorConfig {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            model: config.translate_model.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct TranslateBody<'a> {
    input: &'a str,
    source_language_code: &'a str,
    target_language_code: &'a str,
    speaker_gender: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateReply {
    translated_text: String,
    #[serde(default)]
    source_language_code: Option<String>,
}

pub struct HttpTranslator {
    client: Arc<SpeechServiceClient>,
    config: HttpTranslatorConfig,
}

impl HttpTranslator {
    pub fn new(client: Arc<SpeechServiceClient>, config: HttpTranslatorConfig) -> Self {
        Self { client, config }
    }

    fn body<'a>(&'a self, request: &'a TranslationRequest) -> TranslateBody<'a> {
        TranslateBody {
            input: &request.text,
            source_language_code: request.source.as_str(),
            target_language_code: request.target.as_str(),
            speaker_gender: request.speaker_gender.as_str(),
            model: &self.config.model,
        }
    }
}

#[async_trait]
impl Translator for HttpTranslator {
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslatedText> {
        let reply: TranslateReply = self
            .client
            .post_json("/translate", &self.body(request))
            .await
            .map_err(|e| e.into_core(Capability::Translate))?;

        let source_language = reply
            .source_language_code
            .filter(|code| !code.trim().is_empty())
            .unwrap_or_else(|| request.source.as_str().to_string());

        Ok(TranslatedText {
            text: reply.translated_text,
            source_language,
            target_language: request.target.clone(),
        })
    }

    fn name(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chat_gateway_core::{LanguageCode, SourceLanguage, SpeakerGender};
    use std::time::Duration;

    fn translator() -> HttpTranslator {
        let client = SpeechServiceClient::new("https://api.example", "k", Duration::from_secs(1))
            .unwrap();
        HttpTranslator::new(Arc::new(client), HttpTranslatorConfig::default())
    }

    #[test]
    fn test_body_uses_wire_names() {
        let translator = translator();
        let request =
            TranslationRequest::new("Hello", SourceLanguage::Auto, LanguageCode::new("hi-IN"))
                .with_speaker_gender(SpeakerGender::Female);

        let json = serde_json::to_value(translator.body(&request)).unwrap();
        assert_eq!(json["input"], "Hello");
        assert_eq!(json["source_language_code"], "auto");
        assert_eq!(json["target_language_code"], "hi-IN");
        assert_eq!(json["speaker_gender"], "Female");
        assert_eq!(json["model"], "mayura:v1");
    }

    #[test]
    fn test_reply_without_source_parses() {
        let reply: TranslateReply =
            serde_json::from_str(r#"{"translated_text":"नमस्ते"}"#).unwrap();
        assert_eq!(reply.translated_text, "नमस्ते");
        assert!(reply.source_language_code.is_none());
    }
}

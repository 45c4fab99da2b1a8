//! Stand-in for a provider whose credential is missing
//!
//! Installed at startup instead of a real backend so the process can still
//! serve the capabilities that are configured. Readiness and every call fail
//! with a configuration error, before any budget is consumed or any network
//! call made.

use async_trait::async_trait;

use chat_gateway_core::{
    AudioInput, AudioPayload, Capability, CompletionProvider, ConversationTurn, Error, ImageInput,
    LanguageCode, Result, SpeechToText, TextToSpeech, Transcript, TranslatedText,
    TranslationRequest, Translator, VisionAnalyzer, VoiceParams,
};

const MODEL_NAME: &str = "unconfigured";

#[derive(Debug, Clone)]
pub struct UnconfiguredProvider {
    capability: Capability,
    reason: String,
}

impl UnconfiguredProvider {
    pub fn new(capability: Capability) -> Self {
        Self {
            capability,
            reason: "API key not configured".to_string(),
        }
    }

    /// Keep the underlying cause for logs
    pub fn with_reason(capability: Capability, reason: impl Into<String>) -> Self {
        Self {
            capability,
            reason: reason.into(),
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    fn error(&self) -> Error {
        Error::configuration(format!("{}: {}", self.capability, self.reason))
    }

    fn fail<T>(&self) -> Result<T> {
        Err(self.error())
    }
}

#[async_trait]
impl CompletionProvider for UnconfiguredProvider {
    async fn complete(&self, _: &str, _: &[ConversationTurn], _: &str) -> Result<String> {
        self.fail()
    }

    fn readiness(&self) -> Result<()> {
        self.fail()
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }
}

#[async_trait]
impl VisionAnalyzer for UnconfiguredProvider {
    async fn analyze(&self, _: &ImageInput, _: &str) -> Result<String> {
        self.fail()
    }

    fn readiness(&self) -> Result<()> {
        self.fail()
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }
}

#[async_trait]
impl Translator for UnconfiguredProvider {
    async fn translate(&self, _: &TranslationRequest) -> Result<TranslatedText> {
        self.fail()
    }

    fn readiness(&self) -> Result<()> {
        self.fail()
    }

    fn name(&self) -> &str {
        MODEL_NAME
    }
}

#[async_trait]
impl SpeechToText for UnconfiguredProvider {
    async fn transcribe(
        &self,
        _: &AudioInput,
        _: &LanguageCode,
        _: Option<&str>,
    ) -> Result<Transcript> {
        self.fail()
    }

    fn readiness(&self) -> Result<()> {
        self.fail()
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }
}

#[async_trait]
impl TextToSpeech for UnconfiguredProvider {
    async fn synthesize(&self, _: &str, _: &LanguageCode, _: &VoiceParams) -> Result<AudioPayload> {
        self.fail()
    }

    fn readiness(&self) -> Result<()> {
        self.fail()
    }

    fn model_name(&self) -> &str {
        MODEL_NAME
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_call_is_a_configuration_error() {
        let provider = UnconfiguredProvider::new(Capability::Chat);
        assert!(matches!(
            CompletionProvider::readiness(&provider),
            Err(Error::Configuration(_))
        ));

        let err = provider.complete("sys", &[], "hi").await.unwrap_err();
        assert_eq!(err.kind(), "configuration");
        assert!(err.to_string().contains("chat"));
    }
}

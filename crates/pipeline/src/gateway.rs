//! Rate-limited capability gateways
//!
//! Every gateway call runs the same sequence: validate the input, check the
//! provider is configured, consume one unit of the caller's budget, then call
//! the provider. Nothing is consumed for a request that was going to be
//! rejected anyway, and a consumed unit is never refunded.

use std::sync::Arc;

use chat_gateway_core::{
    AudioInput, AudioPayload, Capability, ClientIdentity, Error, LanguageCode, RateLimitDecision,
    RateLimiter, Result, SpeechToText, TextToSpeech, Transcript, TranslatedText,
    TranslationRequest, Translator, VoiceParams,
};

/// Provider output together with the budget decision that admitted it
#[derive(Debug, Clone, PartialEq)]
pub struct Metered<T> {
    pub value: T,
    pub quota: RateLimitDecision,
}

fn admit(
    limiter: &RateLimiter,
    capability: Capability,
    client: &ClientIdentity,
) -> Result<RateLimitDecision> {
    let decision = limiter.check_and_consume(capability, client);
    if decision.allowed {
        Ok(decision)
    } else {
        Err(Error::RateLimited {
            capability,
            decision,
        })
    }
}

/// Translation behind the "translate" budget
#[derive(Clone)]
pub struct TranslationGateway {
    translator: Arc<dyn Translator>,
    limiter: Arc<RateLimiter>,
}

impl TranslationGateway {
    pub fn new(translator: Arc<dyn Translator>, limiter: Arc<RateLimiter>) -> Self {
        Self {
            translator,
            limiter,
        }
    }

    pub fn readiness(&self) -> Result<()> {
        self.translator.readiness()
    }

    pub async fn translate(
        &self,
        client: &ClientIdentity,
        request: &TranslationRequest,
    ) -> Result<Metered<TranslatedText>> {
        request.validate()?;
        self.translator.readiness()?;
        let quota = admit(&self.limiter, Capability::Translate, client)?;

        tracing::debug!(
            client = %client,
            source = request.source.as_str(),
            target = %request.target,
            "Translating"
        );

        let value = self.translator.translate(request).await?;
        Ok(Metered { value, quota })
    }
}

/// Transcription behind the "stt" budget
#[derive(Clone)]
pub struct SpeechGateway {
    stt: Arc<dyn SpeechToText>,
    limiter: Arc<RateLimiter>,
}

impl SpeechGateway {
    pub fn new(stt: Arc<dyn SpeechToText>, limiter: Arc<RateLimiter>) -> Self {
        Self { stt, limiter }
    }

    pub fn readiness(&self) -> Result<()> {
        self.stt.readiness()
    }

    pub async fn transcribe(
        &self,
        client: &ClientIdentity,
        audio: &AudioInput,
        language: &LanguageCode,
        model: Option<&str>,
    ) -> Result<Metered<Transcript>> {
        if audio.is_empty() {
            return Err(Error::validation("Audio file is required"));
        }
        if !audio.is_audio() {
            return Err(Error::validation(format!(
                "Unsupported audio type: {}",
                audio.mime_type
            )));
        }
        if language.is_empty() {
            return Err(Error::validation("Language code is required"));
        }
        self.stt.readiness()?;
        let quota = admit(&self.limiter, Capability::Stt, client)?;

        tracing::debug!(
            client = %client,
            language = %language,
            bytes = audio.bytes.len(),
            mime = %audio.mime_type,
            "Transcribing"
        );

        let value = self.stt.transcribe(audio, language, model).await?;
        Ok(Metered { value, quota })
    }
}

/// Speech synthesis behind the "tts" budget
#[derive(Clone)]
pub struct SynthesisGateway {
    tts: Arc<dyn TextToSpeech>,
    limiter: Arc<RateLimiter>,
}

impl SynthesisGateway {
    pub fn new(tts: Arc<dyn TextToSpeech>, limiter: Arc<RateLimiter>) -> Self {
        Self { tts, limiter }
    }

    pub fn readiness(&self) -> Result<()> {
        self.tts.readiness()
    }

    pub async fn synthesize(
        &self,
        client: &ClientIdentity,
        text: &str,
        language: &LanguageCode,
        params: &VoiceParams,
    ) -> Result<Metered<AudioPayload>> {
        if text.trim().is_empty() {
            return Err(Error::validation("Input text is required"));
        }
        if language.is_empty() {
            return Err(Error::validation("Target language code is required"));
        }
        self.tts.readiness()?;
        let quota = admit(&self.limiter, Capability::Tts, client)?;

        tracing::debug!(
            client = %client,
            language = %language,
            chars = text.chars().count(),
            "Synthesizing"
        );

        let value = self.tts.synthesize(text, language, params).await?;
        Ok(Metered { value, quota })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unconfigured::UnconfiguredProvider;
    use async_trait::async_trait;
    use chat_gateway_core::{RateLimitPolicy, SourceLanguage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoTranslator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Translator for EchoTranslator {
        async fn translate(&self, request: &TranslationRequest) -> Result<TranslatedText> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(TranslatedText {
                text: format!("[{}] {}", request.target, request.text),
                source_language: request.source.as_str().to_string(),
                target_language: request.target.clone(),
            })
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn limiter(translate_limit: u32) -> Arc<RateLimiter> {
        Arc::new(RateLimiter::new(
            RateLimitPolicy::default().with_limit(Capability::Translate, translate_limit),
        ))
    }

    fn request(text: &str) -> TranslationRequest {
        TranslationRequest::new(text, SourceLanguage::Auto, LanguageCode::new("hi-IN"))
    }

    #[tokio::test]
    async fn test_budget_exhaustion_skips_provider() {
        let translator = Arc::new(EchoTranslator {
            calls: AtomicUsize::new(0),
        });
        let gateway = TranslationGateway::new(translator.clone(), limiter(2));
        let client = ClientIdentity::new("10.0.0.1");

        let first = gateway.translate(&client, &request("Hi")).await.unwrap();
        assert_eq!(first.quota.remaining, 1);
        assert_eq!(first.value.text, "[hi-IN] Hi");
        gateway.translate(&client, &request("Hi")).await.unwrap();

        let err = gateway.translate(&client, &request("Hi")).await.unwrap_err();
        match err {
            Error::RateLimited { capability, decision } => {
                assert_eq!(capability, Capability::Translate);
                assert_eq!(decision.remaining, 0);
                assert_eq!(decision.limit, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(translator.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_validation_does_not_consume_budget() {
        let limiter = limiter(1);
        let gateway = TranslationGateway::new(
            Arc::new(EchoTranslator {
                calls: AtomicUsize::new(0),
            }),
            limiter.clone(),
        );
        let client = ClientIdentity::anonymous();

        assert!(matches!(
            gateway.translate(&client, &request("   ")).await,
            Err(Error::Validation(_))
        ));
        assert!(gateway.translate(&client, &request("ok")).await.is_ok());
    }

    #[tokio::test]
    async fn test_unconfigured_provider_fails_before_budget() {
        let limiter = limiter(1);
        let gateway = SpeechGateway::new(
            Arc::new(UnconfiguredProvider::new(Capability::Stt)),
            limiter.clone(),
        );
        let client = ClientIdentity::new("ip-1");
        let audio = AudioInput::new(vec![1, 2, 3], "audio/wav");

        let err = gateway
            .transcribe(&client, &audio, &LanguageCode::new("hi-IN"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn test_empty_audio_rejected() {
        let gateway = SpeechGateway::new(
            Arc::new(UnconfiguredProvider::new(Capability::Stt)),
            limiter(1),
        );
        let err = gateway
            .transcribe(
                &ClientIdentity::anonymous(),
                &AudioInput::new(Vec::new(), "audio/wav"),
                &LanguageCode::new("hi-IN"),
                None,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(ref m) if m == "Audio file is required"));
    }

    #[tokio::test]
    async fn test_non_audio_upload_keeps_budget() {
        let limiter = Arc::new(RateLimiter::new(
            RateLimitPolicy::default().with_limit(Capability::Stt, 1),
        ));
        let gateway = SpeechGateway::new(
            Arc::new(UnconfiguredProvider::new(Capability::Stt)),
            limiter.clone(),
        );
        let err = gateway
            .transcribe(
                &ClientIdentity::new("ip-2"),
                &AudioInput::new(vec![0x89, b'P', b'N', b'G'], "image/png"),
                &LanguageCode::new("hi-IN"),
                None,
            )
            .await
            .unwrap_err();
        assert!(
            matches!(err, Error::Validation(ref m) if m == "Unsupported audio type: image/png")
        );
        assert_eq!(limiter.tracked_keys(), 0);
    }
}

//! Translation trait

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::language::{LanguageCode, SourceLanguage, SpeakerGender};
use crate::{Error, Result};

/// One translation call
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub text: String,
    pub source: SourceLanguage,
    pub target: LanguageCode,
    pub speaker_gender: SpeakerGender,
}

impl TranslationRequest {
    pub fn new(
        text: impl Into<String>,
        source: impl Into<SourceLanguage>,
        target: LanguageCode,
    ) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            target,
            speaker_gender: SpeakerGender::default(),
        }
    }

    pub fn with_speaker_gender(mut self, gender: SpeakerGender) -> Self {
        self.speaker_gender = gender;
        self
    }

    /// Reject blank text and a missing target
    pub fn validate(&self) -> Result<()> {
        if self.text.trim().is_empty() {
            return Err(Error::validation("Input text is required"));
        }
        if self.target.is_empty() {
            return Err(Error::validation("Target language code is required"));
        }
        Ok(())
    }
}

/// Translated text with the languages the provider actually used
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedText {
    pub text: String,
    /// Detected language when the request asked for auto-detection
    pub source_language: String,
    pub target_language: LanguageCode,
}

/// Translator interface
///
/// Implementations:
/// - `HttpTranslator` - hosted translation REST API
///
/// # Example
///
/// ```ignore
/// let request = TranslationRequest::new(
///     "Hello",
///     SourceLanguage::Code(LanguageCode::new("en-IN")),
///     LanguageCode::new("hi-IN"),
/// );
/// let translated = translator.translate(&request).await?;
/// ```
#[async_trait]
pub trait Translator: Send + Sync + 'static {
    /// Translate text between languages
    async fn translate(&self, request: &TranslationRequest) -> Result<TranslatedText>;

    /// Fails with `Configuration` when the backend cannot be called at all
    fn readiness(&self) -> Result<()> {
        Ok(())
    }

    /// Get translator name for logging
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation() {
        let ok = TranslationRequest::new("Hello", SourceLanguage::Auto, LanguageCode::new("hi-IN"));
        assert!(ok.validate().is_ok());

        let blank = TranslationRequest::new("  ", SourceLanguage::Auto, LanguageCode::new("hi-IN"));
        assert!(matches!(blank.validate(), Err(Error::Validation(_))));

        let no_target =
            TranslationRequest::new("Hello", SourceLanguage::Auto, LanguageCode::new(""));
        assert!(matches!(no_target.validate(), Err(Error::Validation(_))));
    }
}

//! Inbound chat request and outbound response envelope

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};

use crate::conversation::ConversationHistory;
use crate::language::LanguageCode;
use crate::{Error, Result};

/// A validated chat request
///
/// Construction enforces that the user text is non-blank.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    user_text: String,
    history: ConversationHistory,
    target_language: LanguageCode,
}

impl ChatRequest {
    /// Validate and build; a missing target language defaults to the pivot
    pub fn new(
        user_text: impl Into<String>,
        history: ConversationHistory,
        target_language: Option<LanguageCode>,
        pivot: &LanguageCode,
    ) -> Result<Self> {
        let user_text = user_text.into();
        if user_text.trim().is_empty() {
            return Err(Error::validation("Message is required"));
        }

        let target_language = match target_language {
            Some(code) if !code.is_empty() => code,
            _ => pivot.clone(),
        };
        if !target_language.is_supported() {
            return Err(Error::validation(format!(
                "Unsupported language: {}",
                target_language
            )));
        }

        Ok(Self {
            user_text: user_text.trim().to_string(),
            history,
            target_language,
        })
    }

    pub fn user_text(&self) -> &str {
        &self.user_text
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }

    pub fn target_language(&self) -> &LanguageCode {
        &self.target_language
    }

    pub fn into_parts(self) -> (String, ConversationHistory, LanguageCode) {
        (self.user_text, self.history, self.target_language)
    }
}

/// Base64-encoded synthesized audio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AudioPayload(String);

impl AudioPayload {
    pub fn new(base64: impl Into<String>) -> Self {
        Self(base64.into())
    }

    pub fn as_base64(&self) -> &str {
        &self.0
    }

    pub fn into_base64(self) -> String {
        self.0
    }
}

/// Final result of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub reply_text: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioPayload>,
    /// Set whenever a translation stage failed and pivot-language text was used
    pub translation_degraded: bool,
}

/// Wall-clock reply time, e.g. `9:05 PM`
pub fn display_timestamp<Tz: TimeZone>(at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    at.format("%-I:%M %p").to_string()
}

/// Current local time formatted for a reply
pub fn now_timestamp() -> String {
    display_timestamp(&Local::now())
}

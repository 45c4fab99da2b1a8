//! Voice parameters for speech synthesis

use serde::{Deserialize, Serialize};

/// Optional overrides for a synthesis call
///
/// Every field left as `None` falls back to the provider default.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceParams {
    /// Voice identity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speaker: Option<String>,
    /// Synthesis model identifier
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pace: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loudness: Option<f32>,
    /// Output sample rate in Hz
    #[serde(
        default,
        alias = "speechSampleRate",
        alias = "speech_sample_rate",
        skip_serializing_if = "Option::is_none"
    )]
    pub sample_rate: Option<u32>,
    #[serde(default, alias = "enable_preprocessing", skip_serializing_if = "Option::is_none")]
    pub enable_preprocessing: Option<bool>,
}

impl VoiceParams {
    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Fill unset fields from `defaults`
    pub fn or(self, defaults: &VoiceParams) -> VoiceParams {
        VoiceParams {
            speaker: self.speaker.or_else(|| defaults.speaker.clone()),
            model: self.model.or_else(|| defaults.model.clone()),
            pitch: self.pitch.or(defaults.pitch),
            pace: self.pace.or(defaults.pace),
            loudness: self.loudness.or(defaults.loudness),
            sample_rate: self.sample_rate.or(defaults.sample_rate),
            enable_preprocessing: self.enable_preprocessing.or(defaults.enable_preprocessing),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_win_over_defaults() {
        let defaults = VoiceParams::default().with_speaker("meera").with_model("bulbul:v1");
        let merged = VoiceParams {
            pace: Some(1.2),
            ..VoiceParams::default().with_speaker("arvind")
        }
        .or(&defaults);

        assert_eq!(merged.speaker.as_deref(), Some("arvind"));
        assert_eq!(merged.model.as_deref(), Some("bulbul:v1"));
        assert_eq!(merged.pace, Some(1.2));
        assert!(merged.pitch.is_none());
    }
}

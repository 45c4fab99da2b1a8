//! Supported conversation languages
//!
//! Membership in [`SUPPORTED_LANGUAGES`] is the only definition of a
//! supported language. One code is designated the pivot language: system
//! prompts and completions happen in it, and every other language is
//! translated to and from it.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Default pivot language
pub const DEFAULT_PIVOT_LANGUAGE: &str = "en-IN";

/// Sentinel accepted as a translation source meaning "detect it"
pub const AUTO_DETECT: &str = "auto";

/// Display metadata for one supported language
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageInfo {
    pub code: &'static str,
    pub name: &'static str,
    pub native_name: &'static str,
    #[serde(skip)]
    pub greeting: &'static str,
}

/// Supported languages, in onboarding order (selection numbers are 1-based)
pub const SUPPORTED_LANGUAGES: &[LanguageInfo] = &[
    LanguageInfo {
        code: "en-IN",
        name: "English",
        native_name: "English",
        greeting: "Hello! I'm your AI assistant. How can I help you today?",
    },
    LanguageInfo {
        code: "hi-IN",
        name: "Hindi",
        native_name: "हिंदी",
        greeting: "नमस्ते! मैं आपका एआई सहायक हूं। आज मैं आपकी कैसे मदद कर सकता हूं?",
    },
    LanguageInfo {
        code: "bn-IN",
        name: "Bengali",
        native_name: "বাংলা",
        greeting: "হ্যালো! আমি আপনার AI সহকারী। আজ আমি আপনাকে কীভাবে সাহায্য করতে পারি?",
    },
    LanguageInfo {
        code: "ta-IN",
        name: "Tamil",
        native_name: "தமிழ்",
        greeting: "வணக்கம்! நான் உங்கள் AI உதவியாளர். இன்று நான் உங்களுக்கு எப்படி உதவ முடியும்?",
    },
    LanguageInfo {
        code: "te-IN",
        name: "Telugu",
        native_name: "తెలుగు",
        greeting: "హలో! నేను మీ AI అసిస్టెంట్. నేను మీకు ఎలా సహాయం చేయగలను?",
    },
    LanguageInfo {
        code: "gu-IN",
        name: "Gujarati",
        native_name: "ગુજરાતી",
        greeting: "હેલો! હું તમારો AI સહાયક છું. આજે હું તમને કેવી રીતે મદદ કરી શકું?",
    },
    LanguageInfo {
        code: "kn-IN",
        name: "Kannada",
        native_name: "ಕನ್ನಡ",
        greeting: "ಹಲೋ! ನಾನು ನಿಮ್ಮ AI ಸಹಾಯಕ. ಇಂದು ನಾನು ನಿಮಗೆ ಹೇಗೆ ಸಹಾಯ ಮಾಡಬಲ್ಲೆ?",
    },
    LanguageInfo {
        code: "ml-IN",
        name: "Malayalam",
        native_name: "മലയാളം",
        greeting: "ഹലോ! ഞാൻ നിങ്ങളുടെ AI അസിസ്റ്റന്റ് ആണ്. ഇന്ന് ഞാൻ നിങ്ങളെ എങ്ങനെ സഹായിക്കും?",
    },
    LanguageInfo {
        code: "mr-IN",
        name: "Marathi",
        native_name: "मराठी",
        greeting: "नमस्कार! मी तुमचा AI सहाय्यक आहे. आज मी तुम्हाला कशी मदत करू शकतो?",
    },
    LanguageInfo {
        code: "pa-IN",
        name: "Punjabi",
        native_name: "ਪੰਜਾਬੀ",
        greeting: "ਸਤ ਸ੍ਰੀ ਅਕਾਲ! ਮੈਂ ਤੁਹਾਡਾ AI ਸਹਾਇਕ ਹਾਂ। ਅੱਜ ਮੈਂ ਤੁਹਾਡੀ ਕਿਵੇਂ ਮਦਦ ਕਰ ਸਕਦਾ ਹਾਂ?",
    },
    LanguageInfo {
        code: "od-IN",
        name: "Odia",
        native_name: "ଓଡ଼ିଆ",
        greeting: "ନମସ୍କାର! ମୁଁ ଆପଣଙ୍କ AI ସହାୟକ। ଆଜି ମୁଁ ଆପଣଙ୍କୁ କିପରି ସାହାଯ୍ୟ କରିପାରିବି?",
    },
];

static LANGUAGE_INDEX: Lazy<HashMap<&'static str, &'static LanguageInfo>> =
    Lazy::new(|| SUPPORTED_LANGUAGES.iter().map(|l| (l.code, l)).collect());

/// Look up a supported language by code
pub fn lookup(code: &str) -> Option<&'static LanguageInfo> {
    LANGUAGE_INDEX.get(code).copied()
}

/// Look up a supported language by its 1-based onboarding number
pub fn by_number(number: usize) -> Option<&'static LanguageInfo> {
    number
        .checked_sub(1)
        .and_then(|index| SUPPORTED_LANGUAGES.get(index))
}

/// Check if a code is in the supported table
pub fn is_supported(code: &str) -> bool {
    LANGUAGE_INDEX.contains_key(code)
}

/// Localized greeting, falling back to the default pivot greeting
pub fn greeting(code: &str) -> &'static str {
    lookup(code)
        .or_else(|| lookup(DEFAULT_PIVOT_LANGUAGE))
        .map(|l| l.greeting)
        .unwrap_or_default()
}

/// Opaque language identifier (BCP-47-like, e.g. `hi-IN`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into().trim().to_string())
    }

    /// The default pivot language
    pub fn default_pivot() -> Self {
        Self::new(DEFAULT_PIVOT_LANGUAGE)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_supported(&self) -> bool {
        is_supported(&self.0)
    }

    /// Display metadata if supported
    pub fn info(&self) -> Option<&'static LanguageInfo> {
        lookup(&self.0)
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LanguageCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

/// Translation source: a concrete language or auto-detect
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum SourceLanguage {
    #[default]
    Auto,
    Code(LanguageCode),
}

impl SourceLanguage {
    pub fn as_str(&self) -> &str {
        match self {
            SourceLanguage::Auto => AUTO_DETECT,
            SourceLanguage::Code(code) => code.as_str(),
        }
    }
}

impl From<String> for SourceLanguage {
    fn from(value: String) -> Self {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case(AUTO_DETECT) {
            SourceLanguage::Auto
        } else {
            SourceLanguage::Code(LanguageCode::new(trimmed))
        }
    }
}

impl From<SourceLanguage> for String {
    fn from(value: SourceLanguage) -> Self {
        value.as_str().to_string()
    }
}

impl From<LanguageCode> for SourceLanguage {
    fn from(code: LanguageCode) -> Self {
        SourceLanguage::Code(code)
    }
}

/// Speaker gender hint passed to translation (affects gendered phrasing)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum SpeakerGender {
    #[default]
    Male,
    Female,
}

impl SpeakerGender {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpeakerGender::Male => "Male",
            SpeakerGender::Female => "Female",
        }
    }
}

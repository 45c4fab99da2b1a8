//! First-run onboarding: microphone permission, then language selection
//!
//! The caller owns persistence. These helpers only interpret replies and
//! say which preference keys should change.

use serde::{Deserialize, Serialize};

use crate::language::{self, LanguageInfo, SUPPORTED_LANGUAGES};

/// Client-side storage key for the selected language
pub const LANGUAGE_STORAGE_KEY: &str = "preferredLanguage";
/// Client-side storage key for the microphone permission flag
pub const PERMISSIONS_STORAGE_KEY: &str = "permissionsGranted";
/// Client-side storage key for the onboarding-complete flag
pub const ONBOARDING_COMPLETE_KEY: &str = "onboardingComplete";

const YES_WORDS: &[&str] = &[
    "yes", "y", "yeah", "yep", "sure", "ok", "okay", "yea", "yup", "हां", "हाँ", "ஆம்", "అవును",
    "ହଁ", "ਹਾਂ", "હા", "ಹೌದು", "ഉം", "होय",
];

const NO_WORDS: &[&str] = &[
    "no", "n", "nope", "nah", "नहीं", "இல்லை", "కాదు", "ନା", "ਨਹੀਂ", "ના", "ಇಲ್ಲ", "ഇല്ല", "नाही",
];

/// Interpret a yes/no reply in any supported language
pub fn parse_yes_no(input: &str) -> Option<bool> {
    let normalized = input.trim().to_lowercase();
    if YES_WORDS.contains(&normalized.as_str()) {
        Some(true)
    } else if NO_WORDS.contains(&normalized.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Interpret a 1-based language number
pub fn parse_language_selection(input: &str) -> Option<usize> {
    input
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| (1..=SUPPORTED_LANGUAGES.len()).contains(n))
}

/// Where the user is in onboarding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    #[default]
    AwaitingPermission,
    AwaitingLanguage,
    Complete,
}

/// Reply to one onboarding input
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingReply {
    pub reply: String,
    pub next_step: OnboardingStep,
    /// Storage keys the client should write, with their new values
    pub updates: Vec<(String, String)>,
}

/// First message shown before any input
pub fn welcome_message() -> &'static str {
    "Hello! 👋 Welcome! I'm your AI assistant. \
     Before we start chatting, I'd like to get to know you better.\n\n\
     First, I'll need your permission to use a few features. \
     May I have access to your microphone for voice messages? 🎤\n\n\
     Just type *yes* or *no*."
}

fn language_menu() -> String {
    SUPPORTED_LANGUAGES
        .iter()
        .enumerate()
        .map(|(i, l)| {
            if l.name == l.native_name {
                format!("{}. {}", i + 1, l.name)
            } else {
                format!("{}. {} ({})", i + 1, l.native_name, l.name)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn language_prompt(intro: &str) -> String {
    format!(
        "{}\n\nLet me know which language you'd like to chat in. \
         Please type the number of your preferred language:\n\n{}\n\n\
         Just type a number between 1 and {}.",
        intro,
        language_menu(),
        SUPPORTED_LANGUAGES.len()
    )
}

fn confirmation(language: &LanguageInfo) -> String {
    format!(
        "Excellent choice! I'll chat with you in {} ({}). 🎊\n\n\
         You're all set! How can I help you today?",
        language.name, language.native_name
    )
}

impl OnboardingStep {
    /// Consume one user input and move the flow forward
    ///
    /// Unrecognized input keeps the current step and re-prompts.
    pub fn advance(self, input: &str) -> OnboardingReply {
        match self {
            OnboardingStep::AwaitingPermission => match parse_yes_no(input) {
                Some(granted) => {
                    let intro = if granted {
                        "Great! Thank you for allowing microphone access! 🎉"
                    } else {
                        "No problem! You can still type messages to chat with me. 📝"
                    };
                    OnboardingReply {
                        reply: language_prompt(intro),
                        next_step: OnboardingStep::AwaitingLanguage,
                        updates: vec![(PERMISSIONS_STORAGE_KEY.to_string(), granted.to_string())],
                    }
                }
                None => OnboardingReply {
                    reply: "I didn't quite catch that. Could you please type *yes* or *no*?"
                        .to_string(),
                    next_step: self,
                    updates: Vec::new(),
                },
            },
            OnboardingStep::AwaitingLanguage => {
                match parse_language_selection(input).and_then(language::by_number) {
                    Some(selected) => OnboardingReply {
                        reply: confirmation(selected),
                        next_step: OnboardingStep::Complete,
                        updates: vec![
                            (LANGUAGE_STORAGE_KEY.to_string(), selected.code.to_string()),
                            (ONBOARDING_COMPLETE_KEY.to_string(), "true".to_string()),
                        ],
                    },
                    None => OnboardingReply {
                        reply: format!(
                            "I didn't understand that. \
                             Please type a number between 1 and {} to select your language.",
                            SUPPORTED_LANGUAGES.len()
                        ),
                        next_step: self,
                        updates: Vec::new(),
                    },
                }
            }
            OnboardingStep::Complete => OnboardingReply {
                reply: "You're all set! How can I help you today?".to_string(),
                next_step: self,
                updates: Vec::new(),
            },
        }
    }
}

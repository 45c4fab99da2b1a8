//! Core traits for the chat gateway
//!
//! Every external provider sits behind one of these traits so that:
//! - Backends can be swapped by configuration
//! - The orchestrator can be tested with in-process mocks
//!
//! # Trait Hierarchy
//!
//! ```text
//! Speech Processing:
//!   - SpeechToText: Audio → Transcript
//!   - TextToSpeech: Text → base64 audio
//!
//! Text Processing:
//!   - Translator: Text in one language → text in another
//!
//! Language Models:
//!   - CompletionProvider: System prompt + history + input → reply
//!   - VisionAnalyzer: Image + prompt → description
//! ```
//!
//! All traits expose `readiness()`, which lets callers fail fast on a
//! misconfigured provider before spending any rate-limit budget.

mod completion;
mod speech;
mod translation;

pub use completion::{CompletionProvider, ImageInput, VisionAnalyzer};
pub use speech::{AudioInput, SpeechToText, TextToSpeech, Transcript};
pub use translation::{TranslatedText, TranslationRequest, Translator};

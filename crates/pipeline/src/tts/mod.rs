//! Speech synthesis through the speech/translation service

mod http_backend;

pub use http_backend::{HttpTts, HttpTtsConfig};

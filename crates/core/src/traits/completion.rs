//! Completion and vision traits

use async_trait::async_trait;

use crate::conversation::ConversationTurn;
use crate::Result;

/// Uploaded image
#[derive(Debug, Clone)]
pub struct ImageInput {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImageInput {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Chat completion interface
///
/// Two backends implement this: a prompt-template provider and a raw
/// chat-completion provider. One is chosen at startup from configuration.
/// Implementations only ever see the most recent
/// [`MAX_CONTEXT_TURNS`](crate::conversation::MAX_CONTEXT_TURNS) turns.
#[async_trait]
pub trait CompletionProvider: Send + Sync + 'static {
    /// Generate a reply
    ///
    /// # Arguments
    /// * `system_prompt` - Instruction authored in the pivot language
    /// * `history` - Prior turns, oldest first
    /// * `user_text` - Current input, already in the pivot language
    async fn complete(
        &self,
        system_prompt: &str,
        history: &[ConversationTurn],
        user_text: &str,
    ) -> Result<String>;

    /// Fails with `Configuration` when the backend cannot be called at all
    fn readiness(&self) -> Result<()> {
        Ok(())
    }

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

/// Image understanding interface
#[async_trait]
pub trait VisionAnalyzer: Send + Sync + 'static {
    /// Describe or answer a question about an image
    async fn analyze(&self, image: &ImageInput, prompt: &str) -> Result<String>;

    /// Fails with `Configuration` when the backend cannot be called at all
    fn readiness(&self) -> Result<()> {
        Ok(())
    }

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

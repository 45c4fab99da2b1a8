//! Prompt Building and Management
//!
//! Two shapes of prompt are produced from the same inputs:
//! - a [`PromptTemplate`] whose history placeholder is filled at render time
//! - an explicit `[system, ...history, user]` list for chat-completion APIs

use serde::{Deserialize, Serialize};
use std::fmt;

use chat_gateway_core::conversation::recent_turns;
use chat_gateway_core::{ConversationTurn, TurnRole, MAX_CONTEXT_TURNS};

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

impl From<TurnRole> for Role {
    fn from(role: TurnRole) -> Self {
        match role {
            TurnRole::User => Role::User,
            TurnRole::Assistant => Role::Assistant,
        }
    }
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

impl From<&ConversationTurn> for Message {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role().into(),
            content: turn.text().to_string(),
        }
    }
}

/// Drop assistant messages from the head until a user message leads
pub fn strip_leading_assistant(messages: &[Message]) -> &[Message] {
    let first_user = messages
        .iter()
        .position(|m| m.role != Role::Assistant)
        .unwrap_or(messages.len());
    &messages[first_user..]
}

/// Explicit message list for chat-completion backends
///
/// History is capped to the most recent turns first, then stripped of any
/// leading assistant messages so the first non-system message is the user's.
pub fn build_chat_messages(
    system_prompt: &str,
    history: &[ConversationTurn],
    user_text: &str,
) -> Vec<Message> {
    let windowed: Vec<Message> = recent_turns(history, MAX_CONTEXT_TURNS)
        .iter()
        .map(Message::from)
        .collect();
    let history = strip_leading_assistant(&windowed);

    let mut messages = Vec::with_capacity(history.len() + 2);
    messages.push(Message::system(system_prompt));
    messages.extend_from_slice(history);
    messages.push(Message::user(user_text));
    messages
}

/// One slot in a prompt template
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSegment {
    /// Fixed system instruction
    System(String),
    /// Filled with the windowed conversation history
    HistoryPlaceholder,
    /// Filled with the current user input
    Input,
}

/// Prompt rendered from a template
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPrompt {
    pub system_instruction: Option<String>,
    pub turns: Vec<Message>,
}

/// Structured chat prompt with a history placeholder
#[derive(Debug, Clone, PartialEq)]
pub struct PromptTemplate {
    segments: Vec<TemplateSegment>,
}

impl PromptTemplate {
    /// `[system, {history}, {input}]`
    pub fn chat_with_history(system_instruction: impl Into<String>) -> Self {
        Self {
            segments: vec![
                TemplateSegment::System(system_instruction.into()),
                TemplateSegment::HistoryPlaceholder,
                TemplateSegment::Input,
            ],
        }
    }

    pub fn segments(&self) -> &[TemplateSegment] {
        &self.segments
    }

    /// Fill the placeholders
    pub fn render(&self, history: &[ConversationTurn], input: &str) -> RenderedPrompt {
        let mut system_parts = Vec::new();
        let mut turns = Vec::new();

        for segment in &self.segments {
            match segment {
                TemplateSegment::System(text) => system_parts.push(text.as_str()),
                TemplateSegment::HistoryPlaceholder => turns.extend(
                    recent_turns(history, MAX_CONTEXT_TURNS)
                        .iter()
                        .map(Message::from),
                ),
                TemplateSegment::Input => turns.push(Message::user(input)),
            }
        }

        let system_instruction = if system_parts.is_empty() {
            None
        } else {
            Some(system_parts.join("\n\n"))
        };

        RenderedPrompt {
            system_instruction,
            turns,
        }
    }
}

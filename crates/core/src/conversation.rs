//! Conversation turns and caller-supplied history
//!
//! History is owned by the caller and sent with every request. The gateway
//! never stores it; it only decides how much of it reaches a completion.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Most recent turns forwarded to a completion provider
pub const MAX_CONTEXT_TURNS: usize = 10;

/// Role in a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    /// End user message
    User,
    /// Assistant reply
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for TurnRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single turn in the conversation
///
/// Fields are private so a turn cannot be edited after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationTurn {
    role: TurnRole,
    text: String,
    #[serde(default = "Utc::now")]
    occurred_at: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a new turn stamped with the current time
    pub fn new(role: TurnRole, text: impl Into<String>) -> Self {
        Self::at(role, text, Utc::now())
    }

    /// Create a turn with an explicit timestamp
    pub fn at(role: TurnRole, text: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            role,
            text: text.into(),
            occurred_at,
        }
    }

    /// Create a user turn
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(TurnRole::User, text)
    }

    /// Create an assistant turn
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(TurnRole::Assistant, text)
    }

    pub fn role(&self) -> TurnRole {
        self.role
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

/// Ordered conversation history, insertion order significant
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationHistory {
    turns: Vec<ConversationTurn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// All turns, oldest first
    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    /// The turns a completion is allowed to see
    ///
    /// Older turns are left out of the window, not removed from the history.
    pub fn completion_window(&self) -> &[ConversationTurn] {
        recent_turns(&self.turns, MAX_CONTEXT_TURNS)
    }
}

impl From<Vec<ConversationTurn>> for ConversationHistory {
    fn from(turns: Vec<ConversationTurn>) -> Self {
        Self { turns }
    }
}

impl FromIterator<ConversationTurn> for ConversationHistory {
    fn from_iter<I: IntoIterator<Item = ConversationTurn>>(iter: I) -> Self {
        Self {
            turns: iter.into_iter().collect(),
        }
    }
}

/// Tail of at most `limit` turns
pub fn recent_turns(turns: &[ConversationTurn], limit: usize) -> &[ConversationTurn] {
    let start = turns.len().saturating_sub(limit);
    &turns[start..]
}

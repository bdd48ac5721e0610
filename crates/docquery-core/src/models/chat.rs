use serde::{Deserialize, Serialize};

use super::answer::Source;

/// Role of a chat turn as recorded by the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatRole {
    User,
    Assistant,
    /// Any role the application does not recognise. Sent to the model as a
    /// user turn.
    #[serde(other)]
    Other,
}

/// A single turn in the session's chat history.
///
/// `role` is optional because history can be replayed from loosely-shaped
/// sources; turns without a role or without content are skipped when the
/// conversation is rebuilt for the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatTurn {
    #[serde(default)]
    pub role: Option<ChatRole>,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Some(ChatRole::User),
            content: content.into(),
            sources: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            role: Some(ChatRole::Assistant),
            content: content.into(),
            sources,
        }
    }
}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Speaker of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The caller
    User,
    /// The voice agent
    Assistant,
    /// System prompts, tool output and anything else the pipeline records
    #[serde(other)]
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Other => "other",
        }
    }

    /// Whether turns with this role belong in a dialog transcript
    pub fn is_dialog(&self) -> bool {
        matches!(self, Role::User | Role::Assistant)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of the conversation as recorded by the voice pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationItem {
    pub role: Role,

    /// Spoken or generated text, empty for non-text turns
    #[serde(default)]
    pub text: String,

    /// Synthetic entry produced when the pipeline compacts its history
    #[serde(default)]
    pub is_summary: bool,
}

impl ConversationItem {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            is_summary: false,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }

    pub fn summary(role: Role, text: impl Into<String>) -> Self {
        Self {
            is_summary: true,
            ..Self::new(role, text)
        }
    }
}

//! UI-agnostic conversation types
//!
//! Shared between the consultation logic and any front end. They don't depend
//! on a specific UI framework.

use serde::{Deserialize, Serialize};

/// One message in the chat history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

/// Who produced a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnRole {
    Human,
    Assistant,
}

impl ChatTurn {
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Human,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

impl TurnRole {
    /// Speaker tag used when the history is written into a prompt
    pub fn prompt_label(&self) -> &'static str {
        match self {
            TurnRole::Human => "Human",
            TurnRole::Assistant => "AI",
        }
    }
}

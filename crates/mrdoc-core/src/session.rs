use serde::{Deserialize, Serialize};

use crate::state::ChatTurn;

/// What happens to the upload control after an image has been classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ImagePolicy {
    /// Close the upload control after one classification attempt
    #[default]
    SingleShot,
    /// Leave the upload control open for the rest of the session
    Sticky,
}

/// Per-session conversation state: the append-only transcript and the
/// awaiting-image flag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    turns: Vec<ChatTurn>,
    awaiting_image: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, turn: ChatTurn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn awaiting_image(&self) -> bool {
        self.awaiting_image
    }

    pub fn set_awaiting_image(&mut self, awaiting: bool) {
        self.awaiting_image = awaiting;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::TurnRole;

    #[test]
    fn test_new_session_is_empty() {
        let session = Session::new();
        assert!(session.turns().is_empty());
        assert!(!session.awaiting_image());
    }

    #[test]
    fn test_append_preserves_order() {
        let mut session = Session::new();
        session.append(ChatTurn::human("first"));
        session.append(ChatTurn::assistant("second"));
        session.append(ChatTurn::human("third"));

        let contents: Vec<&str> = session.turns().iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
        assert_eq!(session.turns()[1].role, TurnRole::Assistant);
    }

    #[test]
    fn test_awaiting_image_flag() {
        let mut session = Session::new();
        session.set_awaiting_image(true);
        assert!(session.awaiting_image());
        session.set_awaiting_image(false);
        assert!(!session.awaiting_image());
    }
}

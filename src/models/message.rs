//! Incoming message model.

use serde::{Deserialize, Serialize};

/// A text message from a user, as routed to the controllers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub user_id: i64,
    pub text: String,
    pub message_id: Option<i64>,
    pub peer_id: i64,
}

impl Message {
    /// Create a message addressed back to its sender.
    pub fn new(user_id: i64, text: impl Into<String>, message_id: Option<i64>) -> Self {
        Self {
            user_id,
            text: text.into(),
            message_id,
            peer_id: user_id,
        }
    }

    pub fn is_command(&self) -> bool {
        self.text.starts_with('/')
    }

    /// Command name without the slash, e.g. `help` for `/help me`.
    pub fn command(&self) -> Option<&str> {
        if !self.is_command() {
            return None;
        }
        self.text
            .split_whitespace()
            .next()
            .map(|first| first.trim_start_matches('/'))
    }

    /// Full command text without the leading slash, arguments included.
    pub fn command_with_args(&self) -> Option<&str> {
        self.text.strip_prefix('/')
    }
}

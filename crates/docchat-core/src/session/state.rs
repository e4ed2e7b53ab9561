//! In-memory conversation state.

use super::message::Message;
use serde::{Deserialize, Serialize};

/// Ordered message history plus the agent-typing flag.
///
/// Insertion order is display order. History only grows, except through
/// [`SessionState::replace`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    messages: Vec<Message>,
    is_agent_typing: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the session from a restored history.
    pub fn restored(messages: Vec<Message>) -> Self {
        Self {
            messages,
            is_agent_typing: false,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_agent_typing(&self) -> bool {
        self.is_agent_typing
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Discard all history and start over with `messages`.
    pub fn replace(&mut self, messages: Vec<Message>) {
        self.messages = messages;
    }

    /// Set the typing flag. Returns true if it changed.
    pub fn set_agent_typing(&mut self, typing: bool) -> bool {
        let changed = self.is_agent_typing != typing;
        self.is_agent_typing = typing;
        changed
    }
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub messages: Vec<Message>,
    pub is_agent_typing: bool,
    pub is_upload_open: bool,
}

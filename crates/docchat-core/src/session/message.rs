//! Chat messages and the clock that stamps them.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Text of the agent message appended when a query fails.
pub const FALLBACK_TEXT: &str = "⚠️ Sorry, something went wrong. Please try again.";

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Agent,
}

impl std::fmt::Display for Sender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sender::User => write!(f, "user"),
            Sender::Agent => write!(f, "agent"),
        }
    }
}

/// A single turn in the conversation.
///
/// Serializes as `{"id", "text", "sender", "timestamp"}`, which is also
/// the shape of each element in the persisted history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, prefixed by the kind of message (`user-`, `agent-`, ...).
    pub id: String,

    /// Display text. Never empty.
    pub text: String,

    pub sender: Sender,

    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl Message {
    pub fn is_from_user(&self) -> bool {
        self.sender == Sender::User
    }
}

/// Which kind of message is being minted. Controls the id prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Typed by the user.
    User,
    /// Answer relayed from the remote agent.
    Agent,
    /// Synthetic fallback after a failed query.
    AgentError,
    /// Synthetic upload announcement.
    System,
}

impl MessageKind {
    fn prefix(self) -> &'static str {
        match self {
            MessageKind::User => "user",
            MessageKind::Agent => "agent",
            MessageKind::AgentError => "agent-error",
            MessageKind::System => "sys",
        }
    }

    fn sender(self) -> Sender {
        match self {
            MessageKind::User => Sender::User,
            _ => Sender::Agent,
        }
    }
}

/// Mints messages with collision-free ids and non-decreasing timestamps.
#[derive(Debug, Default)]
pub struct MessageClock {
    last_timestamp: i64,
}

impl MessageClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock that never goes back past the newest restored message.
    pub fn resuming_after(messages: &[Message]) -> Self {
        let last_timestamp = messages.iter().map(|m| m.timestamp).max().unwrap_or(0);
        Self { last_timestamp }
    }

    /// Next timestamp: wall-clock millis, clamped to the last one issued.
    pub fn now(&mut self) -> i64 {
        let ts = Utc::now().timestamp_millis().max(self.last_timestamp);
        self.last_timestamp = ts;
        ts
    }

    pub fn mint(&mut self, kind: MessageKind, text: impl Into<String>) -> Message {
        Message {
            id: format!("{}-{}", kind.prefix(), Uuid::new_v4()),
            text: text.into(),
            sender: kind.sender(),
            timestamp: self.now(),
        }
    }

    /// The synthetic message that replaces history after an upload.
    pub fn upload_announcement(&mut self, filename: &str) -> Message {
        self.mint(
            MessageKind::System,
            format!("✅ File \"{filename}\" uploaded successfully! You can now start chatting."),
        )
    }

    pub fn fallback(&mut self) -> Message {
        self.mint(MessageKind::AgentError, FALLBACK_TEXT)
    }
}

//! Change notifications for the presentation layer.
//!
//! The coordinator emits a [`ChatEvent`] after every committed mutation.
//! Any number of views can subscribe; each gets its own receiver.
//!
//! # Example
//!
//! ```rust
//! use docchat_core::event_bus::{ChatEvent, EventBus};
//!
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.emit(ChatEvent::TypingChanged(true));
//!
//! // In async context:
//! // let event = rx.recv().await.unwrap();
//! ```

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::session::Message;

/// Events beyond this capacity will cause slow subscribers to lag.
const DEFAULT_CAPACITY: usize = 1024;

/// A committed change to the chat session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "camelCase")]
pub enum ChatEvent {
    /// A message was added to the end of the history.
    MessageAppended(Message),

    /// History was replaced wholesale (new chat, clear chat, upload).
    HistoryReset(Vec<Message>),

    /// The agent-typing flag flipped.
    TypingChanged(bool),

    /// The upload gate opened (`true`) or closed (`false`).
    GateChanged(bool),
}

/// Broadcasts [`ChatEvent`]s to every subscriber.
#[derive(Debug)]
pub struct EventBus {
    sender: broadcast::Sender<ChatEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Emit an event. Returns how many subscribers received it (0 if none).
    pub fn emit(&self, event: ChatEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    /// Receive all future events. Past events are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

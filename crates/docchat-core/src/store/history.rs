//! The history adapter between the coordinator and the raw medium.

use super::KeyValueStore;
use crate::session::Message;

/// The single key under which the conversation is stored.
pub const HISTORY_KEY: &str = "chatHistory";

/// Loads and saves the message history under [`HISTORY_KEY`].
///
/// Neither operation fails past this boundary:
///
/// - an empty history is stored as *no entry*, never as `[]`
/// - a corrupt entry is deleted on load and reported as absent
/// - medium and serialization errors are logged and absorbed
pub struct HistoryStore {
    medium: Box<dyn KeyValueStore>,
}

impl HistoryStore {
    pub fn new(medium: impl KeyValueStore + 'static) -> Self {
        Self {
            medium: Box::new(medium),
        }
    }

    /// Read the stored history. `None` when absent or unusable.
    pub fn load(&self) -> Option<Vec<Message>> {
        let raw = match self.medium.get(HISTORY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                log::debug!("No stored chat history");
                return None;
            }
            Err(e) => {
                log::warn!("Failed to read chat history: {}", e);
                return None;
            }
        };

        match serde_json::from_str::<Vec<Message>>(&raw) {
            Ok(messages) if !messages.is_empty() => {
                log::debug!("Restored {} messages from chat history", messages.len());
                Some(messages)
            }
            Ok(_) => {
                log::warn!("Stored chat history is an empty array, removing it");
                self.discard();
                None
            }
            Err(e) => {
                log::warn!("Stored chat history is corrupt, removing it: {}", e);
                self.discard();
                None
            }
        }
    }

    /// Persist `messages`, or delete the entry when there are none.
    pub fn save(&self, messages: &[Message]) {
        if messages.is_empty() {
            self.discard();
            return;
        }

        let json = match serde_json::to_string(messages) {
            Ok(json) => json,
            Err(e) => {
                log::warn!("Failed to serialize chat history: {}", e);
                return;
            }
        };

        if let Err(e) = self.medium.set(HISTORY_KEY, &json) {
            log::warn!("Failed to save chat history: {}", e);
        }
    }

    fn discard(&self) {
        if let Err(e) = self.medium.remove(HISTORY_KEY) {
            log::warn!("Failed to remove chat history: {}", e);
        }
    }
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore").finish_non_exhaustive()
    }
}

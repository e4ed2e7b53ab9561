//! Conversation state: messages, the typing flag, and the upload gate.

mod gate;
mod message;
mod state;

pub use gate::UploadGate;
pub use message::{Message, MessageClock, MessageKind, Sender, FALLBACK_TEXT};
pub use state::{SessionSnapshot, SessionState};

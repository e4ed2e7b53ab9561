//! # docchat-core
//!
//! Core logic for docchat, a client for chatting with a backend agent
//! about an uploaded document.
//!
//! This crate is framework-agnostic: a terminal UI, a desktop shell or a
//! web bridge can all drive the same [`ChatCoordinator`].
//!
//! ## Key Concepts
//!
//! - **Session**: the conversation from start (or restore) until a reset
//! - **Gate**: closed until a document upload completes; sending needs it open
//! - **Dispatch**: one question sent to the agent and the reply it produces
//! - **Synthetic message**: authored by the coordinator itself (upload
//!   announcement, error fallback) rather than relayed from the agent

pub mod client;
pub mod config;
pub mod coordinator;
pub mod event_bus;
pub mod logging;
pub mod paths;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use client::{HttpQueryClient, HttpUploadClient, QueryClient, UploadClient};
pub use config::ClientConfig;
pub use coordinator::{ChatCoordinator, DispatchHandle, DispatchOutcome, SendRejected};
pub use event_bus::{ChatEvent, EventBus};
pub use session::{Message, Sender, SessionSnapshot};
pub use store::{FileStore, KeyValueStore, MemoryStore};

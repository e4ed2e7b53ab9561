//! Durable storage for the conversation history.
//!
//! # Layers
//!
//! - [`KeyValueStore`] - the raw medium: string values under string keys.
//!   [`MemoryStore`] keeps them in a map, [`FileStore`] keeps one file per key.
//! - [`HistoryStore`] - the adapter the coordinator talks to. It owns the
//!   single history key and the rules about empty and corrupt snapshots.
//!
//! # On-disk layout (`FileStore`)
//!
//! ```text
//! ~/.docchat/
//! ├── config.json         # optional client config
//! └── chatHistory.json    # JSON array of messages, absent when empty
//! ```

mod file;
mod history;
mod memory;

use std::sync::Arc;
use thiserror::Error;

pub use file::FileStore;
pub use history::{HistoryStore, HISTORY_KEY};
pub use memory::MemoryStore;

/// Error type for key-value medium operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

/// A persistent string key-value medium.
///
/// Implementations use interior mutability so a store can be shared
/// (e.g. an `Arc<MemoryStore>` held by both a coordinator and a test).
pub trait KeyValueStore: Send + Sync {
    /// Read the value under `key`, `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Overwrite the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Delete `key`. Deleting an absent key succeeds.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

//! Upload gate: sending is only allowed once a document is uploaded.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UploadGate {
    #[default]
    Closed,
    Open,
}

impl UploadGate {
    pub fn is_open(self) -> bool {
        self == UploadGate::Open
    }

    /// Upload finished. Returns true if the gate changed.
    pub fn open(&mut self) -> bool {
        let changed = !self.is_open();
        *self = UploadGate::Open;
        changed
    }

    /// New chat. Returns true if the gate changed.
    pub fn close(&mut self) -> bool {
        let changed = self.is_open();
        *self = UploadGate::Closed;
        changed
    }
}

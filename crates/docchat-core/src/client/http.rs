//! Shared plumbing for the `ureq`-based clients.

use std::time::Duration;

use thiserror::Error;

use crate::logging::WireLog;

/// Longest response body kept in errors and the wire log.
const MAX_LOGGED_BODY: usize = 512;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// Connection refused, DNS failure, timeout, ...
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {code}: {body}")]
    Status { code: u16, body: String },
}

pub(crate) fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new().timeout(timeout).build()
}

/// Map a ureq failure, logging it on the wire.
pub(crate) fn classify(err: ureq::Error, wire: &WireLog) -> HttpError {
    let error = match err {
        ureq::Error::Status(code, response) => HttpError::Status {
            code,
            body: truncate(&response.into_string().unwrap_or_default()),
        },
        ureq::Error::Transport(transport) => HttpError::Transport(transport.to_string()),
    };
    wire.line("ERROR", &error.to_string());
    error
}

pub(crate) fn truncate(text: &str) -> String {
    if text.len() <= MAX_LOGGED_BODY {
        return text.to_string();
    }
    let mut end = MAX_LOGGED_BODY;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

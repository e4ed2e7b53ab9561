//! Remote collaborators: the query endpoint and the document upload endpoint.
//!
//! The coordinator only sees the [`QueryClient`] trait. The upload side is
//! driven by the presentation layer, which calls
//! [`ChatCoordinator::complete_upload`](crate::coordinator::ChatCoordinator::complete_upload)
//! with the filename an [`UploadClient`] returns.
//!
//! # Wire format
//!
//! ```text
//! POST /query    {"query": "..."}            -> {"answer": "..."}
//! POST /upload   multipart/form-data "file"  -> {"message": "...", "filename": "..."}
//! GET  /health                               -> {"status": "ready" | "initializing_or_failed"}
//! ```

mod http;
mod query;
mod upload;

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use http::HttpError;
pub use query::HttpQueryClient;
pub use upload::{is_supported_document, HttpUploadClient, SUPPORTED_EXTENSIONS};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryResponse {
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub message: String,
    pub filename: String,
}

/// Backend readiness as reported by `GET /health`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ready,
    InitializingOrFailed,
}

#[derive(Error, Debug)]
pub enum QueryError {
    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("Malformed query response: {0}")]
    Malformed(String),

    #[error("Query response had an empty answer")]
    EmptyAnswer,
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Unsupported file type: {0} (expected .pdf or .txt)")]
    UnsupportedFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Http(#[from] HttpError),

    #[error("Malformed upload response: {0}")]
    Malformed(String),
}

/// Answers a question about the uploaded document.
///
/// Calls are blocking; the coordinator runs them on a blocking worker.
/// Timeouts and retries are the implementation's business.
pub trait QueryClient: Send + Sync {
    fn query(&self, request: &QueryRequest) -> Result<QueryResponse, QueryError>;
}

/// Sends a document to the backend for indexing.
pub trait UploadClient: Send + Sync {
    fn upload(&self, path: &Path) -> Result<UploadResponse, UploadError>;
}

/// One-shot HTTP server for exercising the clients without a backend.
#[cfg(test)]
pub(crate) mod test_server {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::thread::{self, JoinHandle};

    /// Serve a single request with `status_line` and a JSON `body`.
    ///
    /// Returns the base URL and a handle yielding the raw request bytes.
    pub fn serve_once(status_line: &str, body: &str) -> (String, JoinHandle<Vec<u8>>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let response = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let request = read_request(&mut stream);
            stream.write_all(response.as_bytes()).unwrap();
            stream.flush().unwrap();
            request
        });

        (format!("http://{addr}"), handle)
    }

    /// A base URL where nothing is listening.
    pub fn dead_url() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        format!("http://{addr}")
    }

    fn read_request(stream: &mut TcpStream) -> Vec<u8> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);

            if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                let headers = String::from_utf8_lossy(&buf[..end]).to_lowercase();
                let content_length = headers
                    .lines()
                    .find_map(|line| line.strip_prefix("content-length:"))
                    .and_then(|value| value.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + content_length {
                    break;
                }
            }
        }
        buf
    }
}

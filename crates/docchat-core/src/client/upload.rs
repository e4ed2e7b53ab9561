//! Document upload over `multipart/form-data`.

use std::path::Path;

use rand::{distributions::Alphanumeric, Rng};

use super::http::{build_agent, classify};
use super::{UploadClient, UploadError, UploadResponse};
use crate::config::ClientConfig;
use crate::logging::WireLog;

/// File extensions the backend can index.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["pdf", "txt"];

/// Form field the backend reads the document from.
const FILE_FIELD: &str = "file";

/// Whether `path` has a `.pdf` or `.txt` extension (any case).
pub fn is_supported_document(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// `ureq` client for `POST /upload`.
pub struct HttpUploadClient {
    agent: ureq::Agent,
    upload_url: String,
    wire: WireLog,
}

impl HttpUploadClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            agent: build_agent(config.request_timeout()),
            upload_url: config.endpoint("upload"),
            wire: WireLog::open(config.log_dir.as_deref(), "upload"),
        }
    }
}

impl UploadClient for HttpUploadClient {
    fn upload(&self, path: &Path) -> Result<UploadResponse, UploadError> {
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| UploadError::UnsupportedFile(path.display().to_string()))?;
        if !is_supported_document(path) {
            return Err(UploadError::UnsupportedFile(filename.to_string()));
        }

        let data = std::fs::read(path)?;
        let boundary = generate_boundary();
        let body = multipart_body(&boundary, filename, content_type_for(path), &data);

        self.wire.line(
            "REQUEST",
            &format!("POST {} {} ({} bytes)", self.upload_url, filename, data.len()),
        );
        log::info!("Uploading {} ({} bytes)", filename, data.len());

        let response = self
            .agent
            .post(&self.upload_url)
            .set(
                "Content-Type",
                &format!("multipart/form-data; boundary={boundary}"),
            )
            .send_bytes(&body)
            .map_err(|e| classify(e, &self.wire))?;

        let body: UploadResponse = response
            .into_json()
            .map_err(|e| UploadError::Malformed(e.to_string()))?;
        self.wire
            .line("RESPONSE", &format!("{} ({})", body.filename, body.message));
        Ok(body)
    }
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("pdf") => "application/pdf",
        _ => "text/plain",
    }
}

fn generate_boundary() -> String {
    let token: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    format!("----docchat{token}")
}

/// Encode a single file part.
fn multipart_body(boundary: &str, filename: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
    // Quotes and line breaks would end the header value early.
    let safe_name: String = filename
        .chars()
        .filter(|c| *c != '\r' && *c != '\n')
        .map(|c| if c == '"' { '\'' } else { c })
        .collect();

    let mut body = Vec::with_capacity(data.len() + 256);
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{FILE_FIELD}\"; filename=\"{safe_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_server::{dead_url, serve_once};
    use crate::client::HttpError;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn client_for(base_url: String) -> HttpUploadClient {
        HttpUploadClient::new(&ClientConfig {
            base_url,
            request_timeout_secs: 5,
            ..ClientConfig::default()
        })
    }

    mod supported {
        use super::*;

        #[test]
        fn accepts_pdf_and_txt_any_case() {
            for name in ["report.pdf", "notes.txt", "SCAN.PDF", "a.b.Txt"] {
                assert!(is_supported_document(&PathBuf::from(name)), "{name}");
            }
        }

        #[test]
        fn rejects_other_types() {
            for name in ["image.png", "archive.pdf.zip", "README", "doc.docx"] {
                assert!(!is_supported_document(&PathBuf::from(name)), "{name}");
            }
        }
    }

    mod multipart {
        use super::*;

        #[test]
        fn body_has_single_file_part() {
            let body = multipart_body("XYZ", "report.pdf", "application/pdf", b"%PDF-1.4");
            let text = String::from_utf8(body).unwrap();

            assert!(text.starts_with("--XYZ\r\n"));
            assert!(text.contains(
                "Content-Disposition: form-data; name=\"file\"; filename=\"report.pdf\"\r\n"
            ));
            assert!(text.contains("Content-Type: application/pdf\r\n\r\n%PDF-1.4\r\n"));
            assert!(text.ends_with("\r\n--XYZ--\r\n"));
        }

        #[test]
        fn filename_cannot_break_header() {
            let body = multipart_body("B", "a\"b\r\n.txt", "text/plain", b"");
            let text = String::from_utf8(body).unwrap();
            assert!(text.contains("filename=\"a'b.txt\""));
        }

        #[test]
        fn boundaries_are_random() {
            let a = generate_boundary();
            let b = generate_boundary();
            assert_ne!(a, b);
            assert!(a.starts_with("----docchat"));
        }

        #[test]
        fn content_type_follows_extension() {
            assert_eq!(content_type_for(Path::new("x.PDF")), "application/pdf");
            assert_eq!(content_type_for(Path::new("x.txt")), "text/plain");
        }
    }

    mod upload {
        use super::*;

        #[test]
        fn uploads_file_and_returns_filename() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("report.txt");
            std::fs::write(&path, "Q3 revenue grew.").unwrap();

            let (url, server) = serve_once(
                "200 OK",
                r#"{"message": "File uploaded and processed successfully.", "filename": "report.txt"}"#,
            );
            let client = client_for(url);

            let response = client.upload(&path).unwrap();
            assert_eq!(response.filename, "report.txt");

            let request = String::from_utf8(server.join().unwrap()).unwrap();
            assert!(request.starts_with("POST /upload "));
            assert!(request.contains("multipart/form-data; boundary=----docchat"));
            assert!(request.contains("filename=\"report.txt\""));
            assert!(request.contains("Q3 revenue grew."));
        }

        #[test]
        fn unsupported_extension_fails_before_network() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("photo.png");
            std::fs::write(&path, [0u8; 4]).unwrap();

            let client = client_for(dead_url());

            assert!(matches!(
                client.upload(&path),
                Err(UploadError::UnsupportedFile(name)) if name == "photo.png"
            ));
        }

        #[test]
        fn missing_file_is_io_error() {
            let dir = tempdir().unwrap();
            let client = client_for(dead_url());

            let result = client.upload(&dir.path().join("gone.pdf"));
            assert!(matches!(result, Err(UploadError::Io(_))));
        }

        #[test]
        fn server_rejection_is_status_error() {
            let dir = tempdir().unwrap();
            let path = dir.path().join("report.pdf");
            std::fs::write(&path, "%PDF").unwrap();

            let (url, _server) = serve_once("400 Bad Request", r#"{"detail": "No filename provided."}"#);
            let client = client_for(url);

            assert!(matches!(
                client.upload(&path),
                Err(UploadError::Http(HttpError::Status { code: 400, .. }))
            ));
        }
    }
}

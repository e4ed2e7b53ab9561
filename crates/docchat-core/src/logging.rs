//! Wire log for the HTTP collaborators.
//!
//! When a log directory is configured, every request and response is
//! appended as a timestamped line to `{log_dir}/{name}.log`. Without a
//! directory the handle is inert and writes are dropped.

use std::{
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
    sync::{Arc, Mutex, PoisonError},
};

use chrono::{SecondsFormat, Utc};

/// Thread-safe, cloneable handle to an append-only wire log.
#[derive(Debug, Clone, Default)]
pub struct WireLog {
    file: Arc<Mutex<Option<File>>>,
}

impl WireLog {
    /// A log that discards everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Open (or create) `{log_dir}/{name}.log`.
    ///
    /// Failure to create the directory or file leaves the log disabled;
    /// losing the wire log never stops a chat.
    pub fn open(log_dir: Option<&Path>, name: &str) -> Self {
        let file = log_dir.and_then(|dir| {
            std::fs::create_dir_all(dir).ok()?;
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(dir.join(format!("{name}.log")))
                .map_err(|e| log::warn!("Failed to open wire log in {}: {}", dir.display(), e))
                .ok()
        });
        Self {
            file: Arc::new(Mutex::new(file)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Append `[timestamp] DIRECTION: data`.
    pub fn line(&self, direction: &str, data: &str) {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(ref mut file) = *guard {
            let ts = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            let _ = writeln!(file, "[{ts}] {direction}: {data}");
            let _ = file.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_file() {
        let dir = tempdir().unwrap();

        let log = WireLog::open(Some(dir.path()), "query");

        assert!(log.is_enabled());
        assert!(dir.path().join("query.log").exists());
    }

    #[test]
    fn open_without_dir_is_disabled() {
        let log = WireLog::open(None, "query");
        assert!(!log.is_enabled());
        // Should not panic
        log.line("REQUEST", "ignored");
    }

    #[test]
    fn line_writes_timestamped_entry() {
        let dir = tempdir().unwrap();
        let log = WireLog::open(Some(dir.path()), "query");

        log.line("REQUEST", "POST /query");

        let contents = std::fs::read_to_string(dir.path().join("query.log")).unwrap();
        assert!(contents.contains("REQUEST: POST /query"));
        // [YYYY-MM-DDTHH:MM:SS.mmmZ]
        assert!(contents.starts_with('['));
        assert_eq!(&contents[25..26], "]");
        assert_eq!(&contents[24..25], "Z");
    }

    #[test]
    fn clones_share_the_file() {
        let dir = tempdir().unwrap();
        let log = WireLog::open(Some(dir.path()), "upload");
        let clone = log.clone();

        log.line("REQUEST", "one");
        clone.line("RESPONSE", "two");

        let contents = std::fs::read_to_string(dir.path().join("upload.log")).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }

    #[test]
    fn poisoned_handle_still_writes() {
        let dir = tempdir().unwrap();
        let log = WireLog::open(Some(dir.path()), "query");

        let holder = log.clone();
        let _ = std::thread::spawn(move || {
            let _guard = holder.file.lock().unwrap();
            panic!("holder died");
        })
        .join();

        assert!(log.is_enabled());
        log.line("REQUEST", "after");
        let contents = std::fs::read_to_string(dir.path().join("query.log")).unwrap();
        assert!(contents.contains("REQUEST: after"));
    }
}

//! Append-only trace log shared by every discovery step and export job
//!
//! Writers from any number of tasks are serialized through one async mutex, so
//! each `write` call appends exactly one complete, timestamp-prefixed line.
//! Lines appear in lock-acquisition order, which under contention is not the
//! order in which the logged events happened.

use chrono::{DateTime, Local, SecondsFormat};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Directory (under the base directory) holding the trace log
pub const LOG_DIR_NAME: &str = "Logs";

/// File name of the trace log
pub const LOG_FILE_NAME: &str = "gui-debug.log";

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

/// Serialized, append-only writer for the trace log
///
/// The file is opened lazily on first write (creating its directory) and kept
/// open afterwards; a failed append drops the handle so the next call reopens.
#[derive(Debug)]
pub struct LogSink {
    /// Full path of the log file (None = sink disabled)
    path: Option<PathBuf>,
    /// Exclusive write section; holds the open file between writes
    file: Mutex<Option<File>>,
}

impl LogSink {
    /// Sink writing to `<base_dir>/Logs/gui-debug.log`
    pub fn new(base_dir: &Path) -> Self {
        Self::at_path(base_dir.join(LOG_DIR_NAME).join(LOG_FILE_NAME))
    }

    /// Sink writing to an explicit file path
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            file: Mutex::new(None),
        }
    }

    /// Sink that accepts and discards every line
    pub fn disabled() -> Self {
        Self {
            path: None,
            file: Mutex::new(None),
        }
    }

    /// Path of the log file, if the sink is enabled
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Append one timestamped line
    ///
    /// Line breaks inside `message` are flattened so the call can never produce
    /// a partial or multi-line record. Returns the I/O error if the append failed.
    pub async fn write(&self, message: &str) -> std::io::Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };

        let mut guard = self.file.lock().await;
        let line = format_line(Local::now(), message);

        if guard.is_none() {
            *guard = Some(open_append(path).await?);
        }

        let result = match guard.as_mut() {
            Some(file) => append(file, &line).await,
            None => Ok(()),
        };

        if result.is_err() {
            // Reopen on the next call rather than reusing a handle in an unknown state
            *guard = None;
        }
        result
    }

    /// Append one line, reporting failures through `tracing` instead of the caller
    pub async fn log(&self, message: &str) {
        if let Err(e) = self.write(message).await {
            tracing::warn!(error = %e, path = ?self.path, "Failed to append to trace log");
        }
    }
}

async fn open_append(path: &Path) -> std::io::Result<File> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(dir).await?;
    }
    OpenOptions::new().create(true).append(true).open(path).await
}

async fn append(file: &mut File, line: &str) -> std::io::Result<()> {
    file.write_all(line.as_bytes()).await?;
    file.flush().await
}

/// Render one log record: `<RFC 3339 timestamp with offset> <message><line ending>`
pub(crate) fn format_line(timestamp: DateTime<Local>, message: &str) -> String {
    let flattened: String = message
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    format!(
        "{} {}{}",
        timestamp.to_rfc3339_opts(SecondsFormat::Millis, false),
        flattened,
        LINE_ENDING
    )
}

//! Error types for channel-export
//!
//! This module provides error handling for the library, including:
//! - The crate-level [`Error`] returned by discovery and batch operations
//! - Collaborator-facing errors ([`RemoteError`], [`ExportError`])
//! - A [`Severity`] discriminant that decides how each failure is presented
//!   (detailed report, lightweight notice, or a skipped item)

use crate::types::{BatchOutcome, Snowflake};
use thiserror::Error;

/// Result type alias for channel-export operations
pub type Result<T> = std::result::Result<T, Error>;

/// How a failure affects the operation that produced it
///
/// Every error in the crate maps onto exactly one severity via `severity()`.
/// Callers branch on this tag instead of inspecting concrete variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    /// Aborts the current top-level operation and is reported in full
    Fatal,
    /// Reported as a short notice; the surrounding operation continues
    NonFatal,
    /// The item had nothing to export; never counted as a hard failure
    ItemEmpty,
}

/// Failure reported by the remote channel source
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    /// Human-readable description from the upstream source
    pub message: String,
    /// Whether the failure should abort the operation that triggered it
    pub fatal: bool,
}

impl RemoteError {
    /// An upstream failure that aborts the current operation (auth rejected, unreachable)
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: true,
        }
    }

    /// An upstream failure scoped to one request (forbidden channel, missing resource)
    pub fn non_fatal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            fatal: false,
        }
    }

    /// Severity of this failure
    pub fn severity(&self) -> Severity {
        if self.fatal {
            Severity::Fatal
        } else {
            Severity::NonFatal
        }
    }
}

/// Failure reported by a single channel export
#[derive(Debug, Error)]
pub enum ExportError {
    /// The channel had nothing to export (empty, or no messages in the requested range)
    #[error("{reason}")]
    ItemEmpty {
        /// Why the channel produced no output
        reason: String,
    },

    /// The remote source failed while the export was reading from it
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// The export observed the batch cancellation signal and unwound
    #[error("export cancelled")]
    Cancelled,

    /// Anything not recognized above (I/O failure, renderer bug, ...)
    #[error("{message}")]
    Unrecoverable {
        /// Diagnostic detail
        message: String,
    },
}

impl ExportError {
    /// Shorthand for an [`ExportError::ItemEmpty`]
    pub fn empty(reason: impl Into<String>) -> Self {
        Self::ItemEmpty {
            reason: reason.into(),
        }
    }

    /// Shorthand for an [`ExportError::Unrecoverable`]
    pub fn unrecoverable(message: impl Into<String>) -> Self {
        Self::Unrecoverable {
            message: message.into(),
        }
    }

    /// Severity of this failure
    ///
    /// Cancellation is classified as non-fatal: the job is neither a success nor
    /// a hard failure, and the batch records the cancellation separately.
    pub fn severity(&self) -> Severity {
        match self {
            ExportError::ItemEmpty { .. } => Severity::ItemEmpty,
            ExportError::Remote(e) => e.severity(),
            ExportError::Cancelled => Severity::NonFatal,
            ExportError::Unrecoverable { .. } => Severity::Fatal,
        }
    }
}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        Self::Unrecoverable {
            message: format!("I/O error: {e}"),
        }
    }
}

/// Main error type for channel-export
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "export.after")
        key: Option<String>,
    },

    /// Remote source failure during discovery or forum expansion
    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Another discovery or export operation is already running on this engine
    #[error("another operation is already in progress")]
    Busy,

    /// A job failed unrecoverably; raised after every other job in the batch finished
    #[error("failed to export channel {channel_name} ({channel_id}): {message}")]
    ExportAborted {
        /// Channel whose export failed
        channel_id: Snowflake,
        /// Display name of that channel
        channel_name: String,
        /// Diagnostic detail
        message: String,
        /// What the rest of the batch achieved
        outcome: Box<BatchOutcome>,
    },

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Severity of this failure
    pub fn severity(&self) -> Severity {
        match self {
            Error::Remote(e) => e.severity(),
            Error::Busy => Severity::NonFatal,
            Error::Config { .. }
            | Error::Io(_)
            | Error::ExportAborted { .. }
            | Error::Other(_) => Severity::Fatal,
        }
    }

    /// Short user-facing text for lightweight notices
    ///
    /// Trailing punctuation is stripped so the message reads as a notice rather
    /// than a sentence ("Access denied." becomes "Access denied").
    pub fn user_notice(&self) -> String {
        trim_notice(&self.to_string())
    }
}

/// Strip trailing sentence punctuation and whitespace from a notice
pub(crate) fn trim_notice(message: &str) -> String {
    message
        .trim_end_matches(|c: char| c == '.' || c == '!' || c == '?' || c.is_whitespace())
        .to_string()
}

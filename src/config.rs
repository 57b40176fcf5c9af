//! Configuration types for channel-export

use crate::error::{Error, Result};
use crate::types::ThreadInclusion;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Parallel limits above this value are accepted but reported as a resource risk
pub const PARALLEL_LIMIT_WARN_THRESHOLD: usize = 32;

/// Output format of an export
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Plain text transcript
    PlainText,
    /// HTML, dark theme
    #[default]
    HtmlDark,
    /// HTML, light theme
    HtmlLight,
    /// Comma-separated values
    Csv,
    /// JSON document
    Json,
}

impl ExportFormat {
    /// File extension written for this format (without the dot)
    pub fn file_extension(&self) -> &'static str {
        match self {
            ExportFormat::PlainText => "txt",
            ExportFormat::HtmlDark | ExportFormat::HtmlLight => "html",
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

/// How one export is split across output files
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum PartitionLimit {
    /// Single output file
    #[default]
    None,
    /// Start a new file after this many messages
    MessageCount(u64),
    /// Start a new file once this many bytes are written
    FileSize(u64),
}

/// Per-job export settings, snapshotted into every [`ExportJob`](crate::engine::ExportJob)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Output directory, file, or path template (default: current directory)
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Output format
    #[serde(default)]
    pub format: ExportFormat,

    /// Only export messages sent after this instant
    #[serde(default)]
    pub after: Option<DateTime<Utc>>,

    /// Only export messages sent before this instant
    #[serde(default)]
    pub before: Option<DateTime<Utc>>,

    /// Output partitioning
    #[serde(default)]
    pub partition_limit: PartitionLimit,

    /// Message filter expression, passed through to the exporter
    #[serde(default)]
    pub message_filter: Option<String>,

    /// Render markdown formatting (default: true)
    #[serde(default = "default_true")]
    pub format_markdown: bool,

    /// Download referenced assets next to the export (default: false)
    #[serde(default)]
    pub download_assets: bool,

    /// Reuse assets already downloaded by previous exports (default: false)
    #[serde(default)]
    pub reuse_assets: bool,

    /// Directory for downloaded assets (default: beside the output file)
    #[serde(default)]
    pub assets_dir: Option<PathBuf>,

    /// Locale used for dates and numbers (default: system locale)
    #[serde(default)]
    pub locale: Option<String>,

    /// Render timestamps in UTC instead of local time (default: false)
    #[serde(default)]
    pub normalize_to_utc: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            format: ExportFormat::default(),
            after: None,
            before: None,
            partition_limit: PartitionLimit::default(),
            message_filter: None,
            format_markdown: true,
            download_assets: false,
            reuse_assets: false,
            assets_dir: None,
            locale: None,
            normalize_to_utc: false,
        }
    }
}

/// Trace log file settings
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Base directory holding `Logs/` (default: directory of the running executable)
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// Write trace lines at all (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            base_dir: None,
            enabled: true,
        }
    }
}

impl LogConfig {
    /// Directory the log sink writes under
    ///
    /// Falls back to the current directory when the executable path is unknown.
    pub fn resolve_base_dir(&self) -> PathBuf {
        if let Some(dir) = &self.base_dir {
            return dir.clone();
        }
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Main configuration for [`ExportEngine`](crate::engine::ExportEngine)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Maximum exports running at once (default: 1; values below 1 act as 1)
    #[serde(default = "default_parallel_limit")]
    pub parallel_limit: usize,

    /// Which threads channel discovery fetches
    #[serde(default)]
    pub thread_inclusion: ThreadInclusion,

    /// Export settings applied to every job in a batch
    #[serde(default)]
    pub export: ExportOptions,

    /// Trace log settings
    #[serde(default)]
    pub log: LogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parallel_limit: default_parallel_limit(),
            thread_inclusion: ThreadInclusion::default(),
            export: ExportOptions::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
    /// Concurrency cap actually applied to a batch
    ///
    /// Coerced up to 1, never capped from above.
    pub fn effective_parallel_limit(&self) -> usize {
        self.parallel_limit.max(1)
    }

    /// Check the configuration, returning non-blocking warnings
    ///
    /// Contradictory settings are rejected; risky but workable ones are returned
    /// as warnings for the caller to surface.
    pub fn validate(&self) -> Result<Vec<String>> {
        if let (Some(after), Some(before)) = (self.export.after, self.export.before)
            && after >= before
        {
            return Err(Error::Config {
                message: format!("'after' ({after}) must be earlier than 'before' ({before})"),
                key: Some("export.after".to_string()),
            });
        }

        if self.export.output_path.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "output path must not be empty".to_string(),
                key: Some("export.output_path".to_string()),
            });
        }

        let mut warnings = Vec::new();
        if self.parallel_limit > PARALLEL_LIMIT_WARN_THRESHOLD {
            warnings.push(format!(
                "parallel limit {} is above {}; every job holds its own connections and files",
                self.parallel_limit, PARALLEL_LIMIT_WARN_THRESHOLD
            ));
        }
        if self.export.reuse_assets && !self.export.download_assets {
            warnings.push("reusing assets has no effect unless asset download is enabled".into());
        }
        Ok(warnings)
    }
}

fn default_output_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_parallel_limit() -> usize {
    1
}

fn default_true() -> bool {
    true
}

//! # channel-export
//!
//! Bounded-concurrency discovery and export orchestration for chat channel archives.
//!
//! ## Design Philosophy
//!
//! channel-export is designed to be:
//! - **Collaborator-driven** - The remote API client and the per-channel renderer
//!   are supplied by the embedding application through traits
//! - **Failure-isolating** - One failing channel never aborts the rest of a batch
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to events and progress, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use channel_export::{
//!     ChannelExporter, ChannelProvider, Config, ExportEngine, Guild, Snowflake,
//!     ThreadInclusion, cancel_on_shutdown,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! async fn run(
//!     provider: Arc<dyn ChannelProvider>,
//!     exporter: Arc<dyn ChannelExporter>,
//! ) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         parallel_limit: 4,
//!         thread_inclusion: ThreadInclusion::Active,
//!         ..Default::default()
//!     };
//!     let engine = ExportEngine::new(config, provider, exporter)?;
//!
//!     // Subscribe to events
//!     let mut events = engine.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let guild = Guild { id: Snowflake(81384788765712384), name: "Rust".into() };
//!     let discovery = engine.pull_channels(&guild).await?;
//!     let leaves = discovery.leaves().into_iter().cloned().collect();
//!
//!     let cancel = CancellationToken::new();
//!     cancel_on_shutdown(cancel.clone());
//!
//!     let outcome = engine.export_batch(&guild, leaves, cancel).await?;
//!     println!("{} channel(s) exported", outcome.succeeded);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Channel discovery and hierarchy building
pub mod discovery;
/// Export engine and batch orchestration
pub mod engine;
/// Error types
pub mod error;
/// Append-only trace log
pub mod log_sink;
/// Output path templating
pub mod output_path;
/// Progress aggregation
pub mod progress;
/// Collaborator traits
pub mod provider;
/// Core types
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, ExportFormat, ExportOptions, LogConfig, PartitionLimit};
pub use discovery::{Discovery, discover};
pub use engine::{BusyGuard, ExportEngine, ExportJob};
pub use error::{Error, ExportError, RemoteError, Result, Severity};
pub use log_sink::LogSink;
pub use progress::{ProgressInput, ProgressMuxer};
pub use provider::{ChannelExporter, ChannelProvider, ChannelStream};
pub use types::{
    BatchOutcome, Channel, ChannelKind, ChannelNode, Event, Guild, ParentRef, Snowflake,
    ThreadInclusion,
};

/// Cancel `token` when the process receives a termination signal
///
/// Spawns a background task, so it must be called from within a Tokio runtime.
/// A running batch given the same token stops launching new jobs and lets the
/// running ones unwind.
///
/// - **Unix:** listens for SIGTERM and SIGINT, falling back to Ctrl+C if
///   registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// The task also ends, without cancelling, if the token is cancelled elsewhere.
pub fn cancel_on_shutdown(
    token: tokio_util::sync::CancellationToken,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => {
                tracing::info!("Cancelling export on shutdown signal");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    })
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            let name = tokio::select! {
                _ = sigterm.recv() => "SIGTERM",
                _ = sigint.recv() => "SIGINT",
            };
            tracing::info!(signal = name, "Received shutdown signal");
        }
        (Err(e), _) | (_, Err(e)) => {
            // Restricted environments (containers, tests) may refuse registration
            tracing::warn!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
            // Never resolve, so a broken listener cannot cancel the export
            std::future::pending::<()>().await;
        }
    }
}

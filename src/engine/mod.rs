//! Export engine: discovery and bounded parallel export over shared collaborators.
//!
//! The `ExportEngine` struct and its methods are organized by concern:
//! - [`job`] - Export job construction and output path snapshotting
//! - [`state`] - Busy flag, scoped release and "can start" predicates
//! - [`batch`] - Forum expansion and semaphore-bounded job dispatch
//!
//! Discovery itself lives in [`crate::discovery`]; the engine wraps it with the
//! busy flag, events and notices.

mod batch;
mod job;
mod state;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use job::ExportJob;
pub use state::BusyGuard;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};

use crate::config::Config;
use crate::discovery::{self, Discovery};
use crate::error::{Result, Severity, trim_notice};
use crate::log_sink::LogSink;
use crate::progress::ProgressMuxer;
use crate::provider::{ChannelExporter, ChannelProvider};
use crate::types::{Event, Guild};

/// Buffered events per subscriber before it starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 1000;

/// Main engine instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct ExportEngine {
    /// Remote channel source
    pub(crate) provider: Arc<dyn ChannelProvider>,
    /// Per-channel exporter
    pub(crate) exporter: Arc<dyn ChannelExporter>,
    /// Configuration snapshot taken at construction
    pub(crate) config: Arc<Config>,
    /// Trace log shared by every operation and job
    pub(crate) log: Arc<LogSink>,
    /// Aggregate progress of the running batch (auto-resets between batches)
    pub(crate) progress: ProgressMuxer,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Set while a discovery or export operation runs
    pub(crate) busy: Arc<AtomicBool>,
}

impl ExportEngine {
    /// Create an engine over the given collaborators
    ///
    /// The configuration is validated first; non-blocking warnings (such as a
    /// very high parallel limit) are logged and the engine is still created.
    pub fn new(
        config: Config,
        provider: Arc<dyn ChannelProvider>,
        exporter: Arc<dyn ChannelExporter>,
    ) -> Result<Self> {
        for warning in config.validate()? {
            tracing::warn!(warning = %warning, "Configuration warning");
        }

        let log = if config.log.enabled {
            LogSink::new(&config.log.resolve_base_dir())
        } else {
            LogSink::disabled()
        };
        tracing::debug!(path = ?log.path(), "Trace log configured");

        let (event_tx, _rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            provider,
            exporter,
            config: Arc::new(config),
            log: Arc::new(log),
            progress: ProgressMuxer::with_auto_reset(),
            event_tx,
            busy: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Subscribe to engine events
    ///
    /// Each subscriber receives every event independently. A subscriber that
    /// falls more than 1000 events behind receives `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Engine events as a stream, skipping over any lagged gaps
    pub fn event_stream(&self) -> impl Stream<Item = Event> + Send + use<> {
        BroadcastStream::new(self.event_tx.subscribe()).filter_map(|event| event.ok())
    }

    /// Aggregate progress of the running batch
    pub fn progress(&self) -> &ProgressMuxer {
        &self.progress
    }

    /// The configuration the engine was created with
    pub fn config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// The trace log every operation writes to
    pub fn log_sink(&self) -> &LogSink {
        &self.log
    }

    /// Emit an event to all subscribers
    ///
    /// With no active subscribers the event is dropped.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Send a short user-facing notice
    pub(crate) fn notify(&self, message: &str) {
        self.emit_event(Event::Notice {
            message: trim_notice(message),
        });
    }

    /// Discover the channel hierarchy of `guild`
    ///
    /// Uses the configured thread inclusion mode. Notices collected during
    /// discovery are sent as [`Event::Notice`]. A non-fatal remote failure is
    /// reported as a notice and yields an empty result; anything else is logged
    /// and returned.
    pub async fn pull_channels(&self, guild: &Guild) -> Result<Discovery> {
        let _busy = self.begin_operation()?;

        self.emit_event(Event::DiscoveryStarted { guild_id: guild.id });
        tracing::info!(guild_id = guild.id.0, guild = %guild.name, "Pulling channels");

        let result = discovery::discover(
            self.provider.as_ref(),
            guild.id,
            self.config.thread_inclusion,
            &self.log,
        )
        .await;

        match result {
            Ok(discovery) => {
                for notice in &discovery.notices {
                    self.notify(notice);
                }
                self.emit_event(Event::DiscoveryFinished {
                    guild_id: guild.id,
                    channel_count: discovery.len(),
                });
                Ok(discovery)
            }
            Err(e) if e.severity() == Severity::NonFatal => {
                let notice = e.user_notice();
                tracing::warn!(guild_id = guild.id.0, error = %e, "Channel discovery failed");
                self.notify(&notice);
                self.emit_event(Event::DiscoveryFinished {
                    guild_id: guild.id,
                    channel_count: 0,
                });
                Ok(Discovery {
                    nodes: Vec::new(),
                    notices: vec![notice],
                })
            }
            Err(e) => {
                tracing::error!(guild_id = guild.id.0, error = %e, "Channel discovery aborted");
                self.log
                    .log(&format!("Channel discovery for guild {} aborted: {e}", guild.id))
                    .await;
                Err(e)
            }
        }
    }
}

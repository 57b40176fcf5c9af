//! Shared test helpers: channel fixtures and in-memory collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream;
use tokio_util::sync::CancellationToken;

use crate::engine::ExportJob;
use crate::error::{ExportError, RemoteError};
use crate::progress::ProgressInput;
use crate::provider::{ChannelExporter, ChannelProvider, ChannelStream};
use crate::types::{Channel, ChannelKind, Guild, ParentRef, Snowflake};

pub(crate) const GUILD_ID: Snowflake = Snowflake(100);

pub(crate) fn guild() -> Guild {
    Guild {
        id: GUILD_ID,
        name: "Test Guild".to_string(),
    }
}

pub(crate) fn channel(id: u64, kind: ChannelKind, name: &str) -> Channel {
    Channel {
        id: Snowflake(id),
        guild_id: GUILD_ID,
        kind,
        name: name.to_string(),
        parent: None,
        position: None,
        last_message_id: Some(Snowflake(id)),
    }
}

pub(crate) fn text(id: u64, name: &str, position: i32) -> Channel {
    Channel {
        position: Some(position),
        ..channel(id, ChannelKind::Text, name)
    }
}

pub(crate) fn forum(id: u64, name: &str, position: i32) -> Channel {
    Channel {
        position: Some(position),
        ..channel(id, ChannelKind::Forum, name)
    }
}

pub(crate) fn category(id: u64, name: &str, position: i32) -> Channel {
    Channel {
        position: Some(position),
        ..channel(id, ChannelKind::Category, name)
    }
}

pub(crate) fn thread(id: u64, name: &str, parent: &Channel) -> Channel {
    Channel {
        parent: Some(ParentRef::of(parent)),
        ..channel(id, ChannelKind::PublicThread, name)
    }
}

pub(crate) fn direct(id: u64, name: &str, last_activity: Option<u64>) -> Channel {
    Channel {
        last_message_id: last_activity.map(Snowflake),
        ..channel(id, ChannelKind::DirectMessage, name)
    }
}

pub(crate) fn ids(channels: &[&Channel]) -> Vec<u64> {
    channels.iter().map(|c| c.id.0).collect()
}

/// A request the mock provider received
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum ProviderCall {
    Channels(Snowflake),
    Threads {
        guild_id: Snowflake,
        include_archived: bool,
    },
    ThreadsForParents {
        parent_ids: Vec<Snowflake>,
        include_archived: bool,
        after: Option<Snowflake>,
        before: Option<Snowflake>,
    },
}

/// In-memory channel source
///
/// Threads are served both by the guild-wide query and, filtered by parent,
/// by the per-parent query. Each listing can be made to fail instead.
#[derive(Default)]
pub(crate) struct MockProvider {
    channels: Vec<Channel>,
    threads: Vec<Channel>,
    channel_error: Option<RemoteError>,
    thread_error: Option<RemoteError>,
    parent_thread_error: Option<RemoteError>,
    calls: Mutex<Vec<ProviderCall>>,
}

impl MockProvider {
    pub(crate) fn new(channels: Vec<Channel>, threads: Vec<Channel>) -> Self {
        Self {
            channels,
            threads,
            ..Self::default()
        }
    }

    pub(crate) fn failing_channels(mut self, error: RemoteError) -> Self {
        self.channel_error = Some(error);
        self
    }

    pub(crate) fn failing_threads(mut self, error: RemoteError) -> Self {
        self.thread_error = Some(error);
        self
    }

    pub(crate) fn failing_parent_threads(mut self, error: RemoteError) -> Self {
        self.parent_thread_error = Some(error);
        self
    }

    pub(crate) fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: ProviderCall) {
        self.calls.lock().unwrap().push(call);
    }

    /// Yield `items` page by page, then the error if one is configured
    fn serve(items: Vec<Channel>, error: Option<RemoteError>) -> ChannelStream<'static> {
        let mut results: Vec<Result<Channel, RemoteError>> = items.into_iter().map(Ok).collect();
        if let Some(error) = error {
            results.push(Err(error));
        }
        stream::iter(results).boxed()
    }
}

impl ChannelProvider for MockProvider {
    fn list_channels(&self, guild_id: Snowflake) -> ChannelStream<'_> {
        self.record(ProviderCall::Channels(guild_id));
        Self::serve(self.channels.clone(), self.channel_error.clone())
    }

    fn list_threads(&self, guild_id: Snowflake, include_archived: bool) -> ChannelStream<'_> {
        self.record(ProviderCall::Threads {
            guild_id,
            include_archived,
        });
        Self::serve(self.threads.clone(), self.thread_error.clone())
    }

    fn list_threads_for_parents(
        &self,
        parent_ids: &HashSet<Snowflake>,
        include_archived: bool,
        after: Option<Snowflake>,
        before: Option<Snowflake>,
    ) -> ChannelStream<'_> {
        let mut sorted: Vec<Snowflake> = parent_ids.iter().copied().collect();
        sorted.sort();
        self.record(ProviderCall::ThreadsForParents {
            parent_ids: sorted,
            include_archived,
            after,
            before,
        });

        let matching = self
            .threads
            .iter()
            .filter(|t| t.parent_id().is_some_and(|p| parent_ids.contains(&p)))
            .cloned()
            .collect();
        Self::serve(matching, self.parent_thread_error.clone())
    }
}

/// Scripted result of one mock export
#[derive(Clone, Debug)]
pub(crate) enum MockOutcome {
    Succeed,
    Empty(String),
    NonFatal(String),
    Fatal(String),
    Unrecoverable(String),
    Panic,
    /// Run until the job's cancellation token fires
    WaitForCancel,
}

/// In-memory exporter that records every job and samples its own concurrency
pub(crate) struct MockExporter {
    outcomes: Mutex<HashMap<Snowflake, MockOutcome>>,
    delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
    exported: Mutex<Vec<ExportJob>>,
}

impl Default for MockExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl MockExporter {
    pub(crate) fn new() -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            exported: Mutex::new(Vec::new()),
        }
    }

    /// Hold every job for `delay` before finishing it
    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn with_outcome(self, channel_id: u64, outcome: MockOutcome) -> Self {
        self.outcomes
            .lock()
            .unwrap()
            .insert(Snowflake(channel_id), outcome);
        self
    }

    /// Jobs passed to `export`, in call order
    pub(crate) fn jobs(&self) -> Vec<ExportJob> {
        self.exported.lock().unwrap().clone()
    }

    pub(crate) fn exported_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.jobs().iter().map(|j| j.channel.id.0).collect();
        ids.sort_unstable();
        ids
    }

    /// Highest number of exports observed running at the same instant
    pub(crate) fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

/// Decrements the active counter however the export exits
struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ChannelExporter for MockExporter {
    async fn export(
        &self,
        job: &ExportJob,
        progress: &ProgressInput,
        cancel: CancellationToken,
    ) -> Result<(), ExportError> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        let _active = ActiveGuard(&self.active);
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        self.exported.lock().unwrap().push(job.clone());

        let outcome = self
            .outcomes
            .lock()
            .unwrap()
            .get(&job.channel.id)
            .cloned()
            .unwrap_or(MockOutcome::Succeed);

        progress.report(0.5);

        if matches!(outcome, MockOutcome::WaitForCancel) {
            cancel.cancelled().await;
            return Err(ExportError::Cancelled);
        }

        if !self.delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(self.delay) => {}
                _ = cancel.cancelled() => return Err(ExportError::Cancelled),
            }
        }

        match outcome {
            MockOutcome::Succeed | MockOutcome::WaitForCancel => {
                progress.report(1.0);
                Ok(())
            }
            MockOutcome::Empty(reason) => Err(ExportError::empty(reason)),
            MockOutcome::NonFatal(message) => Err(RemoteError::non_fatal(message).into()),
            MockOutcome::Fatal(message) => Err(RemoteError::fatal(message).into()),
            MockOutcome::Unrecoverable(message) => Err(ExportError::unrecoverable(message)),
            MockOutcome::Panic => panic!("exporter crashed on channel {}", job.channel.id),
        }
    }
}

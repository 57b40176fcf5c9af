//! Collaborator seams: the remote channel source and the per-channel exporter
//!
//! Both are consumed through trait objects so the engine can be driven by a
//! real API client in production and by in-memory fakes in tests.

use std::collections::HashSet;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use crate::engine::ExportJob;
use crate::error::{ExportError, RemoteError};
use crate::progress::ProgressInput;
use crate::types::{Channel, Snowflake};

/// Stream of channels yielded page by page, in upstream order
pub type ChannelStream<'a> = BoxStream<'a, Result<Channel, RemoteError>>;

/// Abstraction over the remote API listing channels and threads
///
/// Implementations own authentication, pagination and rate limiting; each call
/// returns a lazily-paginated stream that fails with [`RemoteError`].
pub trait ChannelProvider: Send + Sync {
    /// All channels of a guild (or the direct conversations of the pseudo-guild)
    fn list_channels(&self, guild_id: Snowflake) -> ChannelStream<'_>;

    /// Threads of a guild, optionally including archived ones
    fn list_threads(&self, guild_id: Snowflake, include_archived: bool) -> ChannelStream<'_>;

    /// Threads under the given parent channels, optionally bounded by creation time
    fn list_threads_for_parents(
        &self,
        parent_ids: &HashSet<Snowflake>,
        include_archived: bool,
        after: Option<Snowflake>,
        before: Option<Snowflake>,
    ) -> ChannelStream<'_>;
}

/// Exports one channel
///
/// The engine calls this once per job. Implementations report progress through
/// `progress` as they go and should return [`ExportError::Cancelled`] promptly
/// once `cancel` fires; the engine reports completion on `progress` itself.
#[async_trait]
pub trait ChannelExporter: Send + Sync {
    /// Export `job.channel` to `job.output_path`
    async fn export(
        &self,
        job: &ExportJob,
        progress: &ProgressInput,
        cancel: CancellationToken,
    ) -> Result<(), ExportError>;
}

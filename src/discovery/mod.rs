//! Channel discovery -- builds the ordered channel hierarchy for one guild.
//!
//! Split into:
//! - this module - fetching regular channels and threads from the provider
//! - [`tree`] - deduplication, display ordering and parent/child linking

mod tree;


pub use tree::{build_tree, dedup_channels, order_channels};

use futures::TryStreamExt;

use crate::error::{RemoteError, Result, Severity};
use crate::log_sink::LogSink;
use crate::provider::{ChannelProvider, ChannelStream};
use crate::types::{Channel, ChannelNode, Snowflake, ThreadInclusion};

/// Result of one discovery pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Discovery {
    /// Channel hierarchy in display order
    pub nodes: Vec<ChannelNode>,
    /// Non-fatal problems the pass worked around, as short user-facing notices
    pub notices: Vec<String>,
}

impl Discovery {
    /// Every discovered channel in depth-first display order
    pub fn channels(&self) -> Vec<&Channel> {
        self.nodes.iter().flat_map(ChannelNode::flatten).collect()
    }

    /// Channels that can be exported directly
    pub fn leaves(&self) -> Vec<&Channel> {
        self.channels().into_iter().filter(|c| c.is_leaf()).collect()
    }

    /// Number of discovered channels
    pub fn len(&self) -> usize {
        self.nodes.iter().map(ChannelNode::len).sum()
    }

    /// Whether discovery found nothing
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Discover the channel hierarchy of a guild
///
/// Phases:
/// 1. Fetch regular (non-thread, non-category) channels
/// 2. Fetch threads when `threads` asks for them (concurrently with phase 1)
/// 3. Merge, deduplicate by identifier and sort into display order
/// 4. Link children to their parents
///
/// A failure listing channels aborts discovery. A non-fatal failure listing
/// threads is recorded as a notice and discovery continues without threads.
pub async fn discover(
    provider: &dyn ChannelProvider,
    guild_id: Snowflake,
    threads: ThreadInclusion,
    log: &LogSink,
) -> Result<Discovery> {
    log.log(&format!(
        "Discovering channels for guild {guild_id} (threads: {threads:?})"
    ))
    .await;

    let fetch_channels = collect(provider.list_channels(guild_id));
    let fetch_threads = async {
        if threads.includes_threads() {
            Some(collect(provider.list_threads(guild_id, threads.includes_archived())).await)
        } else {
            None
        }
    };
    let (channels, thread_result) = tokio::join!(fetch_channels, fetch_threads);

    let channels = match channels {
        Ok(channels) => channels,
        Err(e) => {
            tracing::error!(guild_id = guild_id.0, error = %e, fatal = e.fatal, "Failed to list channels");
            log.log(&format!("Failed to list channels for guild {guild_id}: {e}"))
                .await;
            return Err(e.into());
        }
    };

    let regular: Vec<Channel> = channels
        .into_iter()
        .filter(|c| !c.kind.is_thread() && !c.kind.is_category())
        .collect();
    log.log(&format!(
        "Fetched {} channels for guild {guild_id}",
        regular.len()
    ))
    .await;

    let mut notices = Vec::new();
    let thread_items = match thread_result {
        None => Vec::new(),
        Some(Ok(items)) => {
            let items: Vec<Channel> = items.into_iter().filter(|c| c.kind.is_thread()).collect();
            log.log(&format!(
                "Fetched {} threads for guild {guild_id}",
                items.len()
            ))
            .await;
            items
        }
        Some(Err(e)) if e.severity() == Severity::NonFatal => {
            tracing::warn!(guild_id = guild_id.0, error = %e, "Failed to list threads, continuing without them");
            log.log(&format!(
                "Failed to list threads for guild {guild_id}, continuing without them: {e}"
            ))
            .await;
            notices.push(crate::error::trim_notice(&e.message));
            Vec::new()
        }
        Some(Err(e)) => {
            tracing::error!(guild_id = guild_id.0, error = %e, "Failed to list threads");
            log.log(&format!("Failed to list threads for guild {guild_id}: {e}"))
                .await;
            return Err(e.into());
        }
    };

    let merged: Vec<Channel> = regular.into_iter().chain(thread_items).collect();
    let ordered = order_channels(dedup_channels(merged));
    let nodes = build_tree(&ordered);

    log.log(&format!(
        "Discovered {} channels ({} top-level) for guild {guild_id}",
        ordered.len(),
        nodes.len()
    ))
    .await;
    tracing::debug!(
        guild_id = guild_id.0,
        channels = ordered.len(),
        roots = nodes.len(),
        "Channel discovery finished"
    );

    Ok(Discovery { nodes, notices })
}

/// Drain a paginated channel stream, preserving upstream order
pub(crate) async fn collect(stream: ChannelStream<'_>) -> std::result::Result<Vec<Channel>, RemoteError> {
    stream.try_collect().await
}

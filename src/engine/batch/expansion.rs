//! Forum expansion -- forums are never exported directly, only their threads.

use std::collections::{HashMap, HashSet};

use futures::TryStreamExt;

use super::super::ExportEngine;
use crate::error::{Result, Severity};
use crate::types::{Channel, Snowflake};

/// A channel to export plus its parent, when the batch knows it
#[derive(Debug)]
pub(super) struct ExportTarget {
    pub(super) channel: Channel,
    pub(super) parent: Option<Channel>,
}

impl ExportEngine {
    /// Replace forum parents in `selection` with their threads
    ///
    /// Threads are fetched in one request scoped to the selected forums and the
    /// batch's time bounds. Categories are dropped, and a thread that was also
    /// selected directly is exported once. A non-fatal fetch failure is sent as
    /// a notice and the forums contribute nothing; a fatal one aborts the batch.
    pub(super) async fn expand_forums(&self, selection: Vec<Channel>) -> Result<Vec<ExportTarget>> {
        let mut seen = HashSet::with_capacity(selection.len());
        let mut forums: HashMap<Snowflake, Channel> = HashMap::new();
        let mut targets = Vec::with_capacity(selection.len());

        for channel in selection {
            if !seen.insert(channel.id) {
                continue;
            }
            if channel.kind.is_forum() {
                forums.insert(channel.id, channel);
            } else if channel.kind.is_category() {
                tracing::debug!(channel_id = channel.id.0, "Skipping category in export selection");
            } else {
                targets.push(ExportTarget {
                    channel,
                    parent: None,
                });
            }
        }

        if forums.is_empty() {
            return Ok(targets);
        }

        let parent_ids: HashSet<Snowflake> = forums.keys().copied().collect();
        let options = &self.config.export;
        let include_archived = self.config.thread_inclusion.includes_archived();
        let after = options.after.map(Snowflake::from_date);
        let before = options.before.map(Snowflake::from_date);

        self.log
            .log(&format!("Fetching threads for {} forum(s)", parent_ids.len()))
            .await;

        let fetched: std::result::Result<Vec<Channel>, _> = self
            .provider
            .list_threads_for_parents(&parent_ids, include_archived, after, before)
            .try_collect()
            .await;

        let threads = match fetched {
            Ok(threads) => threads,
            Err(e) if e.severity() == Severity::NonFatal => {
                tracing::warn!(forums = parent_ids.len(), error = %e, "Failed to fetch forum threads");
                self.log
                    .log(&format!("Failed to fetch forum threads, skipping forums: {e}"))
                    .await;
                self.notify(&e.message);
                return Ok(targets);
            }
            Err(e) => {
                tracing::error!(forums = parent_ids.len(), error = %e, "Failed to fetch forum threads");
                self.log
                    .log(&format!("Failed to fetch forum threads: {e}"))
                    .await;
                return Err(e.into());
            }
        };

        let mut added = 0;
        for thread in threads {
            let Some(parent) = thread.parent_id().and_then(|id| forums.get(&id)) else {
                tracing::debug!(channel_id = thread.id.0, "Ignoring thread outside the selected forums");
                continue;
            };
            if !seen.insert(thread.id) {
                continue;
            }
            targets.push(ExportTarget {
                parent: Some(parent.clone()),
                channel: thread,
            });
            added += 1;
        }

        self.log
            .log(&format!(
                "Expanded {} forum(s) into {added} thread(s)",
                forums.len()
            ))
            .await;

        Ok(targets)
    }
}

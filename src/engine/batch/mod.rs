//! Bounded parallel export of a channel selection.
//!
//! Split into:
//! - [`expansion`] - Replacing forum parents with their threads
//! - [`dispatch`] - Semaphore-gated job execution and per-job failure isolation

mod dispatch;
mod expansion;

use tokio_util::sync::CancellationToken;

use super::{ExportEngine, ExportJob};
use crate::error::Result;
use crate::types::{BatchOutcome, Channel, Guild};

impl ExportEngine {
    /// Export `leaves` using the configured parallel limit
    ///
    /// See [`export_batch_with_limit`](Self::export_batch_with_limit).
    pub async fn export_batch(
        &self,
        guild: &Guild,
        leaves: Vec<Channel>,
        cancel: CancellationToken,
    ) -> Result<BatchOutcome> {
        let limit = self.config.effective_parallel_limit();
        self.export_batch_with_limit(guild, leaves, limit, cancel)
            .await
    }

    /// Export `leaves` with at most `limit` jobs running at once
    ///
    /// Forum parents in `leaves` are replaced by their threads before any job
    /// is built. Each job's failure is isolated: empty channels and non-fatal
    /// failures are reported as notices and the batch continues. An
    /// unrecoverable failure is returned as [`Error::ExportAborted`] only after
    /// every other job has finished.
    ///
    /// Once `cancel` fires no new jobs start; running jobs receive the same
    /// token. A `limit` below 1 is treated as 1; there is no upper cap.
    ///
    /// [`Error::ExportAborted`]: crate::error::Error::ExportAborted
    pub async fn export_batch_with_limit(
        &self,
        guild: &Guild,
        leaves: Vec<Channel>,
        limit: usize,
        cancel: CancellationToken,
    ) -> Result<BatchOutcome> {
        let _busy = self.begin_operation()?;
        let limit = limit.max(1);

        tracing::info!(
            guild_id = guild.id.0,
            selected = leaves.len(),
            parallel_limit = limit,
            "Starting export batch"
        );
        self.log
            .log(&format!(
                "Exporting {} selected channel(s) from guild {} ({}) with parallel limit {limit}",
                leaves.len(),
                guild.name,
                guild.id
            ))
            .await;

        let targets = self.expand_forums(leaves).await?;

        let options = &self.config.export;
        let jobs = targets
            .into_iter()
            .map(|target| ExportJob::new(guild, target.channel, target.parent, options))
            .collect();

        self.dispatch(jobs, limit, cancel).await
    }
}

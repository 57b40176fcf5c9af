//! Semaphore-gated job execution with per-job failure isolation.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::super::{ExportEngine, ExportJob};
use crate::error::{Error, ExportError, Result, Severity};
use crate::progress::ProgressInput;
use crate::types::{BatchOutcome, Channel, Event};

/// How one job ended
#[derive(Debug)]
enum JobOutcome {
    Succeeded,
    Empty,
    /// Isolated failure; the batch continues normally
    Failed,
    /// Unrecoverable failure; surfaced after the batch drains
    Aborted(String),
    Cancelled,
}

#[derive(Debug)]
struct JobReport {
    channel: Channel,
    outcome: JobOutcome,
}

impl ExportEngine {
    /// Run `jobs` with at most `limit` executing at once
    ///
    /// Progress inputs for every job are registered before the first job
    /// starts, so the aggregate covers the whole batch.
    pub(super) async fn dispatch(
        &self,
        jobs: Vec<ExportJob>,
        limit: usize,
        cancel: CancellationToken,
    ) -> Result<BatchOutcome> {
        let queued: Vec<(ExportJob, ProgressInput)> = jobs
            .into_iter()
            .map(|job| (job, self.progress.create_input()))
            .collect();

        let semaphore = Arc::new(Semaphore::new(limit));
        let succeeded = Arc::new(AtomicUsize::new(0));
        let mut running = JoinSet::new();
        let mut outcome = BatchOutcome::default();

        for (job, input) in queued {
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                permit = Arc::clone(&semaphore).acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                // Dropping the input retires it
                tracing::debug!(channel_id = job.channel.id.0, "Export not started, batch cancelled");
                outcome.not_started.push(job.channel);
                continue;
            };

            let engine = self.clone();
            let cancel = cancel.clone();
            let succeeded = Arc::clone(&succeeded);
            running.spawn(async move {
                let _permit = permit;
                engine.run_job(job, input, cancel, succeeded).await
            });
        }

        let mut aborted: Option<(Channel, String)> = None;
        let mut join_failure: Option<String> = None;
        while let Some(joined) = running.join_next().await {
            let report = match joined {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(error = %e, "Export task failed to join");
                    join_failure.get_or_insert_with(|| format!("export task failed: {e}"));
                    continue;
                }
            };

            match report.outcome {
                JobOutcome::Succeeded => {}
                JobOutcome::Empty => outcome.empty.push(report.channel),
                JobOutcome::Failed => outcome.failed.push(report.channel),
                JobOutcome::Aborted(message) => {
                    if aborted.is_none() {
                        aborted = Some((report.channel.clone(), message));
                    }
                    outcome.failed.push(report.channel);
                }
                JobOutcome::Cancelled => outcome.interrupted.push(report.channel),
            }
        }

        outcome.succeeded = succeeded.load(Ordering::SeqCst);
        outcome.cancelled = cancel.is_cancelled();
        self.finish_batch(&outcome).await;

        match (aborted, join_failure) {
            (Some((channel, message)), _) => Err(Error::ExportAborted {
                channel_id: channel.id,
                channel_name: channel.name,
                message,
                outcome: Box::new(outcome),
            }),
            (None, Some(message)) => Err(Error::Other(message)),
            (None, None) => Ok(outcome),
        }
    }

    /// Execute one job, classify its result, and always retire its progress input
    async fn run_job(
        self,
        job: ExportJob,
        input: ProgressInput,
        cancel: CancellationToken,
        succeeded: Arc<AtomicUsize>,
    ) -> JobReport {
        let channel_id = job.channel.id;
        self.emit_event(Event::ExportStarted {
            channel_id,
            name: job.channel.name.clone(),
        });
        self.log
            .log(&format!(
                "Exporting channel {} ({channel_id}) to {}",
                job.channel.name,
                job.output_path.display()
            ))
            .await;

        let result = match job.known_empty_reason() {
            Some(reason) => Err(ExportError::empty(reason)),
            None => AssertUnwindSafe(self.exporter.export(&job, &input, cancel.clone()))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    Err(ExportError::unrecoverable(format!(
                        "exporter panicked: {}",
                        panic_message(panic.as_ref())
                    )))
                }),
        };

        input.report_completion();

        let outcome = match result {
            Ok(()) => {
                succeeded.fetch_add(1, Ordering::SeqCst);
                self.emit_event(Event::ExportCompleted { channel_id });
                self.log
                    .log(&format!("Exported channel {} ({channel_id})", job.channel.name))
                    .await;
                JobOutcome::Succeeded
            }
            Err(ExportError::Cancelled) => {
                tracing::info!(channel_id = channel_id.0, "Export cancelled");
                self.log
                    .log(&format!(
                        "Export of channel {} ({channel_id}) cancelled",
                        job.channel.name
                    ))
                    .await;
                JobOutcome::Cancelled
            }
            Err(e) => match e.severity() {
                Severity::ItemEmpty => {
                    let reason = e.to_string();
                    tracing::info!(channel_id = channel_id.0, reason = %reason, "Nothing to export");
                    self.log
                        .log(&format!(
                            "Channel {} ({channel_id}) has nothing to export: {reason}",
                            job.channel.name
                        ))
                        .await;
                    self.notify(&format!("{}: {reason}", job.channel.name));
                    self.emit_event(Event::ExportSkipped { channel_id, reason });
                    JobOutcome::Empty
                }
                Severity::NonFatal => {
                    let message = e.to_string();
                    tracing::warn!(channel_id = channel_id.0, error = %e, "Export failed");
                    self.log
                        .log(&format!(
                            "Failed to export channel {} ({channel_id}): {message}",
                            job.channel.name
                        ))
                        .await;
                    self.notify(&format!("{}: {message}", job.channel.name));
                    self.emit_event(Event::ExportFailed {
                        channel_id,
                        error: message,
                        fatal: false,
                    });
                    JobOutcome::Failed
                }
                Severity::Fatal => {
                    let message = e.to_string();
                    tracing::error!(channel_id = channel_id.0, error = %e, "Export failed unrecoverably");
                    self.log
                        .log(&format!(
                            "Unrecoverable failure exporting channel {} ({channel_id}): {message}",
                            job.channel.name
                        ))
                        .await;
                    self.emit_event(Event::ExportFailed {
                        channel_id,
                        error: message.clone(),
                        fatal: true,
                    });
                    JobOutcome::Aborted(message)
                }
            },
        };

        JobReport {
            channel: job.channel,
            outcome,
        }
    }

    /// Summary notice, batch event and closing log line
    async fn finish_batch(&self, outcome: &BatchOutcome) {
        if outcome.succeeded > 0 {
            self.notify(&format!(
                "Successfully exported {} channel(s)",
                outcome.succeeded
            ));
        }
        self.emit_event(Event::BatchFinished {
            succeeded: outcome.succeeded,
            failed: outcome.failed.len(),
            cancelled: outcome.cancelled,
        });

        tracing::info!(
            succeeded = outcome.succeeded,
            empty = outcome.empty.len(),
            failed = outcome.failed.len(),
            not_started = outcome.not_started.len(),
            interrupted = outcome.interrupted.len(),
            cancelled = outcome.cancelled,
            "Export batch finished"
        );
        self.log
            .log(&format!(
                "Export batch finished: {} succeeded, {} empty, {} failed, {} interrupted, {} not started{}",
                outcome.succeeded,
                outcome.empty.len(),
                outcome.failed.len(),
                outcome.interrupted.len(),
                outcome.not_started.len(),
                if outcome.cancelled { " (cancelled)" } else { "" }
            ))
            .await;
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

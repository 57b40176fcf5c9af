//! One unit of export work

use std::path::PathBuf;

use crate::config::ExportOptions;
use crate::output_path::resolve_output_path;
use crate::types::{Channel, Guild, Snowflake};

/// A single channel export, built at batch start and consumed by one worker
///
/// The options are a snapshot: changing the engine's configuration after the
/// batch starts does not affect jobs already built.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportJob {
    /// Guild the channel belongs to
    pub guild: Guild,
    /// Channel to export (never a forum or category)
    pub channel: Channel,
    /// Parent channel, when the batch knows it (forum threads)
    pub parent: Option<Channel>,
    /// Export settings for this job
    pub options: ExportOptions,
    /// Resolved output file
    pub output_path: PathBuf,
}

impl ExportJob {
    /// Build a job, resolving the output path for this channel
    pub fn new(
        guild: &Guild,
        channel: Channel,
        parent: Option<Channel>,
        options: &ExportOptions,
    ) -> Self {
        let output_path = resolve_output_path(guild, &channel, parent.as_ref(), options);
        Self {
            guild: guild.clone(),
            channel,
            parent,
            options: options.clone(),
            output_path,
        }
    }

    /// Reason this job is known to have nothing to export, without asking the exporter
    ///
    /// A channel whose last message predates the lower time bound (or that has
    /// no messages at all) cannot produce output, and neither can one created
    /// after the upper time bound.
    pub fn known_empty_reason(&self) -> Option<String> {
        let created_too_late = self
            .options
            .before
            .is_some_and(|before| self.channel.id > Snowflake::from_date(before));
        if self.channel.may_have_messages_after(self.options.after) && !created_too_late {
            return None;
        }
        Some(if self.options.after.is_some() || self.options.before.is_some() {
            "Channel does not contain any messages within the specified period".to_string()
        } else {
            "Channel does not contain any messages".to_string()
        })
    }
}

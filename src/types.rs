//! Core types for channel-export

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// Milliseconds between the Unix epoch and the identifier epoch (2015-01-01T00:00:00Z)
pub const SNOWFLAKE_EPOCH_MS: u64 = 1_420_070_400_000;

/// Bits below the embedded timestamp
const SNOWFLAKE_TIMESTAMP_SHIFT: u32 = 22;

/// Opaque identifier, globally ordered by creation time
///
/// The creation timestamp lives in the high bits, so ordering identifiers orders
/// the things they name by age. Time bounds are passed to the remote source as
/// identifiers built with [`Snowflake::from_date`].
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Snowflake(pub u64);

impl Snowflake {
    /// Create a new Snowflake
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Get the inner u64 value
    pub fn get(&self) -> u64 {
        self.0
    }

    /// Smallest identifier that could have been created at `date`
    ///
    /// Dates before the identifier epoch map to 0; dates past the representable
    /// range saturate at `u64::MAX`.
    pub fn from_date(date: DateTime<Utc>) -> Self {
        let ms = u64::try_from(date.timestamp_millis()).unwrap_or(0);
        let elapsed = ms.saturating_sub(SNOWFLAKE_EPOCH_MS);
        Self(
            elapsed
                .checked_mul(1 << SNOWFLAKE_TIMESTAMP_SHIFT)
                .unwrap_or(u64::MAX),
        )
    }

    /// Creation time embedded in the identifier
    pub fn created_at(&self) -> DateTime<Utc> {
        let ms = (self.0 >> SNOWFLAKE_TIMESTAMP_SHIFT) + SNOWFLAKE_EPOCH_MS;
        Utc.timestamp_millis_opt(ms as i64)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }
}

impl From<u64> for Snowflake {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl From<Snowflake> for u64 {
    fn from(id: Snowflake) -> Self {
        id.0
    }
}

impl std::fmt::Display for Snowflake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Snowflake {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// A collection root: a guild, or the pseudo-guild holding direct conversations
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Guild {
    /// Guild identifier
    pub id: Snowflake,
    /// Display name
    pub name: String,
}

impl Guild {
    /// The pseudo-guild whose channels are the user's direct conversations
    pub fn direct_messages() -> Self {
        Self {
            id: Snowflake(0),
            name: "Direct Messages".to_string(),
        }
    }

    /// Whether this is the direct-conversation pseudo-guild
    pub fn is_direct(&self) -> bool {
        self.id == Snowflake(0)
    }
}

/// Kind of a remote channel
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Regular guild text channel
    Text,
    /// Guild voice channel (may carry a text chat)
    Voice,
    /// Announcement channel
    Announcement,
    /// Stage channel
    Stage,
    /// Category grouping other channels; never exported
    Category,
    /// Forum; its threads are the exportable units
    Forum,
    /// Thread under an announcement channel
    AnnouncementThread,
    /// Public thread (forum posts are public threads)
    PublicThread,
    /// Private thread
    PrivateThread,
    /// One-to-one direct conversation
    DirectMessage,
    /// Group direct conversation
    GroupDirectMessage,
}

impl ChannelKind {
    /// Whether this kind is a thread
    pub fn is_thread(&self) -> bool {
        matches!(
            self,
            ChannelKind::AnnouncementThread | ChannelKind::PublicThread | ChannelKind::PrivateThread
        )
    }

    /// Whether this kind is a direct conversation
    pub fn is_direct(&self) -> bool {
        matches!(
            self,
            ChannelKind::DirectMessage | ChannelKind::GroupDirectMessage
        )
    }

    /// Whether this kind is a forum parent
    pub fn is_forum(&self) -> bool {
        matches!(self, ChannelKind::Forum)
    }

    /// Whether this kind is a category
    pub fn is_category(&self) -> bool {
        matches!(self, ChannelKind::Category)
    }
}

/// Back-reference from a channel to its parent (not ownership)
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParentRef {
    /// Parent identifier
    pub id: Snowflake,
    /// Parent display name, when the source provides it
    #[serde(default)]
    pub name: Option<String>,
    /// Parent position among its siblings
    #[serde(default)]
    pub position: Option<i32>,
}

impl ParentRef {
    /// Reference a parent by identifier only
    pub fn new(id: Snowflake) -> Self {
        Self {
            id,
            name: None,
            position: None,
        }
    }

    /// Reference an already-known parent channel
    pub fn of(channel: &Channel) -> Self {
        Self {
            id: channel.id,
            name: Some(channel.name.clone()),
            position: channel.position,
        }
    }
}

/// A remote collection unit: channel, thread or direct conversation
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel {
    /// Unique identifier
    pub id: Snowflake,
    /// Identifier of the owning guild
    pub guild_id: Snowflake,
    /// Channel kind
    pub kind: ChannelKind,
    /// Display name
    pub name: String,
    /// Parent channel (category, forum, or the channel a thread was started in)
    #[serde(default)]
    pub parent: Option<ParentRef>,
    /// Explicit position among siblings (absent for threads and direct conversations)
    #[serde(default)]
    pub position: Option<i32>,
    /// Identifier of the most recent message, if any
    #[serde(default)]
    pub last_message_id: Option<Snowflake>,
}

impl Channel {
    /// Identifier of the parent channel, if declared
    pub fn parent_id(&self) -> Option<Snowflake> {
        self.parent.as_ref().map(|p| p.id)
    }

    /// Whether the channel can be exported directly (forums and categories cannot)
    pub fn is_leaf(&self) -> bool {
        !self.kind.is_forum() && !self.kind.is_category()
    }

    /// Whether the channel could contain messages created after `after`
    ///
    /// A channel with no messages at all never qualifies; without a lower bound
    /// any non-empty channel does.
    pub fn may_have_messages_after(&self, after: Option<DateTime<Utc>>) -> bool {
        match (self.last_message_id, after) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(last), Some(after)) => last > Snowflake::from_date(after),
        }
    }
}

/// A channel plus its ordered children; immutable once built
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelNode {
    /// The channel at this node
    pub channel: Channel,
    /// Children in display order (empty for leaves)
    pub children: Vec<ChannelNode>,
}

impl ChannelNode {
    /// A node without children
    pub fn leaf(channel: Channel) -> Self {
        Self {
            channel,
            children: Vec::new(),
        }
    }

    /// Channels of this subtree in depth-first display order
    pub fn flatten(&self) -> Vec<&Channel> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a Channel>) {
        out.push(&self.channel);
        for child in &self.children {
            child.collect_into(out);
        }
    }

    /// Number of channels in this subtree, including this node
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(ChannelNode::len).sum::<usize>()
    }

    /// A node always holds at least its own channel
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Which threads discovery fetches
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadInclusion {
    /// No threads
    #[default]
    None,
    /// Only active (non-archived) threads
    Active,
    /// Active and archived threads
    All,
}

impl ThreadInclusion {
    /// Whether any threads are fetched
    pub fn includes_threads(&self) -> bool {
        !matches!(self, ThreadInclusion::None)
    }

    /// Whether archived threads are fetched too
    pub fn includes_archived(&self) -> bool {
        matches!(self, ThreadInclusion::All)
    }
}

/// Outcome of one export batch
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
    /// Jobs that completed without any failure
    pub succeeded: usize,
    /// Channels that had nothing to export
    pub empty: Vec<Channel>,
    /// Channels whose export failed (non-fatal or unrecoverable)
    pub failed: Vec<Channel>,
    /// Channels never started because the batch was cancelled
    pub not_started: Vec<Channel>,
    /// Channels whose running export unwound on cancellation
    pub interrupted: Vec<Channel>,
    /// Whether the cancellation signal was raised during the batch
    pub cancelled: bool,
}

impl BatchOutcome {
    /// Total number of jobs the batch was asked to run
    pub fn total(&self) -> usize {
        self.succeeded
            + self.empty.len()
            + self.failed.len()
            + self.not_started.len()
            + self.interrupted.len()
    }
}

/// Event emitted during discovery and export
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// Channel discovery started for a guild
    DiscoveryStarted {
        /// Guild being discovered
        guild_id: Snowflake,
    },

    /// Channel discovery finished
    DiscoveryFinished {
        /// Guild that was discovered
        guild_id: Snowflake,
        /// Number of channels in the resulting tree
        channel_count: usize,
    },

    /// A channel export started
    ExportStarted {
        /// Channel being exported
        channel_id: Snowflake,
        /// Channel display name
        name: String,
    },

    /// A channel export finished successfully
    ExportCompleted {
        /// Exported channel
        channel_id: Snowflake,
    },

    /// A channel had nothing to export
    ExportSkipped {
        /// Skipped channel
        channel_id: Snowflake,
        /// Why it was skipped
        reason: String,
    },

    /// A channel export failed
    ExportFailed {
        /// Failed channel
        channel_id: Snowflake,
        /// Error message
        error: String,
        /// Whether the failure is reported as fatal
        fatal: bool,
    },

    /// An export batch finished
    BatchFinished {
        /// Jobs that succeeded
        succeeded: usize,
        /// Jobs that failed
        failed: usize,
        /// Whether the batch was cancelled
        cancelled: bool,
    },

    /// Short user-facing notice (non-fatal conditions, batch summaries)
    Notice {
        /// Notice text
        message: String,
    },
}

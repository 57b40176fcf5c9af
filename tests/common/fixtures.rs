//! Test fixtures: a small guild and collaborators that touch the filesystem

use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use channel_export::{
    Channel, ChannelExporter, ChannelKind, ChannelProvider, ChannelStream, Config, ExportError,
    ExportJob, Guild, ParentRef, ProgressInput, RemoteError, Snowflake,
};
use futures::StreamExt;
use futures::stream;
use tokio_util::sync::CancellationToken;

pub const GUILD_ID: Snowflake = Snowflake(4242);

pub fn guild() -> Guild {
    Guild {
        id: GUILD_ID,
        name: "Integration Guild".to_string(),
    }
}

fn base(id: u64, kind: ChannelKind, name: &str) -> Channel {
    Channel {
        id: Snowflake(id),
        guild_id: GUILD_ID,
        kind,
        name: name.to_string(),
        parent: None,
        position: None,
        last_message_id: Some(Snowflake(id << 30)),
    }
}

/// A guild with a category, two text channels, a forum with two posts and an
/// announcement thread
pub struct SampleGuild {
    pub channels: Vec<Channel>,
    pub threads: Vec<Channel>,
}

pub fn sample_guild() -> SampleGuild {
    let category = Channel {
        position: Some(0),
        ..base(1, ChannelKind::Category, "Text Channels")
    };
    let general = Channel {
        position: Some(1),
        parent: Some(ParentRef::of(&category)),
        ..base(2, ChannelKind::Text, "general")
    };
    let news = Channel {
        position: Some(2),
        ..base(3, ChannelKind::Announcement, "news")
    };
    let help = Channel {
        position: Some(3),
        ..base(4, ChannelKind::Forum, "help")
    };

    let threads = vec![
        Channel {
            parent: Some(ParentRef::of(&help)),
            ..base(10, ChannelKind::PublicThread, "how do I build?")
        },
        Channel {
            parent: Some(ParentRef::of(&help)),
            ..base(11, ChannelKind::PublicThread, "release notes")
        },
        Channel {
            parent: Some(ParentRef::of(&news)),
            ..base(12, ChannelKind::AnnouncementThread, "v1 discussion")
        },
    ];

    SampleGuild {
        channels: vec![category, general, news, help],
        threads,
    }
}

/// Serves a fixed guild; the per-parent thread query filters by parent
pub struct StaticProvider {
    pub guild: SampleGuild,
}

fn serve(items: Vec<Channel>) -> ChannelStream<'static> {
    stream::iter(items.into_iter().map(Ok::<_, RemoteError>)).boxed()
}

impl ChannelProvider for StaticProvider {
    fn list_channels(&self, _guild_id: Snowflake) -> ChannelStream<'_> {
        serve(self.guild.channels.clone())
    }

    fn list_threads(&self, _guild_id: Snowflake, _include_archived: bool) -> ChannelStream<'_> {
        serve(self.guild.threads.clone())
    }

    fn list_threads_for_parents(
        &self,
        parent_ids: &HashSet<Snowflake>,
        _include_archived: bool,
        _after: Option<Snowflake>,
        _before: Option<Snowflake>,
    ) -> ChannelStream<'_> {
        serve(
            self.guild
                .threads
                .iter()
                .filter(|t| t.parent_id().is_some_and(|p| parent_ids.contains(&p)))
                .cloned()
                .collect(),
        )
    }
}

/// Writes one small text file per job, reporting progress in steps
#[derive(Default)]
pub struct FileExporter {
    pub fail_channel: Option<Snowflake>,
    pub written: Mutex<Vec<Snowflake>>,
}

#[async_trait]
impl ChannelExporter for FileExporter {
    async fn export(
        &self,
        job: &ExportJob,
        progress: &ProgressInput,
        cancel: CancellationToken,
    ) -> Result<(), ExportError> {
        if Some(job.channel.id) == self.fail_channel {
            return Err(RemoteError::non_fatal("Access denied.").into());
        }

        for step in 1..=4 {
            if cancel.is_cancelled() {
                return Err(ExportError::Cancelled);
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
            progress.report(f64::from(step) / 4.0);
        }

        if let Some(dir) = job.output_path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let parent = job.parent.as_ref().map(|p| p.name.as_str()).unwrap_or("-");
        tokio::fs::write(
            &job.output_path,
            format!("{} / {} / {}\n", job.guild.name, parent, job.channel.name),
        )
        .await?;

        self.written.lock().unwrap().push(job.channel.id);
        Ok(())
    }
}

/// Configuration writing exports and the trace log under `dir`
pub fn config_in(dir: &Path) -> Config {
    let mut config = Config::default();
    config.export.output_path = dir.join("exports");
    config.log.base_dir = Some(dir.to_path_buf());
    config
}

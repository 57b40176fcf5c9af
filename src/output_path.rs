//! Output path resolution for export jobs
//!
//! The configured output path may be a plain file, a directory, or a template
//! containing `%`-tokens expanded per channel:
//!
//! | Token | Value                         |
//! |-------|-------------------------------|
//! | `%g`  | guild id                      |
//! | `%G`  | guild name                    |
//! | `%t`  | parent id                     |
//! | `%T`  | parent name                   |
//! | `%c`  | channel id                    |
//! | `%C`  | channel name                  |
//! | `%p`  | channel position              |
//! | `%P`  | parent position               |
//! | `%a`  | after date (`yyyy-mm-dd`)     |
//! | `%b`  | before date (`yyyy-mm-dd`)    |
//! | `%d`  | current date (`yyyy-mm-dd`)   |
//! | `%%`  | literal `%`                   |
//!
//! Unknown tokens are left as written.

use crate::config::ExportOptions;
use crate::types::{Channel, Guild, Snowflake};
use chrono::{DateTime, Local, Utc};
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

const DATE_FORMAT: &str = "%Y-%m-%d";

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used)]
    Regex::new(r"(?s)%.").expect("token pattern is valid")
});

/// Parent details for path building, from the resolved parent when known
struct ParentInfo<'a> {
    id: Snowflake,
    name: Option<&'a str>,
    position: Option<i32>,
}

impl<'a> ParentInfo<'a> {
    fn resolve(channel: &'a Channel, parent: Option<&'a Channel>) -> Option<Self> {
        match parent {
            Some(parent) => Some(Self {
                id: parent.id,
                name: Some(parent.name.as_str()),
                position: parent.position,
            }),
            None => channel.parent.as_ref().map(|p| Self {
                id: p.id,
                name: p.name.as_deref(),
                position: p.position,
            }),
        }
    }
}

/// Replace characters that are invalid in file names with `_`
///
/// # Examples
///
/// ```
/// use channel_export::output_path::sanitize_file_name;
///
/// assert_eq!(sanitize_file_name("news/updates: 2024?"), "news_updates_ 2024_");
/// ```
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Default file name for a channel export
///
/// `"<guild> - <parent> - <channel> [<id>]"`, the parent part omitted when no
/// parent name is known, followed by the date range if one is set and the
/// format's extension. `parent` takes precedence over the channel's own parent
/// reference.
#[must_use]
pub fn default_file_name(
    guild: &Guild,
    channel: &Channel,
    parent: Option<&Channel>,
    options: &ExportOptions,
) -> String {
    let mut name = guild.name.clone();
    if let Some(parent_name) = ParentInfo::resolve(channel, parent).and_then(|p| p.name) {
        name.push_str(" - ");
        name.push_str(parent_name);
    }
    name.push_str(&format!(" - {} [{}]", channel.name, channel.id));

    match (options.after, options.before) {
        (Some(after), Some(before)) => {
            name.push_str(&format!(" ({} to {})", date(after), date(before)));
        }
        (Some(after), None) => name.push_str(&format!(" (after {})", date(after))),
        (None, Some(before)) => name.push_str(&format!(" (before {})", date(before))),
        (None, None) => {}
    }

    name.push('.');
    name.push_str(options.format.file_extension());
    sanitize_file_name(&name)
}

/// Resolve the file an export of `channel` should write to
///
/// Tokens are expanded first; if the result names a directory (it exists as
/// one, or has no extension) the default file name is appended. `parent` is the
/// parent channel when the caller has resolved it.
pub fn resolve_output_path(
    guild: &Guild,
    channel: &Channel,
    parent: Option<&Channel>,
    options: &ExportOptions,
) -> PathBuf {
    let template = options.output_path.to_string_lossy();
    let expanded = if template.contains('%') {
        PathBuf::from(expand_tokens(&template, guild, channel, parent, options))
    } else {
        options.output_path.clone()
    };

    if names_directory(&expanded) {
        expanded.join(default_file_name(guild, channel, parent, options))
    } else {
        expanded
    }
}

fn expand_tokens(
    template: &str,
    guild: &Guild,
    channel: &Channel,
    parent: Option<&Channel>,
    options: &ExportOptions,
) -> String {
    let parent = ParentInfo::resolve(channel, parent);
    let parent = parent.as_ref();

    let expanded = TOKEN_PATTERN.replace_all(template, |caps: &Captures<'_>| {
        let token = &caps[0];
        let value = match token {
            "%g" => guild.id.to_string(),
            "%G" => guild.name.clone(),
            "%t" => parent.map(|p| p.id.to_string()).unwrap_or_default(),
            "%T" => parent.and_then(|p| p.name).unwrap_or_default().to_string(),
            "%c" => channel.id.to_string(),
            "%C" => channel.name.clone(),
            "%p" => channel.position.unwrap_or(0).to_string(),
            "%P" => parent.and_then(|p| p.position).unwrap_or(0).to_string(),
            "%a" => options.after.map(date).unwrap_or_default(),
            "%b" => options.before.map(date).unwrap_or_default(),
            "%d" => Local::now().format(DATE_FORMAT).to_string(),
            "%%" => "%".to_string(),
            other => return other.to_string(),
        };
        sanitize_file_name(&value)
    });
    expanded.into_owned()
}

fn names_directory(path: &Path) -> bool {
    path.is_dir()
        || path
            .extension()
            .map(|ext| ext.to_string_lossy().trim().is_empty())
            .unwrap_or(true)
}

fn date(value: DateTime<Utc>) -> String {
    value.format(DATE_FORMAT).to_string()
}

//! Custom test assertions for integration tests

use std::path::Path;
use std::time::Duration;

use channel_export::{Event, ExportEngine};
use futures::StreamExt;

/// Collect events until `stop_predicate` matches or `timeout` elapses
///
/// Subscribe before starting the operation being observed, so no event is missed.
pub async fn collect_events_until<S, F>(events: S, timeout: Duration, stop_predicate: F) -> Vec<Event>
where
    S: futures::Stream<Item = Event> + Unpin,
    F: Fn(&Event) -> bool,
{
    let mut events = events;
    let mut collected = Vec::new();

    let _ = tokio::time::timeout(timeout, async {
        while let Some(event) = events.next().await {
            let should_stop = stop_predicate(&event);
            collected.push(event);
            if should_stop {
                break;
            }
        }
    })
    .await;

    collected
}

/// Assert every line of the engine's trace log starts with an RFC 3339 timestamp
///
/// Returns the lines for further checks.
pub fn assert_log_well_formed(engine: &ExportEngine) -> Vec<String> {
    let path = engine.log_sink().path().expect("trace log should be enabled");
    let contents = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("trace log {} unreadable: {e}", path.display()));

    let lines: Vec<String> = contents.lines().map(str::to_string).collect();
    assert!(!lines.is_empty(), "trace log should not be empty");
    for line in &lines {
        let (timestamp, message) = line
            .split_once(' ')
            .unwrap_or_else(|| panic!("line has no message: {line}"));
        assert!(
            chrono::DateTime::parse_from_rfc3339(timestamp).is_ok(),
            "line must start with an RFC 3339 timestamp: {line}"
        );
        assert!(!message.is_empty(), "line must carry a message: {line}");
    }
    lines
}

/// Assert `dir` holds exactly `expected` files
pub fn assert_file_count(dir: &Path, expected: usize) {
    let count = std::fs::read_dir(dir)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", dir.display()))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_file())
        .count();
    assert_eq!(count, expected, "unexpected number of files in {}", dir.display());
}

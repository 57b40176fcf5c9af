
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use super::ExportEngine;
use crate::config::Config;
use crate::test_helpers::{MockExporter, MockProvider};
use crate::types::Event;

/// Configuration with the trace log switched off
pub(super) fn quiet_config() -> Config {
    let mut config = Config::default();
    config.log.enabled = false;
    config
}

pub(super) fn engine(
    config: Config,
    provider: &Arc<MockProvider>,
    exporter: &Arc<MockExporter>,
) -> ExportEngine {
    ExportEngine::new(config, provider.clone(), exporter.clone()).unwrap()
}

pub(super) fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub(super) fn notices(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .filter_map(|e| match e {
            Event::Notice { message } => Some(message.clone()),
            _ => None,
        })
        .collect()
}

/// Poll until `condition` holds, failing the test after two seconds
pub(super) async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached within 2s");
}

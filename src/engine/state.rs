//! Busy tracking and the "can start" predicates derived from it

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::ExportEngine;
use crate::types::{Channel, Guild};

/// Holds the engine's busy flag for the duration of one operation
///
/// The flag is released when the guard is dropped, on every exit path.
#[derive(Debug)]
pub struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    /// Set `flag`, or return `None` if another operation already holds it
    pub fn try_acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                flag: Arc::clone(flag),
            })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl ExportEngine {
    /// Whether a discovery or export operation is running
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Whether discovery can start for the selected guild
    pub fn can_pull_channels(&self, guild: Option<&Guild>) -> bool {
        !self.is_busy() && guild.is_some()
    }

    /// Whether an export can start for the selected channels
    pub fn can_export(&self, selection: &[Channel]) -> bool {
        !self.is_busy() && !selection.is_empty()
    }

    pub(crate) fn begin_operation(&self) -> crate::error::Result<BusyGuard> {
        BusyGuard::try_acquire(&self.busy).ok_or(crate::error::Error::Busy)
    }
}

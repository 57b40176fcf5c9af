//! Progress aggregation across concurrently running export jobs
//!
//! A [`ProgressMuxer`] hands out one [`ProgressInput`] per job and merges their
//! fractional completion into a single value: the mean over all registered
//! inputs. With auto-reset enabled, the muxer returns to idle once every input
//! has completed, so the next batch starts from a clean baseline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

/// Buffered aggregate updates per subscriber before it starts lagging
const UPDATE_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy)]
struct InputState {
    value: f64,
    completed: bool,
}

#[derive(Debug, Default)]
struct MuxerState {
    inputs: HashMap<u64, InputState>,
    next_id: u64,
}

impl MuxerState {
    fn aggregate(&self) -> Option<f64> {
        if self.inputs.is_empty() {
            return None;
        }
        let sum: f64 = self.inputs.values().map(|i| i.value).sum();
        Some(sum / self.inputs.len() as f64)
    }

    fn all_completed(&self) -> bool {
        !self.inputs.is_empty() && self.inputs.values().all(|i| i.completed)
    }
}

/// Merges the progress of many inputs into one bounded value
///
/// Cloning is cheap and every clone observes the same inputs. All operations
/// lock internally; callers never need their own synchronization.
#[derive(Clone, Debug)]
pub struct ProgressMuxer {
    state: Arc<Mutex<MuxerState>>,
    updates: broadcast::Sender<Option<f64>>,
    auto_reset: bool,
}

impl Default for ProgressMuxer {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressMuxer {
    /// Muxer that keeps completed inputs until [`reset`](Self::reset) is called
    pub fn new() -> Self {
        let (updates, _rx) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(MuxerState::default())),
            updates,
            auto_reset: false,
        }
    }

    /// Muxer that returns to idle once all of its inputs have completed
    pub fn with_auto_reset() -> Self {
        Self {
            auto_reset: true,
            ..Self::new()
        }
    }

    /// Whether the muxer resets itself after a fully completed batch
    pub fn auto_reset(&self) -> bool {
        self.auto_reset
    }

    /// Register a new input starting at 0
    pub fn create_input(&self) -> ProgressInput {
        let mut state = self.lock();
        let id = state.next_id;
        state.next_id += 1;
        state.inputs.insert(
            id,
            InputState {
                value: 0.0,
                completed: false,
            },
        );
        self.publish(state.aggregate());
        drop(state);

        ProgressInput {
            id,
            muxer: self.clone(),
            completed: AtomicBool::new(false),
        }
    }

    /// Current aggregate in `[0, 1]`, or `None` while idle
    pub fn aggregate(&self) -> Option<f64> {
        self.lock().aggregate()
    }

    /// Whether any inputs are registered
    pub fn is_active(&self) -> bool {
        !self.lock().inputs.is_empty()
    }

    /// Number of registered inputs
    pub fn input_count(&self) -> usize {
        self.lock().inputs.len()
    }

    /// Drop every registered input and return to idle
    pub fn reset(&self) {
        let mut state = self.lock();
        state.inputs.clear();
        self.publish(None);
    }

    /// Receive every aggregate change (`None` marks the return to idle)
    pub fn subscribe(&self) -> broadcast::Receiver<Option<f64>> {
        self.updates.subscribe()
    }

    fn update(&self, id: u64, value: f64, completed: bool) {
        let mut state = self.lock();
        let Some(input) = state.inputs.get_mut(&id) else {
            // Input was cleared by a reset; nothing left to update
            return;
        };
        if input.completed {
            return;
        }
        input.value = value;
        input.completed = completed;
        self.publish(state.aggregate());

        if self.auto_reset && state.all_completed() {
            state.inputs.clear();
            self.publish(None);
        }
    }

    /// Send while the state lock is held so subscribers see changes in order
    fn publish(&self, aggregate: Option<f64>) {
        // No subscribers is fine
        self.updates.send(aggregate).ok();
    }

    fn lock(&self) -> MutexGuard<'_, MuxerState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// One job's contribution to a [`ProgressMuxer`]
///
/// Dropping an input that never reported completion completes it, so a job
/// that unwinds early cannot hold the aggregate below 1 forever.
#[derive(Debug)]
pub struct ProgressInput {
    id: u64,
    muxer: ProgressMuxer,
    completed: AtomicBool,
}

impl ProgressInput {
    /// Report fractional completion; values are clamped to `[0, 1]`, NaN is ignored
    pub fn report(&self, fraction: f64) {
        if fraction.is_nan() || self.is_completed() {
            return;
        }
        self.muxer.update(self.id, fraction.clamp(0.0, 1.0), false);
    }

    /// Mark this input finished at 1; later calls have no effect
    pub fn report_completion(&self) {
        if self.completed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.muxer.update(self.id, 1.0, true);
    }

    /// Whether completion has been reported
    pub fn is_completed(&self) -> bool {
        self.completed.load(Ordering::SeqCst)
    }
}

impl Drop for ProgressInput {
    fn drop(&mut self) {
        self.report_completion();
    }
}

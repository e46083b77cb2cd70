//! Push progress state shared between the worker and its observers.
//!
//! [`ProgressReporter`] owns the pass state machine (`Idle` / `Running`) and
//! the counters behind [`SyncProgress`]. The push worker is the only writer
//! during a pass; the application shell reads snapshots or subscribes.
//! Callbacks are invoked after the internal lock is released, so a callback
//! may call back into the reporter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use partspro_domain::{PassState, SyncProgress};

/// Observer callback.
pub type ProgressCallback = Arc<dyn Fn(&SyncProgress) + Send + Sync>;

/// Handle returned by [`ProgressReporter::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Default)]
struct ProgressState {
    pass: PassState,
    total: usize,
    synced: usize,
    failed: usize,
    last_error: Option<String>,
}

impl ProgressState {
    fn snapshot(&self) -> SyncProgress {
        SyncProgress {
            total_items: self.total,
            synced_items: self.synced,
            failed_items: self.failed,
            in_progress: self.pass.is_running(),
            last_error: self.last_error.clone(),
        }
    }
}

/// Progress state machine with any number of observers.
#[derive(Default)]
pub struct ProgressReporter {
    state: Mutex<ProgressState>,
    subscribers: Mutex<Vec<(SubscriptionId, ProgressCallback)>>,
    next_id: AtomicU64,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point-in-time copy of the counters.
    pub fn snapshot(&self) -> SyncProgress {
        self.state.lock().snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.state.lock().pass.is_running()
    }

    /// Time since the running pass started, `None` when idle.
    pub fn elapsed(&self, now: Instant) -> Option<Duration> {
        match self.state.lock().pass {
            PassState::Running { started_at } => Some(now.saturating_duration_since(started_at)),
            PassState::Idle => None,
        }
    }

    /// Register an observer. It receives a snapshot after every change.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&SyncProgress) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.lock().push((id, Arc::new(callback)));
        id
    }

    /// Drop an observer. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(existing, _)| *existing != id);
        subscribers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Move `Idle -> Running` and zero the per-pass counters.
    ///
    /// Returns false, changing nothing, if a pass is already running.
    pub fn try_begin(&self, started_at: Instant) -> bool {
        self.update(|state| {
            if state.pass.is_running() {
                return false;
            }
            state.pass = PassState::Running { started_at };
            state.synced = 0;
            state.failed = 0;
            true
        })
    }

    pub fn set_total(&self, total: usize) {
        self.update(|state| state.total = total);
    }

    pub fn record_success(&self) {
        self.update(|state| state.synced += 1);
    }

    pub fn record_failure(&self, error: &str) {
        self.update(|state| {
            state.failed += 1;
            state.last_error = Some(error.to_string());
        });
    }

    /// Store an error that is not tied to an item.
    pub fn record_error(&self, error: &str) {
        self.update(|state| state.last_error = Some(error.to_string()));
    }

    /// Return to `Idle`, keeping the final counts.
    pub fn finish(&self) {
        self.update(|state| state.pass = PassState::Idle);
    }

    /// Force `Idle` and zero everything, including `last_error`.
    pub fn reset(&self) {
        self.update(|state| *state = ProgressState::default());
    }

    fn update<R>(&self, change: impl FnOnce(&mut ProgressState) -> R) -> R {
        let (result, snapshot) = {
            let mut state = self.state.lock();
            let before = state.snapshot();
            let result = change(&mut state);
            let after = state.snapshot();
            (result, (after != before).then_some(after))
        };

        if let Some(snapshot) = snapshot {
            self.notify(&snapshot);
        }
        result
    }

    fn notify(&self, snapshot: &SyncProgress) {
        let callbacks: Vec<ProgressCallback> =
            self.subscribers.lock().iter().map(|(_, callback)| Arc::clone(callback)).collect();
        for callback in callbacks {
            callback(snapshot);
        }
    }
}

impl std::fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("progress", &self.snapshot())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

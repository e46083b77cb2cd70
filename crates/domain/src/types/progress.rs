//! Push progress snapshots and pass outcomes

use std::time::Instant;

use serde::{Deserialize, Serialize};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

/// Observer-facing snapshot of the push worker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct SyncProgress {
    pub total_items: usize,
    pub synced_items: usize,
    pub failed_items: usize,
    pub in_progress: bool,
    pub last_error: Option<String>,
}

/// Whether a push pass is underway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PassState {
    #[default]
    Idle,
    Running {
        started_at: Instant,
    },
}

impl PassState {
    pub fn is_running(&self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

/// Why a pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PassStop {
    /// Every fetched item was attempted.
    Drained,
    /// Nothing was pending.
    Empty,
    /// The remote store reported quota exhaustion.
    QuotaExceeded,
    /// The pass ran past its time ceiling.
    DeadlineReached,
    /// Another pass was already running; nothing was done.
    AlreadyRunning,
    /// The queue could not be read.
    QueueUnavailable,
}

crate::impl_domain_status_conversions!(PassStop {
    Drained => "drained",
    Empty => "empty",
    QuotaExceeded => "quota_exceeded",
    DeadlineReached => "deadline_reached",
    AlreadyRunning => "already_running",
    QueueUnavailable => "queue_unavailable",
});

/// Counts returned from one push pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassOutcome {
    pub success: usize,
    pub failed: usize,
    pub stop: PassStop,
}

impl PassOutcome {
    pub const fn new(success: usize, failed: usize, stop: PassStop) -> Self {
        Self { success, failed, stop }
    }

    /// The `{0, 0}` result of a trigger that found a pass in flight.
    pub const fn skipped() -> Self {
        Self::new(0, 0, PassStop::AlreadyRunning)
    }
}

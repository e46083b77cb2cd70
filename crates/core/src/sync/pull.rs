//! Pull service - reconciles remote state into the local record cache.
//!
//! [`PullCadence`] decides *when* to pull; it is pure and driven by the
//! caller's clock. [`PullService`] performs one pull. The loop that ties the
//! two together lives in the infrastructure crate.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use partspro_common::time::Clock;
use partspro_domain::constants::{
    DEFAULT_PULL_BASE_INTERVAL_SECS, DEFAULT_PULL_COLLECTIONS, DEFAULT_PULL_MAX_INTERVAL_SECS,
    DEFAULT_PULL_MIN_INTERVAL_SECS,
};
use partspro_domain::{ActivityEvent, PullConfig, QueryFilter};
use tracing::{debug, info, instrument, warn};

use super::ports::{LocalRecordStore, RemoteStore, SyncQueue};

/// Interval bounds and the collections to pull.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullSettings {
    pub base_interval: Duration,
    pub min_interval: Duration,
    pub max_interval: Duration,
    pub collections: Vec<String>,
}

impl Default for PullSettings {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_secs(DEFAULT_PULL_BASE_INTERVAL_SECS),
            min_interval: Duration::from_secs(DEFAULT_PULL_MIN_INTERVAL_SECS),
            max_interval: Duration::from_secs(DEFAULT_PULL_MAX_INTERVAL_SECS),
            collections: DEFAULT_PULL_COLLECTIONS.iter().map(|c| (*c).to_string()).collect(),
        }
    }
}

impl From<&PullConfig> for PullSettings {
    fn from(config: &PullConfig) -> Self {
        Self {
            base_interval: config.base_interval(),
            min_interval: config.min_interval(),
            max_interval: config.max_interval(),
            collections: config.collections.clone(),
        }
    }
}

/// Adaptive pull timing.
///
/// The interval shrinks while the user keeps changing data and relaxes when
/// they stop. Only data mutations count; passive UI events are ignored.
#[derive(Debug, Clone)]
pub struct PullCadence {
    interval: Duration,
    min: Duration,
    max: Duration,
    next_fire: Instant,
    mutated_since_pull: bool,
}

impl PullCadence {
    /// First pull fires one base interval after `now`.
    pub fn new(settings: &PullSettings, now: Instant) -> Self {
        let min = settings.min_interval;
        let max = settings.max_interval.max(min);
        let interval = settings.base_interval.clamp(min, max);
        Self { interval, min, max, next_fire: now + interval, mutated_since_pull: false }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_fire(&self) -> Instant {
        self.next_fire
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next_fire
    }

    /// Feed a user event. Returns true if the next fire time moved.
    pub fn record_activity(&mut self, event: ActivityEvent, now: Instant) -> bool {
        if !event.is_data_mutation() {
            return false;
        }

        self.mutated_since_pull = true;
        let soonest = now + self.min;
        if soonest < self.next_fire {
            self.next_fire = soonest;
            return true;
        }
        false
    }

    /// Push the next fire one interval past `now` without adapting it.
    ///
    /// For pulls that were skipped, e.g. while offline.
    pub fn postpone(&mut self, now: Instant) {
        self.next_fire = now + self.interval;
    }

    /// Adapt the interval after a pull finished at `now`.
    pub fn pull_completed(&mut self, now: Instant) {
        let next = if self.mutated_since_pull {
            self.interval / 2
        } else {
            self.interval.mul_f64(1.5)
        };
        self.interval = next.clamp(self.min, self.max);
        self.mutated_since_pull = false;
        self.next_fire = now + self.interval;
    }
}

/// Counts from one pull.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PullReport {
    /// Collections fetched and merged
    pub collections: usize,
    pub merged: usize,
    pub removed: usize,
    /// Remote documents left alone because a local change is still queued
    pub skipped_pending: usize,
    /// Collections whose fetch or merge failed
    pub failed: usize,
    pub quota_exceeded: bool,
    /// Another pull was in flight; nothing was done
    pub already_running: bool,
}

/// Fetches remote documents per collection and merges them locally.
pub struct PullService {
    remote: Arc<dyn RemoteStore>,
    local: Arc<dyn LocalRecordStore>,
    queue: Arc<dyn SyncQueue>,
    clock: Arc<dyn Clock>,
    collections: Vec<String>,
    running: AtomicBool,
}

impl PullService {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        local: Arc<dyn LocalRecordStore>,
        queue: Arc<dyn SyncQueue>,
        clock: Arc<dyn Clock>,
        collections: Vec<String>,
    ) -> Self {
        Self { remote, local, queue, clock, collections, running: AtomicBool::new(false) }
    }

    pub fn collections(&self) -> &[String] {
        &self.collections
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Pull every configured collection for `user_id`.
    #[instrument(skip(self))]
    pub async fn pull_once(&self, user_id: &str) -> PullReport {
        if self.running.swap(true, Ordering::SeqCst) {
            debug!("Pull already in progress, skipping");
            return PullReport { already_running: true, ..PullReport::default() };
        }

        let report = self.pull_all(user_id).await;
        self.running.store(false, Ordering::SeqCst);

        info!(
            collections = report.collections,
            merged = report.merged,
            removed = report.removed,
            skipped_pending = report.skipped_pending,
            failed = report.failed,
            quota_exceeded = report.quota_exceeded,
            "Pull finished"
        );
        report
    }

    async fn pull_all(&self, user_id: &str) -> PullReport {
        let mut report = PullReport::default();

        let pending = match self.queue.list_unsynced(user_id).await {
            Ok(items) => items,
            Err(err) => {
                // Merging without the pending set could overwrite unsent edits.
                warn!(error = %err, "Failed to read sync queue, skipping pull");
                report.failed = self.collections.len();
                return report;
            }
        };

        let filter = QueryFilter::owned_by(user_id);
        for collection in &self.collections {
            let skip: Vec<String> = pending
                .iter()
                .filter(|item| &item.collection_name == collection)
                .map(|item| item.doc_id.clone())
                .collect::<HashSet<_>>()
                .into_iter()
                .collect();

            let records = match self.remote.query_all(collection, Some(&filter)).await {
                Ok(records) => records,
                Err(err) => {
                    warn!(collection = %collection, kind = %err.kind, error = %err.message, "Remote query failed");
                    report.failed += 1;
                    if err.is_quota_exceeded() {
                        report.quota_exceeded = true;
                        break;
                    }
                    continue;
                }
            };

            let merged_at = self.clock.millis_since_epoch();
            match self.local.merge_remote(collection, user_id, &records, &skip, merged_at).await {
                Ok(stats) => {
                    debug!(
                        collection = %collection,
                        merged = stats.merged,
                        removed = stats.removed,
                        skipped = stats.skipped,
                        "Merged remote snapshot"
                    );
                    report.collections += 1;
                    report.merged += stats.merged;
                    report.removed += stats.removed;
                    report.skipped_pending += stats.skipped;
                }
                Err(err) => {
                    warn!(collection = %collection, error = %err, "Failed to merge remote snapshot");
                    report.failed += 1;
                }
            }
        }

        report
    }
}

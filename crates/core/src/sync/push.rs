//! Push worker - drains a user's sync queue into the remote store.
//!
//! One call to [`PushWorker::run_pass`] is one pass:
//!
//! 1. Enter `Running` through the shared [`ProgressReporter`]; a trigger that
//!    finds a pass in flight returns `{0, 0}` immediately.
//! 2. Read the user's unsynced items (oldest first). A read failure records
//!    `last_error` and ends the pass.
//! 3. Apply items one at a time, pausing `item_delay` after each success.
//!    Successful items are marked synced and removed; failures bump the
//!    item's attempt counter and stay queued.
//! 4. A quota failure or the pass ceiling stops the loop early. Everything
//!    not yet attempted waits for the next pass.
//!
//! Scheduling lives in the infrastructure crate; this type only knows how
//! to run a single pass.

use std::sync::Arc;
use std::time::Duration;

use partspro_common::time::Clock;
use partspro_domain::constants::{DEFAULT_ITEM_DELAY_MS, DEFAULT_MAX_PASS_SECS, MAX_QUEUE_ERROR_LEN};
use partspro_domain::{
    PassOutcome, PassStop, PushConfig, RemoteErrorKind, RemoteStoreError, SyncAction,
    SyncQueueItem,
};
use serde_json::{Map, Value};
use tracing::{debug, error, info, instrument, warn};

use super::ports::{RemoteResult, RemoteStore, SyncQueue};
use super::progress::ProgressReporter;

/// Throttling and time limits for a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushSettings {
    /// Pause after each successfully applied item
    pub item_delay: Duration,
    /// Ceiling on the duration of a single pass
    pub max_pass: Duration,
}

impl Default for PushSettings {
    fn default() -> Self {
        Self {
            item_delay: Duration::from_millis(DEFAULT_ITEM_DELAY_MS),
            max_pass: Duration::from_secs(DEFAULT_MAX_PASS_SECS),
        }
    }
}

impl From<&PushConfig> for PushSettings {
    fn from(config: &PushConfig) -> Self {
        Self { item_delay: config.item_delay(), max_pass: config.max_pass() }
    }
}

/// Applies queued mutations to a remote store.
pub struct PushWorker {
    queue: Arc<dyn SyncQueue>,
    remote: Arc<dyn RemoteStore>,
    progress: Arc<ProgressReporter>,
    clock: Arc<dyn Clock>,
    settings: PushSettings,
}

impl PushWorker {
    pub fn new(
        queue: Arc<dyn SyncQueue>,
        remote: Arc<dyn RemoteStore>,
        progress: Arc<ProgressReporter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { queue, remote, progress, clock, settings: PushSettings::default() }
    }

    pub fn with_settings(mut self, settings: PushSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn progress(&self) -> &Arc<ProgressReporter> {
        &self.progress
    }

    pub fn settings(&self) -> PushSettings {
        self.settings
    }

    /// Run one pass over `user_id`'s queue.
    #[instrument(skip(self))]
    pub async fn run_pass(&self, user_id: &str) -> PassOutcome {
        let started_at = self.clock.now();
        if !self.progress.try_begin(started_at) {
            debug!("Sync pass already in progress, skipping trigger");
            return PassOutcome::skipped();
        }

        let items = match self.queue.list_unsynced(user_id).await {
            Ok(items) => items,
            Err(err) => {
                error!(error = %err, "Failed to read sync queue");
                self.progress.record_error(&err.to_string());
                self.progress.finish();
                return PassOutcome::new(0, 0, PassStop::QueueUnavailable);
            }
        };

        self.progress.set_total(items.len());
        if items.is_empty() {
            debug!("No pending items to sync");
            self.progress.finish();
            return PassOutcome::new(0, 0, PassStop::Empty);
        }

        info!(count = items.len(), "Starting sync pass");

        let mut success = 0_usize;
        let mut failed = 0_usize;
        let mut stop = PassStop::Drained;

        for item in &items {
            let elapsed = self.clock.now().saturating_duration_since(started_at);
            if elapsed > self.settings.max_pass {
                warn!(
                    elapsed_secs = elapsed.as_secs(),
                    remaining = items.len() - success - failed,
                    "Sync pass exceeded its time ceiling, stopping early"
                );
                stop = PassStop::DeadlineReached;
                break;
            }

            match self.apply(item).await {
                Ok(()) => {
                    success += 1;
                    self.clean_up(item).await;
                    self.progress.record_success();
                    if !self.settings.item_delay.is_zero() {
                        tokio::time::sleep(self.settings.item_delay).await;
                    }
                }
                Err(err) => {
                    failed += 1;
                    warn!(
                        item_id = %item.id,
                        collection = %item.collection_name,
                        doc_id = %item.doc_id,
                        action = %item.action,
                        kind = %err.kind,
                        error = %err.message,
                        "Failed to sync item"
                    );
                    let reason = truncate_reason(&err.to_string());
                    if let Err(mark_err) = self.queue.record_failure(&item.id, &reason).await {
                        warn!(item_id = %item.id, error = %mark_err, "record_failure failed");
                    }
                    self.progress.record_failure(&err.to_string());

                    if err.is_quota_exceeded() {
                        warn!("Remote quota exceeded, deferring remaining items to the next pass");
                        stop = PassStop::QuotaExceeded;
                        break;
                    }
                }
            }
        }

        self.progress.finish();
        info!(success, failed, stop = %stop, "Sync pass finished");

        PassOutcome::new(success, failed, stop)
    }

    async fn apply(&self, item: &SyncQueueItem) -> RemoteResult<()> {
        let now = self.clock.millis_since_epoch();
        let collection = item.collection_name.as_str();

        match item.action {
            SyncAction::Create => {
                let payload = create_payload(&item.data, &item.user_id, now);
                let doc_id = self.remote.insert(collection, &item.doc_id, &payload).await?;
                debug!(item_id = %item.id, doc_id = %doc_id, "Created remote document");
                Ok(())
            }
            SyncAction::Update => {
                let payload = update_payload(&item.data, now);
                self.remote.partial_update(collection, &item.doc_id, &payload).await
            }
            SyncAction::Delete => match self.remote.remove(collection, &item.doc_id).await {
                Err(RemoteStoreError { kind: RemoteErrorKind::NotFound, .. }) => {
                    debug!(item_id = %item.id, "Remote document already absent");
                    Ok(())
                }
                other => other,
            },
        }
    }

    /// Queue bookkeeping after a confirmed remote write. Failures are logged
    /// only; the item may be resent by a later pass.
    async fn clean_up(&self, item: &SyncQueueItem) {
        if let Err(err) = self.queue.mark_synced(&item.id).await {
            warn!(item_id = %item.id, error = %err, "mark_synced failed after remote write");
        }
        if let Err(err) = self.queue.remove(&item.id).await {
            warn!(item_id = %item.id, error = %err, "Failed to remove synced item from queue");
        }
    }
}

fn object_fields(data: &Value) -> Map<String, Value> {
    match data {
        Value::Object(fields) => fields.clone(),
        Value::Null => Map::new(),
        other => {
            let mut fields = Map::new();
            fields.insert("value".to_string(), other.clone());
            fields
        }
    }
}

fn create_payload(data: &Value, user_id: &str, now: i64) -> Value {
    let mut fields = object_fields(data);
    fields.insert("userId".to_string(), Value::from(user_id));
    fields.insert("createdAt".to_string(), Value::from(now));
    fields.insert("updatedAt".to_string(), Value::from(now));
    Value::Object(fields)
}

fn update_payload(data: &Value, now: i64) -> Value {
    let mut fields = object_fields(data);
    fields.insert("updatedAt".to_string(), Value::from(now));
    Value::Object(fields)
}

fn truncate_reason(reason: &str) -> String {
    if reason.len() <= MAX_QUEUE_ERROR_LEN {
        return reason.to_string();
    }

    let mut truncated =
        reason.chars().take(MAX_QUEUE_ERROR_LEN.saturating_sub(3)).collect::<String>();
    truncated.push_str("...");
    truncated
}

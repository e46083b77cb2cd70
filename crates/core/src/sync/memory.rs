//! In-memory adapters for the sync ports.
//!
//! Used by unit tests and by hosts that run without a database. Failure
//! switches let tests drive the error paths of the services.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use partspro_domain::{
    ActivityEvent, LocalRecord, MergeStats, PartsProError, RemoteRecord, Result, SyncQueueItem,
};

use super::ports::{ActivitySink, LocalRecordStore, SyncQueue};

/// Vector-backed [`SyncQueue`]. Insertion order breaks timestamp ties.
#[derive(Debug, Default)]
pub struct MemorySyncQueue {
    items: Mutex<Vec<SyncQueueItem>>,
    fail_enqueue: AtomicBool,
    fail_list: AtomicBool,
    fail_mark_synced: AtomicBool,
    fail_remove: AtomicBool,
}

impl MemorySyncQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fail_enqueue(self) -> Self {
        self.set_fail_enqueue(true);
        self
    }

    pub fn with_fail_list(self) -> Self {
        self.set_fail_list(true);
        self
    }

    pub fn with_fail_mark_synced(self) -> Self {
        self.fail_mark_synced.store(true, Ordering::SeqCst);
        self
    }

    pub fn with_fail_remove(self) -> Self {
        self.fail_remove.store(true, Ordering::SeqCst);
        self
    }

    /// Toggle `enqueue` failures at runtime.
    pub fn set_fail_enqueue(&self, fail: bool) {
        self.fail_enqueue.store(fail, Ordering::SeqCst);
    }

    /// Toggle `list_unsynced` failures at runtime.
    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Every item, synced or not, in insertion order.
    pub fn items(&self) -> Vec<SyncQueueItem> {
        self.items.lock().clone()
    }

    pub fn get(&self, item_id: &str) -> Option<SyncQueueItem> {
        self.items.lock().iter().find(|item| item.id == item_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    fn check(flag: &AtomicBool, operation: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(PartsProError::Database(format!("simulated {operation} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl SyncQueue for MemorySyncQueue {
    async fn enqueue(&self, item: &SyncQueueItem) -> Result<()> {
        Self::check(&self.fail_enqueue, "enqueue")?;
        self.items.lock().push(item.clone());
        Ok(())
    }

    async fn list_unsynced(&self, user_id: &str) -> Result<Vec<SyncQueueItem>> {
        Self::check(&self.fail_list, "list_unsynced")?;
        let mut pending: Vec<SyncQueueItem> = self
            .items
            .lock()
            .iter()
            .filter(|item| item.user_id == user_id && !item.synced)
            .cloned()
            .collect();
        // stable: equal timestamps stay in insertion order
        pending.sort_by_key(|item| item.timestamp);
        Ok(pending)
    }

    async fn mark_synced(&self, item_id: &str) -> Result<()> {
        Self::check(&self.fail_mark_synced, "mark_synced")?;
        if let Some(item) = self.items.lock().iter_mut().find(|item| item.id == item_id) {
            item.synced = true;
        }
        Ok(())
    }

    async fn remove(&self, item_id: &str) -> Result<()> {
        Self::check(&self.fail_remove, "remove")?;
        self.items.lock().retain(|item| item.id != item_id);
        Ok(())
    }

    async fn record_failure(&self, item_id: &str, error: &str) -> Result<()> {
        if let Some(item) = self.items.lock().iter_mut().find(|item| item.id == item_id) {
            item.attempts += 1;
            item.last_error = Some(error.to_string());
        }
        Ok(())
    }
}

type RecordKey = (String, String);

/// Map-backed [`LocalRecordStore`] keyed by `(collection, doc_id)`.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<BTreeMap<RecordKey, LocalRecord>>,
    fail_writes: AtomicBool,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fail_writes(self) -> Self {
        self.fail_writes.store(true, Ordering::SeqCst);
        self
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(PartsProError::Database("simulated write failure".into()));
        }
        Ok(())
    }

    fn key(collection: &str, doc_id: &str) -> RecordKey {
        (collection.to_string(), doc_id.to_string())
    }
}

#[async_trait]
impl LocalRecordStore for MemoryRecordStore {
    async fn upsert_record(&self, record: &LocalRecord) -> Result<()> {
        self.check_writable()?;
        self.records
            .lock()
            .insert(Self::key(&record.collection, &record.doc_id), record.clone());
        Ok(())
    }

    async fn delete_record(&self, collection: &str, doc_id: &str) -> Result<()> {
        self.check_writable()?;
        self.records.lock().remove(&Self::key(collection, doc_id));
        Ok(())
    }

    async fn get_record(&self, collection: &str, doc_id: &str) -> Result<Option<LocalRecord>> {
        Ok(self.records.lock().get(&Self::key(collection, doc_id)).cloned())
    }

    async fn list_records(&self, collection: &str, user_id: &str) -> Result<Vec<LocalRecord>> {
        Ok(self
            .records
            .lock()
            .values()
            .filter(|record| record.collection == collection && record.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_batch(&self, records: &[LocalRecord]) -> Result<usize> {
        self.check_writable()?;
        let mut map = self.records.lock();
        for record in records {
            map.insert(Self::key(&record.collection, &record.doc_id), record.clone());
        }
        Ok(records.len())
    }

    async fn merge_remote(
        &self,
        collection: &str,
        user_id: &str,
        records: &[RemoteRecord],
        skip_doc_ids: &[String],
        merged_at: i64,
    ) -> Result<MergeStats> {
        self.check_writable()?;
        let skip: HashSet<&str> = skip_doc_ids.iter().map(String::as_str).collect();
        let remote_ids: HashSet<&str> = records.iter().map(|record| record.id.as_str()).collect();
        let mut stats = MergeStats::default();
        let mut map = self.records.lock();

        for record in records {
            if skip.contains(record.id.as_str()) {
                stats.skipped += 1;
                continue;
            }
            map.insert(
                Self::key(collection, &record.id),
                LocalRecord::new(collection, &record.id, user_id, record.data(), merged_at),
            );
            stats.merged += 1;
        }

        let stale: Vec<RecordKey> = map
            .iter()
            .filter(|(_, local)| {
                local.collection == collection
                    && local.user_id == user_id
                    && !remote_ids.contains(local.doc_id.as_str())
                    && !skip.contains(local.doc_id.as_str())
            })
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            map.remove(&key);
            stats.removed += 1;
        }

        Ok(stats)
    }
}

/// [`ActivitySink`] that keeps every event it receives.
#[derive(Debug, Default)]
pub struct RecordingActivitySink {
    events: Mutex<Vec<ActivityEvent>>,
}

impl RecordingActivitySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events.lock().clone()
    }
}

impl ActivitySink for RecordingActivitySink {
    fn record(&self, event: ActivityEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map, Value};

    use super::*;
    use partspro_domain::SyncAction;

    fn item(timestamp: i64, user: &str) -> SyncQueueItem {
        SyncQueueItem::pending("products", "p", SyncAction::Update, json!({}), user, timestamp)
    }

    #[tokio::test]
    async fn list_orders_by_timestamp() {
        let queue = MemorySyncQueue::new();
        for ts in [3, 1, 2] {
            queue.enqueue(&item(ts, "u1")).await.unwrap();
        }

        let timestamps: Vec<i64> =
            queue.list_unsynced("u1").await.unwrap().iter().map(|i| i.timestamp).collect();

        assert_eq!(timestamps, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn mark_synced_twice_matches_once() {
        let queue = MemorySyncQueue::new();
        let pending = item(1, "u1");
        queue.enqueue(&pending).await.unwrap();

        queue.mark_synced(&pending.id).await.unwrap();
        let once = queue.items();
        queue.mark_synced(&pending.id).await.unwrap();

        assert_eq!(queue.items(), once);
        assert!(queue.list_unsynced("u1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn record_failure_accumulates_attempts() {
        let queue = MemorySyncQueue::new();
        let pending = item(1, "u1");
        queue.enqueue(&pending).await.unwrap();

        queue.record_failure(&pending.id, "first").await.unwrap();
        queue.record_failure(&pending.id, "second").await.unwrap();

        let stored = queue.get(&pending.id).unwrap();
        assert_eq!(stored.attempts, 2);
        assert_eq!(stored.last_error.as_deref(), Some("second"));
    }

    fn remote(id: &str, name: &str) -> RemoteRecord {
        let mut fields = Map::new();
        fields.insert("name".into(), Value::from(name));
        RemoteRecord::new(id, fields)
    }

    #[tokio::test]
    async fn merge_keeps_pending_documents_and_drops_stale_ones() {
        let store = MemoryRecordStore::new();
        store
            .insert_batch(&[
                LocalRecord::new("products", "edited", "u1", json!({ "name": "local" }), 1),
                LocalRecord::new("products", "gone", "u1", json!({ "name": "old" }), 1),
                LocalRecord::new("products", "other-user", "u2", json!({}), 1),
            ])
            .await
            .unwrap();

        let stats = store
            .merge_remote(
                "products",
                "u1",
                &[remote("edited", "remote"), remote("new", "fresh")],
                &["edited".to_string()],
                50,
            )
            .await
            .unwrap();

        assert_eq!(stats, MergeStats { merged: 1, removed: 1, skipped: 1 });
        let edited = store.get_record("products", "edited").await.unwrap().unwrap();
        assert_eq!(edited.data["name"], "local");
        assert!(store.get_record("products", "gone").await.unwrap().is_none());
        assert_eq!(store.get_record("products", "new").await.unwrap().unwrap().updated_at, 50);
        assert!(store.get_record("products", "other-user").await.unwrap().is_some());
    }
}

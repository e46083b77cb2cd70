//! Write path used by the application shell.
//!
//! Every mutation lands in the local store first, then in the sync queue,
//! then is reported as activity so the pull cadence tightens. If the queue
//! write fails the local change is undone, so a later pull cannot drop or
//! revert an edit that was never going to be pushed.

use std::sync::Arc;

use partspro_common::time::Clock;
use partspro_domain::{
    new_client_id, ActivityEvent, LocalRecord, MutationKind, PartsProError, Result, SyncAction,
};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::ports::{ActivitySink, LocalRecordStore, SyncQueue};
use super::queue::QueueManager;

pub struct MutationService {
    local: Arc<dyn LocalRecordStore>,
    queue: QueueManager,
    activity: Arc<dyn ActivitySink>,
    clock: Arc<dyn Clock>,
}

impl MutationService {
    pub fn new(
        local: Arc<dyn LocalRecordStore>,
        queue: Arc<dyn SyncQueue>,
        activity: Arc<dyn ActivitySink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self { local, queue: QueueManager::new(queue, Arc::clone(&clock)), activity, clock }
    }

    /// Create a document and return its client-generated id.
    #[instrument(skip(self, data))]
    pub async fn create(&self, collection: &str, data: Value, user_id: &str) -> Result<String> {
        let doc_id = new_client_id();
        let record = LocalRecord::new(
            collection,
            doc_id.as_str(),
            user_id,
            data.clone(),
            self.clock.millis_since_epoch(),
        );
        self.local.upsert_record(&record).await?;
        if let Err(err) =
            self.queue.enqueue(collection, &doc_id, SyncAction::Create, data, user_id).await
        {
            self.restore(collection, &doc_id, None).await;
            return Err(err);
        }
        self.activity.record(ActivityEvent::DataMutation(MutationKind::Add));

        debug!(doc_id = %doc_id, "Created document");
        Ok(doc_id)
    }

    /// Merge `data` into a document. Only the changed fields are queued.
    #[instrument(skip(self, data))]
    pub async fn update(
        &self,
        collection: &str,
        doc_id: &str,
        data: Value,
        user_id: &str,
    ) -> Result<()> {
        if doc_id.trim().is_empty() {
            return Err(PartsProError::InvalidInput("update requires a document id".into()));
        }

        let previous = self.local.get_record(collection, doc_id).await?;
        let merged = match &previous {
            Some(existing) => merge_fields(existing.data.clone(), &data),
            None => data.clone(),
        };
        let record =
            LocalRecord::new(collection, doc_id, user_id, merged, self.clock.millis_since_epoch());
        self.local.upsert_record(&record).await?;
        if let Err(err) =
            self.queue.enqueue(collection, doc_id, SyncAction::Update, data, user_id).await
        {
            self.restore(collection, doc_id, previous).await;
            return Err(err);
        }
        self.activity.record(ActivityEvent::DataMutation(MutationKind::Edit));
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, collection: &str, doc_id: &str, user_id: &str) -> Result<()> {
        if doc_id.trim().is_empty() {
            return Err(PartsProError::InvalidInput("delete requires a document id".into()));
        }

        let previous = self.local.get_record(collection, doc_id).await?;
        self.local.delete_record(collection, doc_id).await?;
        if let Err(err) =
            self.queue.enqueue(collection, doc_id, SyncAction::Delete, Value::Null, user_id).await
        {
            self.restore(collection, doc_id, previous).await;
            return Err(err);
        }
        self.activity.record(ActivityEvent::DataMutation(MutationKind::Delete));
        Ok(())
    }

    /// Put the local copy back to `previous` after a failed enqueue.
    async fn restore(&self, collection: &str, doc_id: &str, previous: Option<LocalRecord>) {
        let result = match &previous {
            Some(record) => self.local.upsert_record(record).await,
            None => self.local.delete_record(collection, doc_id).await,
        };
        match result {
            Ok(()) => debug!(doc_id = %doc_id, "Local change rolled back after queue failure"),
            Err(err) => warn!(doc_id = %doc_id, error = %err, "Failed to roll back local change"),
        }
    }
}

fn merge_fields(existing: Value, changes: &Value) -> Value {
    match (existing, changes) {
        (Value::Object(mut fields), Value::Object(updates)) => {
            for (key, value) in updates {
                fields.insert(key.clone(), value.clone());
            }
            Value::Object(fields)
        }
        (_, changes) => changes.clone(),
    }
}

#[cfg(test)]
mod tests {
    use partspro_common::time::MockClock;
    use serde_json::json;

    use super::*;
    use crate::sync::memory::{MemoryRecordStore, MemorySyncQueue, RecordingActivitySink};

    struct Fixture {
        service: MutationService,
        local: Arc<MemoryRecordStore>,
        queue: Arc<MemorySyncQueue>,
        activity: Arc<RecordingActivitySink>,
    }

    fn fixture(queue: MemorySyncQueue) -> Fixture {
        let local = Arc::new(MemoryRecordStore::new());
        let queue = Arc::new(queue);
        let activity = Arc::new(RecordingActivitySink::new());
        let service = MutationService::new(
            local.clone(),
            queue.clone(),
            activity.clone(),
            Arc::new(MockClock::at_epoch_millis(5_000)),
        );
        Fixture { service, local, queue, activity }
    }

    #[tokio::test]
    async fn create_writes_locally_queues_and_reports() {
        let f = fixture(MemorySyncQueue::new());

        let doc_id =
            f.service.create("products", json!({ "name": "Spark plug" }), "u1").await.unwrap();

        let record = f.local.get_record("products", &doc_id).await.unwrap().unwrap();
        assert_eq!(record.updated_at, 5_000);
        let items = f.queue.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].doc_id, doc_id);
        assert_eq!(items[0].action, SyncAction::Create);
        assert_eq!(f.activity.events(), vec![ActivityEvent::DataMutation(MutationKind::Add)]);
    }

    #[tokio::test]
    async fn update_merges_local_record_but_queues_only_changes() {
        let f = fixture(MemorySyncQueue::new());
        let doc_id = f
            .service
            .create("products", json!({ "name": "Belt", "stock": 4 }), "u1")
            .await
            .unwrap();

        f.service.update("products", &doc_id, json!({ "stock": 3 }), "u1").await.unwrap();

        let record = f.local.get_record("products", &doc_id).await.unwrap().unwrap();
        assert_eq!(record.data, json!({ "name": "Belt", "stock": 3 }));
        assert_eq!(f.queue.items()[1].data, json!({ "stock": 3 }));
        assert_eq!(
            f.activity.events().last(),
            Some(&ActivityEvent::DataMutation(MutationKind::Edit))
        );
    }

    #[tokio::test]
    async fn delete_removes_locally_and_queues() {
        let f = fixture(MemorySyncQueue::new());
        let doc_id = f.service.create("sales", json!({ "total": 10 }), "u1").await.unwrap();

        f.service.delete("sales", &doc_id, "u1").await.unwrap();

        assert!(f.local.get_record("sales", &doc_id).await.unwrap().is_none());
        assert_eq!(f.queue.items()[1].action, SyncAction::Delete);
        assert_eq!(f.activity.events().len(), 2);
    }

    #[tokio::test]
    async fn queue_failure_propagates_without_reporting_activity() {
        let f = fixture(MemorySyncQueue::new().with_fail_enqueue());

        let result = f.service.create("products", json!({}), "u1").await;

        assert!(matches!(result, Err(PartsProError::Database(_))));
        assert!(f.activity.events().is_empty());
    }

    #[tokio::test]
    async fn failed_create_leaves_no_local_record() {
        let f = fixture(MemorySyncQueue::new().with_fail_enqueue());

        f.service.create("products", json!({ "name": "Pulley" }), "u1").await.unwrap_err();

        assert!(f.local.is_empty());
        assert!(f.queue.is_empty());
    }

    #[tokio::test]
    async fn failed_update_restores_previous_fields() {
        let f = fixture(MemorySyncQueue::new());
        let doc_id =
            f.service.create("products", json!({ "name": "Belt", "stock": 4 }), "u1").await.unwrap();
        f.queue.set_fail_enqueue(true);

        let result = f.service.update("products", &doc_id, json!({ "stock": 0 }), "u1").await;

        assert!(matches!(result, Err(PartsProError::Database(_))));
        let record = f.local.get_record("products", &doc_id).await.unwrap().unwrap();
        assert_eq!(record.data, json!({ "name": "Belt", "stock": 4 }));
        assert_eq!(f.queue.len(), 1);
        assert_eq!(f.activity.events().len(), 1);
    }

    #[tokio::test]
    async fn failed_update_of_unknown_document_removes_it_again() {
        let f = fixture(MemorySyncQueue::new().with_fail_enqueue());

        f.service.update("products", "p-9", json!({ "stock": 1 }), "u1").await.unwrap_err();

        assert!(f.local.get_record("products", "p-9").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_delete_brings_the_record_back() {
        let f = fixture(MemorySyncQueue::new());
        let doc_id = f.service.create("sales", json!({ "total": 10 }), "u1").await.unwrap();
        f.queue.set_fail_enqueue(true);

        f.service.delete("sales", &doc_id, "u1").await.unwrap_err();

        let record = f.local.get_record("sales", &doc_id).await.unwrap().unwrap();
        assert_eq!(record.data, json!({ "total": 10 }));
        assert_eq!(f.queue.items()[0].action, SyncAction::Create);
    }

    #[tokio::test]
    async fn update_requires_document_id() {
        let f = fixture(MemorySyncQueue::new());

        let result = f.service.update("products", "", json!({}), "u1").await;

        assert!(matches!(result, Err(PartsProError::InvalidInput(_))));
        assert!(f.local.is_empty());
    }
}

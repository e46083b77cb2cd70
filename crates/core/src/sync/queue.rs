//! Sync queue manager - enqueue and bookkeeping over the [`SyncQueue`] port

use std::sync::Arc;

use partspro_common::time::Clock;
use partspro_domain::{new_client_id, PartsProError, Result, SyncAction, SyncQueueItem};
use serde_json::Value;
use tracing::debug;

use super::ports::SyncQueue;

/// Front door for writing to and maintaining the sync queue.
pub struct QueueManager {
    queue: Arc<dyn SyncQueue>,
    clock: Arc<dyn Clock>,
}

impl QueueManager {
    pub fn new(queue: Arc<dyn SyncQueue>, clock: Arc<dyn Clock>) -> Self {
        Self { queue, clock }
    }

    /// Underlying queue port.
    pub fn queue(&self) -> &Arc<dyn SyncQueue> {
        &self.queue
    }

    /// Append a pending mutation and return the new item id.
    ///
    /// A create with an empty `doc_id` gets a client-generated id so the
    /// remote write can be retried without duplicating the document.
    ///
    /// # Errors
    /// `InvalidInput` for a missing collection or user, or an update/delete
    /// without a document id. Storage failures are returned unchanged.
    pub async fn enqueue(
        &self,
        collection_name: &str,
        doc_id: &str,
        action: SyncAction,
        data: Value,
        user_id: &str,
    ) -> Result<String> {
        let item = self.build_item(collection_name, doc_id, action, data, user_id)?;
        self.queue.enqueue(&item).await?;
        debug!(
            item_id = %item.id,
            collection = %item.collection_name,
            doc_id = %item.doc_id,
            action = %item.action,
            "Queued mutation"
        );
        Ok(item.id)
    }

    pub async fn list_unsynced(&self, user_id: &str) -> Result<Vec<SyncQueueItem>> {
        self.queue.list_unsynced(user_id).await
    }

    pub async fn mark_synced(&self, item_id: &str) -> Result<()> {
        self.queue.mark_synced(item_id).await
    }

    pub async fn remove(&self, item_id: &str) -> Result<()> {
        self.queue.remove(item_id).await
    }

    pub async fn record_failure(&self, item_id: &str, error: &str) -> Result<()> {
        self.queue.record_failure(item_id, error).await
    }

    /// Number of unsynced items for a user.
    pub async fn pending_count(&self, user_id: &str) -> Result<usize> {
        Ok(self.queue.list_unsynced(user_id).await?.len())
    }

    fn build_item(
        &self,
        collection_name: &str,
        doc_id: &str,
        action: SyncAction,
        data: Value,
        user_id: &str,
    ) -> Result<SyncQueueItem> {
        if collection_name.trim().is_empty() {
            return Err(PartsProError::InvalidInput("collection name is required".into()));
        }
        if user_id.trim().is_empty() {
            return Err(PartsProError::InvalidInput("user id is required".into()));
        }

        let doc_id = match (action, doc_id.trim().is_empty()) {
            (SyncAction::Create, true) => new_client_id(),
            (_, true) => {
                return Err(PartsProError::InvalidInput(format!(
                    "{action} on {collection_name} requires a document id"
                )))
            }
            (_, false) => doc_id.to_string(),
        };

        Ok(SyncQueueItem::pending(
            collection_name,
            doc_id,
            action,
            data,
            user_id,
            self.clock.millis_since_epoch(),
        ))
    }
}

//! In-process remote store used by tests and the demo binary.

use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use partspro_core::{RemoteResult, RemoteStore};
use partspro_domain::{QueryFilter, RemoteErrorKind, RemoteRecord, RemoteStoreError};
use serde_json::{Map, Value};

type Documents = BTreeMap<String, BTreeMap<String, Map<String, Value>>>;

/// Document map keyed by collection then id.
///
/// Failures can be scripted: queued failures are returned by the next
/// calls in order; a sticky failure is returned by every call until
/// cleared.
#[derive(Debug, Default)]
pub struct MemoryRemoteStore {
    documents: Mutex<Documents>,
    queued_failures: Mutex<VecDeque<RemoteStoreError>>,
    sticky_failure: Mutex<Option<RemoteStoreError>>,
    writes: AtomicUsize,
    queries: AtomicUsize,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a document in place without counting it as a write.
    pub fn seed(&self, collection: &str, doc_id: &str, fields: Value) {
        self.documents
            .lock()
            .entry(collection.to_string())
            .or_default()
            .insert(doc_id.to_string(), into_fields(fields));
    }

    pub fn get(&self, collection: &str, doc_id: &str) -> Option<Value> {
        self.documents
            .lock()
            .get(collection)
            .and_then(|docs| docs.get(doc_id))
            .map(|fields| Value::Object(fields.clone()))
    }

    /// Number of documents stored in `collection`.
    pub fn count(&self, collection: &str) -> usize {
        self.documents.lock().get(collection).map_or(0, BTreeMap::len)
    }

    /// Fail the next call with `kind`.
    pub fn fail_next(&self, kind: RemoteErrorKind, message: impl Into<String>) {
        self.queued_failures.lock().push_back(RemoteStoreError::new(kind, message));
    }

    /// Fail every call with `kind` until [`Self::clear_failures`].
    pub fn fail_always(&self, kind: RemoteErrorKind, message: impl Into<String>) {
        *self.sticky_failure.lock() = Some(RemoteStoreError::new(kind, message));
    }

    pub fn clear_failures(&self) {
        self.queued_failures.lock().clear();
        *self.sticky_failure.lock() = None;
    }

    /// Successful insert/update/remove calls so far.
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Successful `query_all` calls so far.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    fn injected_failure(&self) -> RemoteResult<()> {
        if let Some(err) = self.queued_failures.lock().pop_front() {
            return Err(err);
        }
        match self.sticky_failure.lock().as_ref() {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn insert(
        &self,
        collection: &str,
        client_id: &str,
        payload: &Value,
    ) -> RemoteResult<String> {
        self.injected_failure()?;
        self.documents
            .lock()
            .entry(collection.to_string())
            .or_default()
            .insert(client_id.to_string(), into_fields(payload.clone()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(client_id.to_string())
    }

    async fn partial_update(
        &self,
        collection: &str,
        doc_id: &str,
        payload: &Value,
    ) -> RemoteResult<()> {
        self.injected_failure()?;
        let mut documents = self.documents.lock();
        let existing = documents
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(doc_id))
            .ok_or_else(|| RemoteStoreError::not_found(format!("{collection}/{doc_id}")))?;
        existing.extend(into_fields(payload.clone()));
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self, collection: &str, doc_id: &str) -> RemoteResult<()> {
        self.injected_failure()?;
        self.documents
            .lock()
            .get_mut(collection)
            .and_then(|docs| docs.remove(doc_id))
            .ok_or_else(|| RemoteStoreError::not_found(format!("{collection}/{doc_id}")))?;
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn query_all(
        &self,
        collection: &str,
        filter: Option<&QueryFilter>,
    ) -> RemoteResult<Vec<RemoteRecord>> {
        self.injected_failure()?;
        let records = self
            .documents
            .lock()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|(_, fields)| filter.map_or(true, |f| f.matches(fields)))
                    .map(|(id, fields)| RemoteRecord::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default();
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(records)
    }
}

fn into_fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(fields) => fields,
        Value::Null => Map::new(),
        other => {
            let mut fields = Map::new();
            fields.insert("value".to_string(), other);
            fields
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn insert_update_remove_cycle() {
        let store = MemoryRemoteStore::new();

        store.insert("products", "p-1", &json!({ "stock": 1, "name": "Pad" })).await.unwrap();
        store.partial_update("products", "p-1", &json!({ "stock": 2 })).await.unwrap();

        assert_eq!(store.get("products", "p-1"), Some(json!({ "stock": 2, "name": "Pad" })));

        store.remove("products", "p-1").await.unwrap();
        assert_eq!(store.count("products"), 0);
        assert_eq!(store.writes(), 3);
    }

    #[tokio::test]
    async fn missing_documents_report_not_found() {
        let store = MemoryRemoteStore::new();

        let update = store.partial_update("products", "nope", &json!({})).await.unwrap_err();
        let remove = store.remove("products", "nope").await.unwrap_err();

        assert_eq!(update.kind, RemoteErrorKind::NotFound);
        assert_eq!(remove.kind, RemoteErrorKind::NotFound);
    }

    #[tokio::test]
    async fn query_applies_filter() {
        let store = MemoryRemoteStore::new();
        store.seed("sales", "s-1", json!({ "userId": "u1" }));
        store.seed("sales", "s-2", json!({ "userId": "u2" }));

        let mine = store.query_all("sales", Some(&QueryFilter::owned_by("u1"))).await.unwrap();
        let all = store.query_all("sales", None).await.unwrap();

        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].id, "s-1");
        assert_eq!(all.len(), 2);
        assert_eq!(store.queries(), 2);
    }

    #[tokio::test]
    async fn queued_failures_are_consumed_in_order() {
        let store = MemoryRemoteStore::new();
        store.fail_next(RemoteErrorKind::Transient, "reset");
        store.fail_next(RemoteErrorKind::QuotaExceeded, "writes/day");

        let first = store.insert("products", "p-1", &json!({})).await.unwrap_err();
        let second = store.insert("products", "p-1", &json!({})).await.unwrap_err();
        store.insert("products", "p-1", &json!({})).await.unwrap();

        assert_eq!(first.kind, RemoteErrorKind::Transient);
        assert!(second.is_quota_exceeded());
        assert_eq!(store.writes(), 1);
    }

    #[tokio::test]
    async fn sticky_failure_lasts_until_cleared() {
        let store = MemoryRemoteStore::new();
        store.fail_always(RemoteErrorKind::Transient, "offline");

        assert!(store.query_all("products", None).await.is_err());
        assert!(store.query_all("products", None).await.is_err());

        store.clear_failures();
        assert!(store.query_all("products", None).await.is_ok());
    }
}

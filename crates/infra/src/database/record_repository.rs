//! SQLite-backed local record cache.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use partspro_core::LocalRecordStore;
use partspro_domain::{
    LocalRecord, MergeStats, PartsProError, RemoteRecord, Result as DomainResult,
};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use tokio::task;
use tracing::{debug, warn};

use super::manager::{map_join_error, map_sql_error, DbManager};

/// Documents of every collection, stored in `local_records`.
pub struct SqliteRecordRepository {
    db: Arc<DbManager>,
}

impl SqliteRecordRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    async fn blocking<T, F>(&self, work: F) -> DomainResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> DomainResult<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        task::spawn_blocking(move || -> DomainResult<T> {
            let mut conn = db.get_connection()?;
            work(&mut conn)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl LocalRecordStore for SqliteRecordRepository {
    async fn upsert_record(&self, record: &LocalRecord) -> DomainResult<()> {
        let record = record.clone();
        self.blocking(move |conn| upsert(conn, &record)).await
    }

    async fn delete_record(&self, collection: &str, doc_id: &str) -> DomainResult<()> {
        let (collection, doc_id) = (collection.to_string(), doc_id.to_string());
        self.blocking(move |conn| {
            conn.execute(RECORD_DELETE_SQL, params![collection, doc_id])
                .map(|_| ())
                .map_err(map_sql_error)
        })
        .await
    }

    async fn get_record(&self, collection: &str, doc_id: &str) -> DomainResult<Option<LocalRecord>> {
        let (collection, doc_id) = (collection.to_string(), doc_id.to_string());
        self.blocking(move |conn| {
            conn.query_row(RECORD_GET_SQL, params![collection, doc_id], map_record_row)
                .optional()
                .map_err(map_sql_error)
        })
        .await
    }

    async fn list_records(&self, collection: &str, user_id: &str) -> DomainResult<Vec<LocalRecord>> {
        let (collection, user_id) = (collection.to_string(), user_id.to_string());
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(RECORD_LIST_SQL).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![collection, user_id], map_record_row)
                .map_err(map_sql_error)?;
            rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
        })
        .await
    }

    async fn insert_batch(&self, records: &[LocalRecord]) -> DomainResult<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let records = records.to_vec();
        self.blocking(move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            for record in &records {
                upsert(&tx, record)?;
            }
            tx.commit().map_err(map_sql_error)?;
            Ok(records.len())
        })
        .await
    }

    async fn merge_remote(
        &self,
        collection: &str,
        user_id: &str,
        records: &[RemoteRecord],
        skip_doc_ids: &[String],
        merged_at: i64,
    ) -> DomainResult<MergeStats> {
        let collection = collection.to_string();
        let user_id = user_id.to_string();
        let records = records.to_vec();
        let skip: HashSet<String> = skip_doc_ids.iter().cloned().collect();

        self.blocking(move |conn| {
            let tx = conn.transaction().map_err(map_sql_error)?;
            let mut stats = MergeStats::default();

            for remote in &records {
                if skip.contains(&remote.id) {
                    stats.skipped += 1;
                    continue;
                }
                let local =
                    LocalRecord::new(&collection, &remote.id, &user_id, remote.data(), merged_at);
                upsert(&tx, &local)?;
                stats.merged += 1;
            }

            let remote_ids: HashSet<&str> = records.iter().map(|r| r.id.as_str()).collect();
            let existing: Vec<String> = {
                let mut stmt = tx.prepare(RECORD_IDS_SQL).map_err(map_sql_error)?;
                let rows = stmt
                    .query_map(params![collection, user_id], |row| row.get::<_, String>(0))
                    .map_err(map_sql_error)?;
                rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)?
            };
            for doc_id in existing {
                if remote_ids.contains(doc_id.as_str()) || skip.contains(&doc_id) {
                    continue;
                }
                tx.execute(RECORD_DELETE_SQL, params![collection, doc_id])
                    .map_err(map_sql_error)?;
                stats.removed += 1;
            }

            tx.commit().map_err(map_sql_error)?;
            debug!(
                collection = %collection,
                merged = stats.merged,
                removed = stats.removed,
                skipped = stats.skipped,
                "Merged remote records"
            );
            Ok(stats)
        })
        .await
    }
}

const RECORD_UPSERT_SQL: &str = "INSERT INTO local_records (collection, doc_id, user_id, data_json, updated_at)
    VALUES (?1, ?2, ?3, ?4, ?5)
    ON CONFLICT(collection, doc_id) DO UPDATE SET
        user_id = excluded.user_id,
        data_json = excluded.data_json,
        updated_at = excluded.updated_at";

const RECORD_GET_SQL: &str = "SELECT collection, doc_id, user_id, data_json, updated_at
    FROM local_records
    WHERE collection = ?1 AND doc_id = ?2";

const RECORD_LIST_SQL: &str = "SELECT collection, doc_id, user_id, data_json, updated_at
    FROM local_records
    WHERE collection = ?1 AND user_id = ?2
    ORDER BY doc_id ASC";

const RECORD_IDS_SQL: &str =
    "SELECT doc_id FROM local_records WHERE collection = ?1 AND user_id = ?2";

const RECORD_DELETE_SQL: &str = "DELETE FROM local_records WHERE collection = ?1 AND doc_id = ?2";

fn upsert(conn: &Connection, record: &LocalRecord) -> DomainResult<()> {
    let data_json = serde_json::to_string(&record.data).map_err(|err| {
        PartsProError::InvalidInput(format!("record data is not serialisable: {err}"))
    })?;

    conn.execute(
        RECORD_UPSERT_SQL,
        params![record.collection, record.doc_id, record.user_id, data_json, record.updated_at],
    )
    .map(|_| ())
    .map_err(map_sql_error)
}

fn map_record_row(row: &Row<'_>) -> rusqlite::Result<LocalRecord> {
    let doc_id: String = row.get(1)?;
    let raw: String = row.get(3)?;
    let data = serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(doc_id = %doc_id, error = %err, "invalid JSON in local record");
        Value::Null
    });

    Ok(LocalRecord {
        collection: row.get(0)?,
        doc_id,
        user_id: row.get(2)?,
        data,
        updated_at: row.get(4)?,
    })
}

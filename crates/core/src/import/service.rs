//! Bulk product import - local save in batches, then queue for sync

use std::collections::HashMap;
use std::sync::Arc;

use partspro_common::time::Clock;
use partspro_domain::constants::DEFAULT_IMPORT_BATCH_SIZE;
use partspro_domain::{
    ActivityEvent, ImportProgress, ImportReport, ImportStage, LocalRecord, MutationKind, Product,
    Result, SyncAction,
};
use tracing::{info, instrument, warn};

use crate::sync::ports::{ActivitySink, LocalRecordStore, SyncQueue};
use crate::sync::queue::QueueManager;

const PRODUCTS_COLLECTION: &str = "products";

/// Imports spreadsheet rows into the local store and the sync queue.
pub struct ImportService {
    local: Arc<dyn LocalRecordStore>,
    queue: QueueManager,
    activity: Arc<dyn ActivitySink>,
    clock: Arc<dyn Clock>,
    batch_size: usize,
}

impl ImportService {
    pub fn new(
        local: Arc<dyn LocalRecordStore>,
        queue: Arc<dyn SyncQueue>,
        activity: Arc<dyn ActivitySink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            local,
            queue: QueueManager::new(queue, Arc::clone(&clock)),
            activity,
            clock,
            batch_size: DEFAULT_IMPORT_BATCH_SIZE,
        }
    }

    /// Override the batch size. Zero is treated as one.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Save `products` locally, then queue a create for each of them.
    ///
    /// Products without an id get `product-{millis}-{index}`. A failed
    /// batch write aborts the import; products already saved stay saved.
    /// A product whose queue entry cannot be written is rolled back from
    /// the local store (restoring any copy it replaced) and listed in
    /// `queue_failures` instead of `saved`.
    #[instrument(skip(self, products, on_progress), fields(count = products.len()))]
    pub async fn import_products<F>(
        &self,
        user_id: &str,
        mut products: Vec<Product>,
        mut on_progress: F,
    ) -> Result<ImportReport>
    where
        F: FnMut(ImportProgress) + Send,
    {
        let total = products.len();
        let now = self.clock.millis_since_epoch();
        let mut replaced: HashMap<String, LocalRecord> = HashMap::new();
        for (index, product) in products.iter_mut().enumerate() {
            if product.id.trim().is_empty() {
                product.id = format!("product-{now}-{index}");
            } else if let Some(existing) =
                self.local.get_record(PRODUCTS_COLLECTION, &product.id).await?
            {
                replaced.insert(product.id.clone(), existing);
            }
        }

        let mut report = ImportReport::default();
        for batch in products.chunks(self.batch_size) {
            let records: Vec<LocalRecord> = batch
                .iter()
                .map(|product| {
                    LocalRecord::new(
                        PRODUCTS_COLLECTION,
                        product.id.as_str(),
                        user_id,
                        product.local_data(),
                        now,
                    )
                })
                .collect();
            report.saved += self.local.insert_batch(&records).await?;
            on_progress(ImportProgress::new(ImportStage::Saving, report.saved, total));
        }

        for (index, product) in products.iter().enumerate() {
            match self
                .queue
                .enqueue(
                    PRODUCTS_COLLECTION,
                    &product.id,
                    SyncAction::Create,
                    product.sync_payload(),
                    user_id,
                )
                .await
            {
                Ok(_) => report.queued += 1,
                Err(err) => {
                    warn!(product_id = %product.id, error = %err, "Failed to queue imported product");
                    if self.roll_back(&product.id, replaced.remove(&product.id)).await {
                        report.saved -= 1;
                    }
                    report.queue_failures.push(product.id.clone());
                }
            }
            on_progress(ImportProgress::new(ImportStage::Queueing, index + 1, total));
        }

        if report.saved > 0 {
            self.activity.record(ActivityEvent::DataMutation(MutationKind::Add));
        }

        info!(
            saved = report.saved,
            queued = report.queued,
            queue_failures = report.queue_failures.len(),
            "Product import finished"
        );
        Ok(report)
    }

    /// Undo the local save of one product. Returns false if the store refused.
    async fn roll_back(&self, product_id: &str, previous: Option<LocalRecord>) -> bool {
        let result = match &previous {
            Some(record) => self.local.upsert_record(record).await,
            None => self.local.delete_record(PRODUCTS_COLLECTION, product_id).await,
        };
        if let Err(err) = &result {
            warn!(product_id = %product_id, error = %err, "Failed to roll back imported product");
        }
        result.is_ok()
    }
}

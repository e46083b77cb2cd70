//! Bulk product import

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
#[cfg(feature = "ts-gen")]
use ts_rs::TS;

/// Catalogue entry coming from a spreadsheet import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Empty until the import assigns one.
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub stock: i64,
    #[serde(default)]
    pub purchase_price: f64,
    #[serde(default)]
    pub price: f64,
}

impl Product {
    /// Document body written to the local store.
    pub fn local_data(&self) -> Value {
        json!({
            "id": self.id,
            "name": self.name,
            "reference": self.reference,
            "brand": self.brand,
            "stock": self.stock,
            "purchasePrice": self.purchase_price,
            "price": self.price,
        })
    }

    /// Payload queued for the remote create.
    pub fn sync_payload(&self) -> Value {
        json!({
            "name": self.name,
            "reference": self.reference,
            "brand": self.brand,
            "stock": self.stock,
            "purchasePrice": self.purchase_price,
            "price": self.price,
            "isDeleted": false,
        })
    }
}

/// Phase of a bulk import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "lowercase")]
pub enum ImportStage {
    Saving,
    Queueing,
}

crate::impl_domain_status_conversions!(ImportStage {
    Saving => "saving",
    Queueing => "queueing",
});

/// Progress callback payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts-gen", derive(TS))]
#[cfg_attr(feature = "ts-gen", ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
    pub stage: ImportStage,
    pub processed: usize,
    pub total: usize,
    /// Whole-number percentage of `processed / total`.
    pub percent: u8,
}

impl ImportProgress {
    pub fn new(stage: ImportStage, processed: usize, total: usize) -> Self {
        let percent = if total == 0 {
            100
        } else {
            u8::try_from(processed.min(total) * 100 / total).unwrap_or(100)
        };
        Self { stage, processed, total, percent }
    }
}

/// Result of a bulk import.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub saved: usize,
    pub queued: usize,
    /// Products whose queue entry could not be written. Their local save is rolled back.
    pub queue_failures: Vec<String>,
}

//! Documents exchanged with the remote store

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A document returned by `query_all`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Map<String, Value>,
}

impl RemoteRecord {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self { id: id.into(), fields }
    }

    /// Fields as a JSON object value.
    pub fn data(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

/// Equality filter applied by `query_all`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryFilter {
    pub field: String,
    pub value: Value,
}

impl QueryFilter {
    /// `field == value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { field: field.into(), value: value.into() }
    }

    /// Documents owned by `user_id`.
    pub fn owned_by(user_id: &str) -> Self {
        Self::eq("userId", user_id)
    }

    pub fn matches(&self, fields: &Map<String, Value>) -> bool {
        fields.get(&self.field) == Some(&self.value)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn filter_matches_on_exact_value() {
        let Value::Object(fields) = json!({ "userId": "u-1", "stock": 3 }) else {
            unreachable!()
        };

        assert!(QueryFilter::owned_by("u-1").matches(&fields));
        assert!(!QueryFilter::owned_by("u-2").matches(&fields));
        assert!(!QueryFilter::eq("missing", 1).matches(&fields));
    }

    #[test]
    fn record_data_wraps_fields() {
        let mut fields = Map::new();
        fields.insert("name".into(), json!("Brake pad"));
        let record = RemoteRecord::new("p-1", fields);

        assert_eq!(record.data(), json!({ "name": "Brake pad" }));
    }
}

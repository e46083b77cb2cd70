//! REST adapter for the remote document store.
//!
//! Documents live under `{base}/v1/{collection}/{doc_id}`:
//! - `PUT` creates or overwrites (client-chosen id),
//! - `PATCH` merges fields into an existing document,
//! - `DELETE` removes it,
//! - `GET {base}/v1/{collection}?field=..&value=..` lists matches as
//!   `{ "documents": [ { "id": .., "fields": { .. } } ] }`.

use std::time::Duration;

use async_trait::async_trait;
use partspro_core::{RemoteResult, RemoteStore};
use partspro_domain::{
    PartsProError, QueryFilter, RemoteConfig, RemoteErrorKind, RemoteRecord, RemoteStoreError,
    Result,
};
use reqwest::{Method, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::errors::remote_error_from_http;
use crate::http::HttpClient;

const API_PREFIX: &str = "v1";
const USER_AGENT: &str = concat!("partspro-sync/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct InsertResponse {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    documents: Vec<RemoteRecord>,
}

/// [`RemoteStore`] over HTTP.
pub struct HttpRemoteStore {
    client: HttpClient,
    base_url: String,
}

impl HttpRemoteStore {
    /// Build an adapter for `base_url` with an optional bearer token.
    pub fn new(
        base_url: impl Into<String>,
        api_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = HttpClient::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .bearer_token(api_token)
            .build()?;

        Ok(Self::with_client(client, base_url))
    }

    /// Adapter configured from `[remote]`. Fails when no base URL is set.
    pub fn from_config(config: &RemoteConfig) -> Result<Self> {
        let base_url = config.base_url.clone().ok_or_else(|| {
            PartsProError::Config("remote.base_url is required for the HTTP store".into())
        })?;
        Self::new(base_url, config.api_token.clone(), Duration::from_secs(config.timeout_secs))
    }

    pub fn with_client(client: HttpClient, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{}/{}", self.base_url, API_PREFIX, collection)
    }

    fn document_url(&self, collection: &str, doc_id: &str) -> String {
        format!("{}/{}", self.collection_url(collection), doc_id)
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    #[instrument(skip(self, payload))]
    async fn insert(
        &self,
        collection: &str,
        client_id: &str,
        payload: &Value,
    ) -> RemoteResult<String> {
        let request =
            self.client.request(Method::PUT, self.document_url(collection, client_id)).json(payload);
        let response = ensure_success(self.client.send(request).await?).await?;

        let body = response.bytes().await.map_err(|err| remote_error_from_http(&err))?;
        let stored_id = serde_json::from_slice::<InsertResponse>(&body)
            .ok()
            .and_then(|parsed| parsed.id)
            .unwrap_or_else(|| client_id.to_string());

        debug!(collection, doc_id = %stored_id, "remote insert acknowledged");
        Ok(stored_id)
    }

    #[instrument(skip(self, payload))]
    async fn partial_update(
        &self,
        collection: &str,
        doc_id: &str,
        payload: &Value,
    ) -> RemoteResult<()> {
        let request =
            self.client.request(Method::PATCH, self.document_url(collection, doc_id)).json(payload);
        ensure_success(self.client.send(request).await?).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, collection: &str, doc_id: &str) -> RemoteResult<()> {
        let request = self.client.request(Method::DELETE, self.document_url(collection, doc_id));
        ensure_success(self.client.send(request).await?).await?;
        Ok(())
    }

    #[instrument(skip(self, filter))]
    async fn query_all(
        &self,
        collection: &str,
        filter: Option<&QueryFilter>,
    ) -> RemoteResult<Vec<RemoteRecord>> {
        let mut request = self.client.request(Method::GET, self.collection_url(collection));
        if let Some(filter) = filter {
            let value = query_value(&filter.value);
            request = request.query(&[("field", filter.field.as_str()), ("value", value.as_str())]);
        }

        let response = ensure_success(self.client.send(request).await?).await?;
        let parsed: QueryResponse =
            response.json().await.map_err(|err| remote_error_from_http(&err))?;

        debug!(collection, documents = parsed.documents.len(), "remote query returned");
        Ok(parsed.documents)
    }
}

/// Strings are sent bare, anything else as JSON text.
fn query_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

async fn ensure_success(response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(classify_failure(status, &body))
}

fn classify_failure(status: StatusCode, body: &str) -> RemoteStoreError {
    let reason = status.canonical_reason().unwrap_or("unknown status");
    let message = if body.trim().is_empty() {
        format!("HTTP {} {}", status.as_u16(), reason)
    } else {
        format!("HTTP {} {}: {}", status.as_u16(), reason, body.trim())
    };

    if RemoteErrorKind::classify_message(body) == RemoteErrorKind::QuotaExceeded {
        return RemoteStoreError::quota_exceeded(message);
    }

    match status.as_u16() {
        404 => RemoteStoreError::not_found(message),
        429 => RemoteStoreError::quota_exceeded(message),
        400..=499 => RemoteStoreError::rejected(message),
        _ => RemoteStoreError::transient(message),
    }
}

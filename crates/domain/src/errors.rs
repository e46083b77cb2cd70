//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for PartsPro
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum PartsProError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Remote store error: {0}")]
    Remote(RemoteStoreError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for PartsPro operations
pub type Result<T> = std::result::Result<T, PartsProError>;

/// How a remote document store call failed.
///
/// Adapters classify failures when they happen; the push worker only looks
/// at the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    /// Network hiccup, timeout or server-side failure; retry next pass.
    Transient,
    /// The target document does not exist.
    NotFound,
    /// Quota or resource exhaustion; stop writing for the rest of the pass.
    QuotaExceeded,
    /// The store refused the request (validation, permissions).
    Rejected,
}

impl RemoteErrorKind {
    /// Classify a bare error message.
    ///
    /// For adapters whose client library only surfaces text. Matches the
    /// `RESOURCE_EXHAUSTED` status and any mention of "quota".
    pub fn classify_message(message: &str) -> Self {
        let lower = message.to_ascii_lowercase();
        if message.contains("RESOURCE_EXHAUSTED") || lower.contains("quota") {
            Self::QuotaExceeded
        } else if lower.contains("not found") || message.contains("NOT_FOUND") {
            Self::NotFound
        } else if lower.contains("permission") || message.contains("INVALID_ARGUMENT") {
            Self::Rejected
        } else {
            Self::Transient
        }
    }
}

impl std::fmt::Display for RemoteErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Transient => "transient",
            Self::NotFound => "not_found",
            Self::QuotaExceeded => "quota_exceeded",
            Self::Rejected => "rejected",
        };
        f.write_str(label)
    }
}

/// Structured failure returned by a `RemoteStore`.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{kind}: {message}")]
pub struct RemoteStoreError {
    pub kind: RemoteErrorKind,
    pub message: String,
}

impl RemoteStoreError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Transient, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::NotFound, message)
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::QuotaExceeded, message)
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Rejected, message)
    }

    /// Build an error whose kind is inferred from the message text.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self { kind: RemoteErrorKind::classify_message(&message), message }
    }

    /// True for quota/resource exhaustion.
    pub fn is_quota_exceeded(&self) -> bool {
        self.kind == RemoteErrorKind::QuotaExceeded
    }
}

impl From<RemoteStoreError> for PartsProError {
    fn from(err: RemoteStoreError) -> Self {
        Self::Remote(err)
    }
}

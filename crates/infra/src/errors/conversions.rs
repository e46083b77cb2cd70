//! Conversions from external infrastructure errors into domain errors.

use partspro_domain::{PartsProError, RemoteStoreError};
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub PartsProError);

impl From<InfraError> for PartsProError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<PartsProError> for InfraError {
    fn from(value: PartsProError) -> Self {
        InfraError(value)
    }
}

trait IntoPartsProError {
    fn into_partspro(self) -> PartsProError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → PartsProError */
/* -------------------------------------------------------------------------- */

impl IntoPartsProError for SqlError {
    fn into_partspro(self) -> PartsProError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => {
                        PartsProError::Database("database is busy".into())
                    }
                    (ErrorCode::DatabaseLocked, _) => {
                        PartsProError::Database("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        PartsProError::Database("unique constraint violation".into())
                    }
                    (ErrorCode::NotADatabase, _) => {
                        PartsProError::Database("file is not a database".into())
                    }
                    _ => PartsProError::Database(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => PartsProError::NotFound("no rows returned by query".into()),
            RE::FromSqlConversionFailure(_, _, cause) => {
                PartsProError::Database(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                PartsProError::Database(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => PartsProError::Database(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => PartsProError::Database(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_partspro())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → RemoteStoreError */
/* -------------------------------------------------------------------------- */

/// Classify a transport-level failure from the HTTP client.
pub(crate) fn remote_error_from_http(err: &HttpError) -> RemoteStoreError {
    if err.is_timeout() {
        return RemoteStoreError::transient("HTTP request timed out");
    }

    if err.is_connect() {
        return RemoteStoreError::transient(format!("HTTP connection failure: {err}"));
    }

    if let Some(status) = err.status() {
        let code = status.as_u16();
        let message =
            format!("HTTP {} {}", code, status.canonical_reason().unwrap_or("unknown status"));

        return match code {
            404 => RemoteStoreError::not_found(message),
            429 => RemoteStoreError::quota_exceeded(message),
            400..=499 => RemoteStoreError::rejected(message),
            _ => RemoteStoreError::transient(message),
        };
    }

    if err.is_decode() {
        return RemoteStoreError::rejected(format!("invalid response body: {err}"));
    }

    RemoteStoreError::transient(err.to_string())
}

impl IntoPartsProError for HttpError {
    fn into_partspro(self) -> PartsProError {
        PartsProError::Remote(remote_error_from_http(&self))
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_partspro())
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */

#[cfg(test)]
mod tests {
    use partspro_domain::RemoteErrorKind;
    use reqwest::{Client, StatusCode};
    use rusqlite::ffi::{Error as FfiError, ErrorCode};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    #[test]
    fn sqlite_busy_maps_to_database_error() {
        let err = SqlError::SqliteFailure(
            FfiError { code: ErrorCode::DatabaseBusy, extended_code: 5 },
            Some("database is locked".into()),
        );

        let mapped: PartsProError = InfraError::from(err).into();
        match mapped {
            PartsProError::Database(msg) => {
                assert!(msg.contains("busy") || msg.contains("locked"));
            }
            other => panic!("expected database error, got {:?}", other),
        }
    }

    #[test]
    fn no_rows_maps_to_not_found() {
        let mapped: PartsProError = InfraError::from(SqlError::QueryReturnedNoRows).into();
        assert!(matches!(mapped, PartsProError::NotFound(_)));
    }

    async fn status_error(status: StatusCode) -> HttpError {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;

        let client = Client::builder().no_proxy().build().unwrap();
        client.get(server.uri()).send().await.unwrap().error_for_status().unwrap_err()
    }

    #[tokio::test]
    async fn http_429_maps_to_quota_exceeded() {
        let error = status_error(StatusCode::TOO_MANY_REQUESTS).await;

        let mapped: PartsProError = InfraError::from(error).into();
        match mapped {
            PartsProError::Remote(remote) => {
                assert_eq!(remote.kind, RemoteErrorKind::QuotaExceeded);
                assert!(remote.message.contains("429"));
            }
            other => panic!("expected remote error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn http_status_classes_map_to_kinds() {
        let cases = [
            (StatusCode::NOT_FOUND, RemoteErrorKind::NotFound),
            (StatusCode::FORBIDDEN, RemoteErrorKind::Rejected),
            (StatusCode::BAD_GATEWAY, RemoteErrorKind::Transient),
        ];

        for (status, kind) in cases {
            let error = status_error(status).await;
            assert_eq!(remote_error_from_http(&error).kind, kind, "{status}");
        }
    }
}

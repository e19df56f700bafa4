//! Error types shared by the stores, the scanner, and the HTTP handlers

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Errors surfaced by the matching core
///
/// Handlers return this directly; the `IntoResponse` impl below maps each
/// variant to a status code and the `{"error": ..., "code": ...}` body shape
/// used across the API.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A required field was missing or empty, or a request asked for an
    /// illegal state transition
    #[error("{0}")]
    Validation(String),

    /// The targeted record does not exist
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    #[error("corrupt record: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CoreError {
    fn status_code(&self) -> StatusCode {
        match self {
            CoreError::Validation(_) => StatusCode::BAD_REQUEST,
            CoreError::NotFound(_) => StatusCode::NOT_FOUND,
            CoreError::Storage(_) | CoreError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn code(&self) -> &'static str {
        match self {
            CoreError::Validation(_) => "validation_error",
            CoreError::NotFound(_) => "not_found",
            CoreError::Storage(_) => "storage_error",
            CoreError::Serialization(_) => "corrupt_record",
        }
    }
}

impl IntoResponse for CoreError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        (
            status,
            Json(json!({
                "error": self.to_string(),
                "code": self.code(),
            })),
        )
            .into_response()
    }
}

// redb reports transaction, table, storage and commit failures as distinct
// types; fold them all into the umbrella `redb::Error` this enum carries.

impl From<redb::TransactionError> for CoreError {
    fn from(err: redb::TransactionError) -> Self {
        CoreError::Storage(err.into())
    }
}

impl From<redb::TableError> for CoreError {
    fn from(err: redb::TableError) -> Self {
        CoreError::Storage(err.into())
    }
}

impl From<redb::StorageError> for CoreError {
    fn from(err: redb::StorageError) -> Self {
        CoreError::Storage(err.into())
    }
}

impl From<redb::CommitError> for CoreError {
    fn from(err: redb::CommitError) -> Self {
        CoreError::Storage(err.into())
    }
}

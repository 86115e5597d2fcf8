//! Error types for catalog operations
//!
//! Every failure a store operation can produce maps to one variant here, and
//! every variant maps to a fixed HTTP status and machine-readable code so the
//! handlers never build error responses by hand.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Result type alias for catalog operations
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Main error type for the catalog store
#[derive(Error, Debug)]
pub enum CatalogError {
    /// A required field is absent, empty, or outside its allowed range
    #[error("invalid field `{field}`: {reason}")]
    InvalidField {
        field: &'static str,
        reason: String,
    },

    /// A reference field does not resolve to an existing record
    #[error("field `{field}` references a non-existent record `{id}`")]
    DanglingReference { field: &'static str, id: String },

    /// A unique field collides with another existing record
    #[error("a record with {field} `{value}` already exists")]
    DuplicateUnique { field: &'static str, value: String },

    /// The operation target does not exist
    #[error("{entity} `{id}` not found")]
    NotFound { entity: &'static str, id: String },

    /// Delete blocked because a dependent record still references the target
    #[error("{entity} `{id}` is still referenced by an existing {referenced_by}")]
    ReferencedByOther {
        entity: &'static str,
        id: String,
        referenced_by: &'static str,
    },

    /// Underlying database failure
    #[error("storage error: {0}")]
    Storage(#[from] redb::Error),

    /// Document (de)serialization failure
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CatalogError {
    /// Stable machine-readable code included in every error body
    pub fn code(&self) -> &'static str {
        match self {
            CatalogError::InvalidField { .. } => "invalid_field",
            CatalogError::DanglingReference { .. } => "dangling_reference",
            CatalogError::DuplicateUnique { .. } => "already_exists",
            CatalogError::NotFound { .. } => "not_found",
            CatalogError::ReferencedByOther { .. } => "referenced_by_other",
            CatalogError::Storage(_) | CatalogError::Serialization(_) => "internal",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            CatalogError::InvalidField { .. } | CatalogError::DanglingReference { .. } => {
                StatusCode::BAD_REQUEST
            }
            CatalogError::DuplicateUnique { .. } | CatalogError::ReferencedByOther { .. } => {
                StatusCode::CONFLICT
            }
            CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
            CatalogError::Storage(_) | CatalogError::Serialization(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal failures are logged in full but surfaced as a generic
        // message; everything else carries the offending field or relation.
        let message = match &self {
            CatalogError::Storage(_) | CatalogError::Serialization(_) => {
                error!("internal error: {self}");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (
            status,
            Json(json!({
                "error": message,
                "code": self.code(),
            })),
        )
            .into_response()
    }
}

// redb surfaces granular error types per operation; fold them all into the
// unified `redb::Error` so store code can use `?` throughout.
impl From<redb::DatabaseError> for CatalogError {
    fn from(e: redb::DatabaseError) -> Self {
        CatalogError::Storage(e.into())
    }
}

impl From<redb::TransactionError> for CatalogError {
    fn from(e: redb::TransactionError) -> Self {
        CatalogError::Storage(e.into())
    }
}

impl From<redb::TableError> for CatalogError {
    fn from(e: redb::TableError) -> Self {
        CatalogError::Storage(e.into())
    }
}

impl From<redb::StorageError> for CatalogError {
    fn from(e: redb::StorageError) -> Self {
        CatalogError::Storage(e.into())
    }
}

impl From<redb::CommitError> for CatalogError {
    fn from(e: redb::CommitError) -> Self {
        CatalogError::Storage(e.into())
    }
}

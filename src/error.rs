//! Typed errors and HTTP mapping.

use crate::permissions::Operation;
use crate::response::failure;
use crate::service::FieldErrors;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate endpoint prefix: {0}")]
    DuplicatePrefix(String),
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

/// Errors raised while reading or writing field values of a record.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("shape {shape} has no field '{field}'")]
    UnknownField { shape: String, field: String },
    #[error("field '{field}' expects {expected}")]
    TypeMismatch { field: String, expected: &'static str },
    #[error("body must be a JSON object")]
    NotAnObject,
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures reported by a storage collaborator.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("shape '{0}' is not registered")]
    UnknownShape(String),
    #[error("name '{0}' is already registered with a different shape")]
    DuplicateShape(String),
    #[error("shape '{shape}' does not map onto '{base}': {reason}")]
    IncompatibleShape {
        shape: String,
        base: String,
        reason: String,
    },
    #[error("invalid filters: {0}")]
    InvalidFilters(String),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error("database: {0}")]
    Db(#[from] sqlx::Error),
    #[error("storage: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn is_invalid_filters(&self) -> bool {
        matches!(self, StorageError::InvalidFilters(_))
    }
}

/// Startup failure while registering an endpoint's shapes. Fatal to bootstrap.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("registering shape '{shape}': {source}")]
    Storage {
        shape: String,
        #[source]
        source: StorageError,
    },
    #[error("endpoint prefix '{0}' must start and end with '/'")]
    InvalidPrefix(String),
    #[error("endpoint prefix '{0}' is already registered")]
    DuplicatePrefix(String),
}

/// Per-request failure. Every variant resolves to exactly one envelope response with a fixed code.
#[derive(Error, Debug)]
pub enum CrudError {
    #[error("invalid id")]
    InvalidId,
    #[error("cannot read request body: {0}")]
    ReadBody(String),
    #[error("request body exceeds {limit} bytes")]
    BodyTooLarge { limit: usize },
    #[error("invalid json: {0}")]
    InvalidJson(#[from] RecordError),
    #[error("validation failed")]
    ValidationFailed(FieldErrors),
    #[error("invalid value '{value}' for filter '{column}'")]
    InvalidFilter { column: String, value: String },
    #[error("storage rejected filters: {0}")]
    InvalidFilterValue(StorageError),
    #[error("column lookup failed: {0}")]
    Lookup(StorageError),
    #[error("record not found")]
    NotFound,
    #[error("load failed: {0}")]
    Load(StorageError),
    #[error("save failed: {0}")]
    Save(StorageError),
    #[error("delete failed: {0}")]
    Delete(StorageError),
    #[error("operation {operation} not allowed for {shape}")]
    Forbidden { operation: Operation, shape: String },
    #[error("method not allowed")]
    MethodNotAllowed,
    #[error("no endpoint for path")]
    NoEndpoint,
}

impl CrudError {
    /// Machine-readable code written to the envelope's `err` field.
    pub fn code(&self) -> &'static str {
        match self {
            CrudError::InvalidId => "invalid_id",
            CrudError::ReadBody(_) => "cannot_read_request_body",
            CrudError::BodyTooLarge { .. } => "request_body_too_large",
            CrudError::InvalidJson(_) => "invalid_json",
            CrudError::ValidationFailed(_) => "validation_failed",
            CrudError::InvalidFilter { .. } => "invalid_filter",
            CrudError::InvalidFilterValue(_) => "invalid_filter_value",
            CrudError::Lookup(_) => "get_helper",
            CrudError::NotFound => "not_found_in_db",
            CrudError::Load(_) => "cannot_get_from_db",
            CrudError::Save(_) => "cannot_save_to_db",
            CrudError::Delete(_) => "cannot_delete_from_db",
            CrudError::Forbidden { .. } => "operation_not_allowed",
            CrudError::MethodNotAllowed => "method_not_allowed",
            CrudError::NoEndpoint => "not_found",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            CrudError::InvalidId
            | CrudError::InvalidJson(_)
            | CrudError::ValidationFailed(_)
            | CrudError::InvalidFilter { .. }
            | CrudError::InvalidFilterValue(_) => StatusCode::BAD_REQUEST,
            CrudError::NotFound | CrudError::NoEndpoint => StatusCode::NOT_FOUND,
            CrudError::Forbidden { .. } => StatusCode::FORBIDDEN,
            CrudError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            CrudError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            CrudError::ReadBody(_)
            | CrudError::Lookup(_)
            | CrudError::Load(_)
            | CrudError::Save(_)
            | CrudError::Delete(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for CrudError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(code = self.code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.code(), error = %self, "request rejected");
        }
        let data = match &self {
            CrudError::ValidationFailed(fields) => {
                let mut data = serde_json::Map::new();
                data.insert(
                    "fields".into(),
                    serde_json::to_value(fields).unwrap_or(serde_json::Value::Null),
                );
                Some(data)
            }
            _ => None,
        };
        failure(status, self.code(), data).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_map_onto_status_classes() {
        assert_eq!(CrudError::InvalidId.status(), StatusCode::BAD_REQUEST);
        assert_eq!(CrudError::NotFound.code(), "not_found_in_db");
        assert_eq!(CrudError::NotFound.status(), StatusCode::NOT_FOUND);
        let lookup = CrudError::Lookup(StorageError::UnknownShape("User".into()));
        assert_eq!(lookup.code(), "get_helper");
        assert_eq!(lookup.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let forbidden = CrudError::Forbidden {
            operation: Operation::Update,
            shape: "User".into(),
        };
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
        let too_large = CrudError::BodyTooLarge { limit: 16 };
        assert_eq!(too_large.code(), "request_body_too_large");
        assert_eq!(too_large.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn invalid_filters_is_distinguishable() {
        assert!(StorageError::InvalidFilters("age".into()).is_invalid_filters());
        assert!(!StorageError::Backend("down".into()).is_invalid_filters());
    }
}

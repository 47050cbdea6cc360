/// Unified error types for the Waypoint matchmaking server
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the server
#[derive(Error, Debug)]
pub enum WaypointError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Cache store errors (connection or command failures)
    #[error("Cache error: {0}")]
    Cache(String),

    /// Business invariant violations (room full, duplicate member, wrong
    /// status, missing contact field)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Referenced user/room absent in either store
    #[error("Not found: {0}")]
    NotFound(String),

    /// A store write did not take effect (affected rows != 1, upsert
    /// returned false). Not retried, earlier steps are not rolled back.
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// Identifier minting exhausted the per-millisecond sequence and the
    /// bounded wait could not complete. Transient; callers may retry.
    #[error("Identifier minting too fast: {0}")]
    MintExhausted(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Operation not supported by the data layout
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Value (de)serialization at the cache boundary
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert WaypointError to HTTP response
impl IntoResponse for WaypointError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            WaypointError::Precondition(_) => {
                (StatusCode::CONFLICT, "PreconditionFailed", self.to_string())
            }
            WaypointError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            WaypointError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest", self.to_string())
            }
            WaypointError::MintExhausted(_) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "MintExhausted",
                self.to_string(),
            ),
            WaypointError::OperationFailed(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "OperationFailed",
                self.to_string(),
            ),
            WaypointError::Database(_)
            | WaypointError::Cache(_)
            | WaypointError::Serialization(_)
            | WaypointError::Unsupported(_)
            | WaypointError::Internal(_)
            | WaypointError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for server operations
pub type WaypointResult<T> = Result<T, WaypointError>;

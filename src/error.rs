/// Unified error types for the Lumen sync server
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the server
#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed credentials
    #[error("Authentication required: {0}")]
    Authentication(String),

    /// Account exists but is not allowed to do this
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Account, token, or session does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Another session already holds the account
    #[error("Conflict: active session exists")]
    Conflict {
        /// When the competing session was last seen, RFC 3339
        last_active: String,
    },

    /// Session lived past its window; terminal
    #[error("Session expired")]
    Expired,

    /// Malformed request body or parameters
    #[error("Validation error: {0}")]
    Validation(String),

    /// Store (Redis) errors
    #[error("Store error: {0}")]
    Store(#[from] redis::RedisError),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(rename = "lastActive", skip_serializing_if = "Option::is_none")]
    pub last_active: Option<String>,
}

/// Convert ApiError to HTTP response
///
/// The four user-actionable outcomes (NotFound, Forbidden, Conflict, Expired)
/// map to distinct status codes and are never collapsed. Store failures are
/// surfaced as an opaque 500.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, last_active) = match self {
            ApiError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
                None,
            ),
            ApiError::Forbidden(_) => {
                (StatusCode::FORBIDDEN, "Forbidden", self.to_string(), None)
            }
            ApiError::NotFound(_) => {
                (StatusCode::NOT_FOUND, "NotFound", self.to_string(), None)
            }
            ApiError::Conflict { ref last_active } => (
                StatusCode::CONFLICT,
                "Conflict",
                "Please logout from your other device first".to_string(),
                Some(last_active.clone()),
            ),
            ApiError::Expired => (
                StatusCode::UNAUTHORIZED,
                "SessionExpired",
                self.to_string(),
                None,
            ),
            ApiError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
                None,
            ),
            ApiError::Store(_) | ApiError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
                None,
            ),
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
            last_active,
        });

        (status, body).into_response()
    }
}

/// Result type alias for server operations
pub type ApiResult<T> = Result<T, ApiError>;

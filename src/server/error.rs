//! API error types and response handling

use crate::auth::AuthError;
use crate::ingest::IngestionError;
use crate::session::driver::DriverError;
use crate::session::store::CapacityExceeded;
use crate::storage::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// API error responses
/// Converted to HTTP status codes via IntoResponse
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    NotFound(String),
    /// Action not allowed in the session's current state
    Conflict(String),
    /// A remote service failed
    Upstream(String),
    /// Feature not configured or capacity reached
    Unavailable(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Unavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        if status.is_server_error() {
            tracing::error!("API error: {} - {}", status, message);
        } else {
            tracing::debug!("API error: {} - {}", status, message);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<DriverError> for ApiError {
    fn from(e: DriverError) -> Self {
        match e {
            DriverError::NotFound => ApiError::NotFound(e.to_string()),
            DriverError::Session(inner) if inner.is_conflict() => {
                ApiError::Conflict(inner.to_string())
            }
            DriverError::Session(inner) => ApiError::BadRequest(inner.to_string()),
        }
    }
}

impl From<IngestionError> for ApiError {
    fn from(e: IngestionError) -> Self {
        match e {
            IngestionError::DriveUnauthorized => ApiError::Unauthorized(e.to_string()),
            IngestionError::Drive(_) => ApiError::Upstream(e.to_string()),
            IngestionError::Empty | IngestionError::Unsupported(_) | IngestionError::Parse { .. } => {
                ApiError::BadRequest(e.to_string())
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Disabled => ApiError::Unavailable(e.to_string()),
            StoreError::Remote { .. } | StoreError::Network(_) => ApiError::Upstream(e.to_string()),
            StoreError::Database(_) | StoreError::Serialization(_) => {
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Disabled => ApiError::Unavailable(e.to_string()),
            AuthError::InvalidToken(_) => ApiError::Unauthorized(e.to_string()),
            AuthError::Network(_) | AuthError::Remote { .. } => ApiError::Upstream(e.to_string()),
        }
    }
}

impl From<CapacityExceeded> for ApiError {
    fn from(e: CapacityExceeded) -> Self {
        ApiError::Unavailable(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{SessionError, Status};

    fn status_of(e: impl Into<ApiError>) -> StatusCode {
        e.into().into_response().status()
    }

    #[test]
    fn session_errors_map_to_statuses() {
        assert_eq!(status_of(DriverError::NotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(DriverError::Session(SessionError::InvalidState {
                action: "analyze",
                status: Status::Idle,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(DriverError::Session(SessionError::UnknownChapter("x".to_string()))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn service_errors_map_to_statuses() {
        assert_eq!(status_of(StoreError::Disabled), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_of(AuthError::InvalidToken("bad".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(IngestionError::Drive("down".to_string())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status_of(IngestionError::Empty), StatusCode::BAD_REQUEST);
    }
}

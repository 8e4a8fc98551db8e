//! API error types and responses.
//!
//! Every error response has the body `{"error": {"code", "message"}}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use capture_admin::AdminError;
use capture_core::{CoreError, IdError, StateParseError};

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with the current state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Invalid request body or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::BadRequest(_) => "bad_request",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::AgentNotFound(name) => Self::NotFound(format!("agent {name}")),
            CoreError::RecordingNotFound(id) => Self::NotFound(format!("recording {id}")),
            CoreError::InvalidId(e) => Self::BadRequest(e.to_string()),
            CoreError::InvalidState(e) => Self::BadRequest(e.to_string()),
            CoreError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                Self::Internal(msg)
            }
        }
    }
}

impl From<IdError> for ApiError {
    fn from(err: IdError) -> Self {
        Self::from(CoreError::from(err))
    }
}

impl From<StateParseError> for ApiError {
    fn from(err: StateParseError) -> Self {
        Self::from(CoreError::from(err))
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::AgentNotFound(name) => Self::from(CoreError::AgentNotFound(name)),
            AdminError::RecordingNotFound(id) => Self::from(CoreError::RecordingNotFound(id)),
            AdminError::InvalidTransition { id, from, to } => Self::Conflict(format!(
                "recording {id} cannot transition from {from} to {to}"
            )),
            AdminError::Store(store_err) => {
                tracing::error!(error = %store_err, "Store error");
                Self::Internal("storage error".to_string())
            }
            AdminError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                Self::Internal(msg)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_core::{AgentName, RecordingId, RecordingState};

    #[test]
    fn error_status_codes() {
        assert_eq!(
            ApiError::NotFound("test".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("test".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::BadRequest("test".into()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Internal("test".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn admin_errors_map_to_api_errors() {
        let name = AgentName::new("room-1").unwrap();
        let id = RecordingId::new("rec-1").unwrap();

        assert!(matches!(
            ApiError::from(AdminError::AgentNotFound(name)),
            ApiError::NotFound(_)
        ));
        assert!(matches!(
            ApiError::from(AdminError::InvalidTransition {
                id,
                from: RecordingState::UploadFinished,
                to: RecordingState::Capturing,
            }),
            ApiError::Conflict(_)
        ));
    }

    #[test]
    fn parse_errors_are_bad_requests() {
        let err: ApiError = "sleeping"
            .parse::<capture_core::AgentState>()
            .unwrap_err()
            .into();
        assert_eq!(err.code(), "bad_request");
    }
}

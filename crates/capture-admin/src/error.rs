//! Error types for the admin status service.
//!
//! This module defines all errors that can occur while tracking agent
//! check-ins and recording states.

use capture_core::{AgentName, RecordingId, RecordingState};
use thiserror::Error;

/// A result type using `AdminError`.
pub type Result<T> = std::result::Result<T, AdminError>;

/// Errors that can occur in admin service operations.
#[derive(Debug, Error)]
pub enum AdminError {
    /// The requested agent was not found.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentName),

    /// The requested recording was not found.
    #[error("recording not found: {0}")]
    RecordingNotFound(RecordingId),

    /// The requested recording state transition is not valid.
    #[error("invalid state transition for recording {id}: cannot transition from {from} to {to}")]
    InvalidTransition {
        /// The recording being transitioned.
        id: RecordingId,
        /// The current state.
        from: RecordingState,
        /// The requested target state.
        to: RecordingState,
    },

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(#[from] capture_store::StoreError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AdminError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::AgentNotFound(_) | Self::RecordingNotFound(_) => 404,
            Self::InvalidTransition { .. } => 409,
            Self::Store(_) | Self::Internal(_) => 500,
        }
    }

    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Internal(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_status_codes() {
        let name = AgentName::new("room-1").unwrap();
        let id = RecordingId::new("rec-1").unwrap();

        assert_eq!(AdminError::AgentNotFound(name).http_status_code(), 404);
        assert_eq!(
            AdminError::RecordingNotFound(id.clone()).http_status_code(),
            404
        );
        assert_eq!(
            AdminError::InvalidTransition {
                id,
                from: RecordingState::UploadFinished,
                to: RecordingState::Capturing,
            }
            .http_status_code(),
            409
        );
        assert_eq!(
            AdminError::Store(capture_store::StoreError::Database("down".into()))
                .http_status_code(),
            500
        );
    }

    #[test]
    fn only_backend_errors_are_retriable() {
        assert!(AdminError::Internal("x".into()).is_retriable());
        assert!(!AdminError::AgentNotFound(AgentName::new("a").unwrap()).is_retriable());
    }
}

//! Error types for the capture agent.
//!
//! `PipelineError` covers the capture framework and its backends;
//! `AgentError` covers agent operations and check-in reporting.

use std::time::Duration;

use capture_core::{AgentState, IdError, RecordingId, RecordingState};
use thiserror::Error;

/// A result type using `AgentError`.
pub type Result<T> = std::result::Result<T, AgentError>;

/// Errors raised by the capture framework and pipeline backends.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A capture session is already running.
    #[error("a capture is already in progress")]
    AlreadyCapturing,

    /// No capture session is running.
    #[error("no capture in progress")]
    NotCapturing,

    /// The backend did not stop within the allotted time and was aborted.
    #[error("capture did not stop within {0:?}")]
    StopTimeout(Duration),

    /// The recording properties do not describe a usable capture.
    #[error("invalid capture configuration: {0}")]
    Configuration(String),

    /// A capture process could not be started.
    #[error("failed to start capture for device {device}: {message}")]
    Spawn {
        /// Device whose process failed to start.
        device: String,
        /// Underlying error message.
        message: String,
    },

    /// A capture process exited unsuccessfully.
    #[error("capture for device {device} exited with {status}")]
    DeviceFailed {
        /// Device whose process failed.
        device: String,
        /// Exit status description.
        status: String,
    },

    /// The backend reported a failure.
    #[error("capture backend error: {0}")]
    Backend(String),

    /// The capture task panicked or was cancelled.
    #[error("capture task aborted: {0}")]
    Aborted(String),

    /// An I/O error occurred while driving the capture.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur in capture agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The agent is not idle and cannot start a capture.
    #[error("agent is busy ({0})")]
    AgentBusy(AgentState),

    /// A recording with this id already exists.
    #[error("recording already exists: {0}")]
    RecordingExists(RecordingId),

    /// The recording is not known to this agent.
    #[error("recording not found: {0}")]
    RecordingNotFound(RecordingId),

    /// The recording is not the capture in progress.
    #[error("recording {0} is not being captured")]
    NotActive(RecordingId),

    /// The recording is the capture in progress and cannot be removed.
    #[error("recording {0} is being captured")]
    RecordingActive(RecordingId),

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

    /// An invalid identifier was supplied.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// The capture pipeline failed.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// A filesystem operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Reporting state to the admin service failed.
    #[error("report failed: {0}")]
    Report(String),
}

impl AgentError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::RecordingNotFound(_) => 404,
            Self::AgentBusy(_)
            | Self::RecordingExists(_)
            | Self::NotActive(_)
            | Self::RecordingActive(_)
            | Self::InvalidTransition { .. } => 409,
            Self::InvalidId(_) => 400,
            Self::Pipeline(PipelineError::Configuration(_)) => 422,
            Self::Pipeline(_) | Self::Io(_) => 500,
            Self::Report(_) => 502,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::AgentBusy(_) => "agent_busy",
            Self::RecordingExists(_) => "recording_exists",
            Self::RecordingNotFound(_) => "not_found",
            Self::NotActive(_) => "not_active",
            Self::RecordingActive(_) => "recording_active",
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::InvalidId(_) => "bad_request",
            Self::Pipeline(PipelineError::Configuration(_)) => "invalid_configuration",
            Self::Pipeline(_) => "pipeline_error",
            Self::Io(_) => "internal_error",
            Self::Report(_) => "report_failed",
        }
    }
}

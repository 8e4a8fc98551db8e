//! Common error types for capture status tracking.
//!
//! This module provides shared error types that are used across multiple crates.

use crate::ids::{AgentName, IdError, RecordingId};
use crate::state::StateParseError;
use thiserror::Error;

/// A result type using `CoreError`.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Core errors that can occur throughout the system.
#[derive(Debug, Error)]
pub enum CoreError {
    /// An agent with the specified name was not found.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentName),

    /// A recording with the specified id was not found.
    #[error("recording not found: {0}")]
    RecordingNotFound(RecordingId),

    /// An invalid identifier was provided.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// A state outside the vocabulary was provided.
    #[error("invalid state: {0}")]
    InvalidState(#[from] StateParseError),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

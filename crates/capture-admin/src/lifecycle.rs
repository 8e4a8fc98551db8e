//! Recording lifecycle state machine.
//!
//! Recordings move forward through the processing stages and never back.
//! Error states and `upload_finished` are terminal.
//!
//! # State Machine
//!
//! ```text
//!   unknown
//!      │
//!      ▼
//!   capturing ──────────▶ capture_error
//!      │
//!      ▼
//!   capture_finished
//!      │
//!      ▼
//!   manifest ───────────▶ manifest_error
//!      │
//!      ▼
//!   manifest_finished
//!      │
//!      ▼
//!   compressing ────────▶ compressing_error
//!      │
//!      ▼
//!   uploading ──────────▶ upload_error
//!      │
//!      ▼
//!   upload_finished
//! ```
//!
//! Any stage may be skipped, so `capturing` can go straight to `uploading`.

use capture_core::{RecordingId, RecordingState};

use crate::error::{AdminError, Result};

/// Validates a recording state transition and returns the target state if
/// valid.
///
/// # Errors
///
/// Returns `AdminError::InvalidTransition` if the transition is not allowed.
pub fn validate_transition(
    id: &RecordingId,
    from: RecordingState,
    to: RecordingState,
) -> Result<RecordingState> {
    if from.can_transition_to(to) {
        Ok(to)
    } else {
        Err(AdminError::InvalidTransition {
            id: id.clone(),
            from,
            to,
        })
    }
}

/// Returns the list of valid target states from the given state, excluding
/// the re-report of the state itself.
#[must_use]
pub fn valid_transitions_from(state: RecordingState) -> Vec<RecordingState> {
    RecordingState::ALL
        .iter()
        .copied()
        .filter(|to| *to != state && state.can_transition_to(*to))
        .collect()
}

/// Returns true if a recording in this state may be swept once it expires.
#[must_use]
pub const fn is_expirable(state: RecordingState) -> bool {
    state.is_terminal()
}

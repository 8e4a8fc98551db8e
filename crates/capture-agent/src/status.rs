//! Status query contract of a capture agent.

use std::collections::BTreeSet;

use capture_core::{AgentState, RecordingId, RecordingState};

/// Read-only view of an agent's state and the recordings it holds.
///
/// Queries have no side effects.
pub trait StatusService: Send + Sync {
    /// The agent's current state.
    fn agent_state(&self) -> AgentState;

    /// Ids of the recordings currently held in memory.
    fn recordings(&self) -> BTreeSet<RecordingId>;

    /// State of one recording, or `None` if the id is unknown.
    fn recording_state(&self, id: &RecordingId) -> Option<RecordingState>;
}

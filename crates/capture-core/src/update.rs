//! State-update snapshots returned to polling clients.
//!
//! A snapshot pairs an entity's identity and state with the time elapsed since
//! it last reported, measured when the snapshot is built. Snapshots are never
//! persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AgentName, RecordingId};
use crate::model::{Agent, Recording};
use crate::state::{AgentState, RecordingState};

/// Milliseconds elapsed from `since` to `now`, clamped at zero.
#[must_use]
pub fn elapsed_millis(since: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    u64::try_from((now - since).num_milliseconds()).unwrap_or(0)
}

/// Snapshot of an agent's state.
///
/// The `Default` value is the blank form with every field unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentStateUpdate {
    /// Agent name.
    pub name: Option<AgentName>,
    /// Agent state at snapshot time.
    pub state: Option<AgentState>,
    /// Milliseconds since the agent last checked in.
    pub time_since_last_update: Option<u64>,
}

impl AgentStateUpdate {
    /// Build a snapshot of `agent` as of now.
    #[must_use]
    pub fn new(agent: &Agent) -> Self {
        Self::at(agent, Utc::now())
    }

    /// Build a snapshot of `agent` as of `now`.
    #[must_use]
    pub fn at(agent: &Agent, now: DateTime<Utc>) -> Self {
        Self::from_parts(agent.name.clone(), agent.state, agent.last_checkin_at, now)
    }

    /// Build a snapshot from individual fields.
    #[must_use]
    pub fn from_parts(
        name: AgentName,
        state: AgentState,
        last_update: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            name: Some(name),
            state: Some(state),
            time_since_last_update: Some(elapsed_millis(last_update, now)),
        }
    }

    /// Returns true if this is the blank form.
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        self.name.is_none() && self.state.is_none() && self.time_since_last_update.is_none()
    }
}

/// Snapshot of a recording's state.
///
/// The `Default` value is the blank form with every field unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingStateUpdate {
    /// Recording id.
    pub id: Option<RecordingId>,
    /// Recording state at snapshot time.
    pub state: Option<RecordingState>,
    /// Milliseconds since the recording state last changed.
    pub time_since_last_update: Option<u64>,
}

impl RecordingStateUpdate {
    /// Build a snapshot of `recording` as of now.
    #[must_use]
    pub fn new(recording: &Recording) -> Self {
        Self::at(recording, Utc::now())
    }

    /// Build a snapshot of `recording` as of `now`.
    #[must_use]
    pub fn at(recording: &Recording, now: DateTime<Utc>) -> Self {
        Self {
            id: Some(recording.id.clone()),
            state: Some(recording.state),
            time_since_last_update: Some(elapsed_millis(recording.last_update_at, now)),
        }
    }

    /// Returns true if this is the blank form.
    #[must_use]
    pub const fn is_blank(&self) -> bool {
        self.id.is_none() && self.state.is_none() && self.time_since_last_update.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn agent(now: DateTime<Utc>) -> Agent {
        Agent::new(AgentName::new("room-1").unwrap(), AgentState::Idle, now)
    }

    #[test]
    fn blank_updates_have_no_fields() {
        let update = AgentStateUpdate::default();
        assert!(update.is_blank());
        assert!(update.name.is_none());
        assert!(update.state.is_none());
        assert!(update.time_since_last_update.is_none());

        assert!(RecordingStateUpdate::default().is_blank());
    }

    #[test]
    fn blank_update_deserializes_from_empty_object() {
        let update: AgentStateUpdate = serde_json::from_str("{}").unwrap();
        assert!(update.is_blank());
    }

    #[test]
    fn agent_update_reports_elapsed_time() {
        let checkin = Utc::now();
        let update = AgentStateUpdate::at(&agent(checkin), checkin + Duration::milliseconds(1500));

        assert_eq!(update.name.unwrap().as_str(), "room-1");
        assert_eq!(update.state, Some(AgentState::Idle));
        assert_eq!(update.time_since_last_update, Some(1500));
    }

    #[test]
    fn update_is_never_negative() {
        let checkin = Utc::now();
        let update = AgentStateUpdate::at(&agent(checkin), checkin - Duration::seconds(10));
        assert_eq!(update.time_since_last_update, Some(0));
    }

    #[test]
    fn update_after_sleep_is_positive() {
        let a = agent(Utc::now());
        std::thread::sleep(std::time::Duration::from_millis(5));
        let update = AgentStateUpdate::new(&a);
        assert!(update.time_since_last_update.unwrap() > 0);
    }

    #[test]
    fn recording_update_reports_state() {
        let now = Utc::now();
        let mut rec = Recording::new(
            RecordingId::new("rec-1").unwrap(),
            RecordingState::Capturing,
            now,
        );
        rec.set_state(RecordingState::CaptureFinished, now + Duration::seconds(2));

        let update = RecordingStateUpdate::at(&rec, now + Duration::seconds(3));
        assert_eq!(update.id.unwrap().as_str(), "rec-1");
        assert_eq!(update.state, Some(RecordingState::CaptureFinished));
        assert_eq!(update.time_since_last_update, Some(1000));
    }

    #[test]
    fn update_serializes_snake_case_fields() {
        let now = Utc::now();
        let json = serde_json::to_value(AgentStateUpdate::at(&agent(now), now)).unwrap();
        assert_eq!(json["name"], "room-1");
        assert_eq!(json["state"], "idle");
        assert_eq!(json["time_since_last_update"], 0);
    }
}

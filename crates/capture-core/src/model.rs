//! Entity records for agents and recordings.
//!
//! These are the values persisted by the admin store and held in memory by a
//! capture agent.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AgentName, RecordingId};
use crate::state::{AgentState, RecordingState};

/// String key/value properties attached to agents and recordings.
pub type Properties = BTreeMap<String, String>;

/// A capture agent known to the status service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique name of the agent.
    pub name: AgentName,
    /// Last reported state.
    pub state: AgentState,
    /// Base URL the agent can be reached at, if reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Devices and features the agent advertises.
    #[serde(default)]
    pub capabilities: Properties,
    /// Configuration the agent runs with.
    #[serde(default)]
    pub configuration: Properties,
    /// When the agent first checked in.
    pub registered_at: DateTime<Utc>,
    /// When the agent last checked in.
    pub last_checkin_at: DateTime<Utc>,
}

impl Agent {
    /// Create a freshly registered agent.
    #[must_use]
    pub fn new(name: AgentName, state: AgentState, now: DateTime<Utc>) -> Self {
        Self {
            name,
            state,
            url: None,
            capabilities: Properties::new(),
            configuration: Properties::new(),
            registered_at: now,
            last_checkin_at: now,
        }
    }

    /// Record a check-in at `now`.
    ///
    /// The check-in time never moves backwards, even if `now` is earlier than
    /// the stored time.
    pub fn check_in(&mut self, state: AgentState, now: DateTime<Utc>) {
        self.state = state;
        if now > self.last_checkin_at {
            self.last_checkin_at = now;
        }
    }
}

/// A single capture session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recording {
    /// Immutable recording id.
    pub id: RecordingId,
    /// Current lifecycle state.
    pub state: RecordingState,
    /// Agent that produced the recording, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent: Option<AgentName>,
    /// Capture properties.
    #[serde(default)]
    pub properties: Properties,
    /// Directory that holds the captured media.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last state change.
    pub last_update_at: DateTime<Utc>,
}

impl Recording {
    /// Create a new recording in the given state.
    #[must_use]
    pub fn new(id: RecordingId, state: RecordingState, now: DateTime<Utc>) -> Self {
        Self {
            id,
            state,
            agent: None,
            properties: Properties::new(),
            directory: None,
            created_at: now,
            last_update_at: now,
        }
    }

    /// Set the state and stamp the update time. The update time never moves
    /// backwards.
    pub fn set_state(&mut self, state: RecordingState, now: DateTime<Utc>) {
        self.state = state;
        if now > self.last_update_at {
            self.last_update_at = now;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn check_in_advances_time() {
        let t0 = Utc::now();
        let mut agent = Agent::new(AgentName::new("a").unwrap(), AgentState::Idle, t0);

        let t1 = t0 + Duration::seconds(5);
        agent.check_in(AgentState::Capturing, t1);

        assert_eq!(agent.state, AgentState::Capturing);
        assert_eq!(agent.last_checkin_at, t1);
        assert_eq!(agent.registered_at, t0);
    }

    #[test]
    fn check_in_never_goes_backwards() {
        let t0 = Utc::now();
        let mut agent = Agent::new(AgentName::new("a").unwrap(), AgentState::Idle, t0);

        agent.check_in(AgentState::Uploading, t0 - Duration::seconds(30));

        assert_eq!(agent.state, AgentState::Uploading);
        assert_eq!(agent.last_checkin_at, t0);
    }

    #[test]
    fn recording_set_state_is_monotonic_in_time() {
        let t0 = Utc::now();
        let mut rec = Recording::new(
            RecordingId::new("r1").unwrap(),
            RecordingState::Capturing,
            t0,
        );

        rec.set_state(RecordingState::CaptureFinished, t0 - Duration::seconds(1));
        assert_eq!(rec.state, RecordingState::CaptureFinished);
        assert_eq!(rec.last_update_at, t0);
    }
}

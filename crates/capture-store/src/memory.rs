//! In-memory storage implementation.
//!
//! Records are kept in ordered maps behind a lock, so listings come back
//! sorted by key just like the `RocksDB` store. Nothing survives a restart.

use std::collections::BTreeMap;

use capture_core::{Agent, AgentName, AgentState, Recording, RecordingId};
use parking_lot::RwLock;

use crate::error::{Result, StoreError};
use crate::Store;

/// Volatile storage backed by ordered maps.
#[derive(Debug, Default)]
pub struct MemoryStore {
    agents: RwLock<BTreeMap<AgentName, Agent>>,
    recordings: RwLock<BTreeMap<RecordingId, Recording>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn put_agent(&self, agent: &Agent) -> Result<()> {
        self.agents.write().insert(agent.name.clone(), agent.clone());
        Ok(())
    }

    fn get_agent(&self, name: &AgentName) -> Result<Option<Agent>> {
        Ok(self.agents.read().get(name).cloned())
    }

    fn delete_agent(&self, name: &AgentName) -> Result<()> {
        self.agents
            .write()
            .remove(name)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    fn list_agents(&self) -> Result<Vec<Agent>> {
        Ok(self.agents.read().values().cloned().collect())
    }

    fn list_agents_by_state(&self, state: AgentState) -> Result<Vec<Agent>> {
        Ok(self
            .agents
            .read()
            .values()
            .filter(|a| a.state == state)
            .cloned()
            .collect())
    }

    fn put_recording(&self, recording: &Recording) -> Result<()> {
        self.recordings
            .write()
            .insert(recording.id.clone(), recording.clone());
        Ok(())
    }

    fn get_recording(&self, id: &RecordingId) -> Result<Option<Recording>> {
        Ok(self.recordings.read().get(id).cloned())
    }

    fn delete_recording(&self, id: &RecordingId) -> Result<()> {
        self.recordings
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    fn list_recordings(&self) -> Result<Vec<Recording>> {
        Ok(self.recordings.read().values().cloned().collect())
    }

    fn list_recordings_by_agent(&self, name: &AgentName) -> Result<Vec<Recording>> {
        Ok(self
            .recordings
            .read()
            .values()
            .filter(|r| r.agent.as_ref() == Some(name))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_core::RecordingState;
    use chrono::Utc;

    fn agent(name: &str, state: AgentState) -> Agent {
        Agent::new(AgentName::new(name).unwrap(), state, Utc::now())
    }

    #[test]
    fn agents_by_state() {
        let store = MemoryStore::new();
        store.put_agent(&agent("b", AgentState::Idle)).unwrap();
        store.put_agent(&agent("a", AgentState::Capturing)).unwrap();
        store.put_agent(&agent("c", AgentState::Idle)).unwrap();

        let idle: Vec<_> = store
            .list_agents_by_state(AgentState::Idle)
            .unwrap()
            .into_iter()
            .map(|a| a.name.to_string())
            .collect();
        assert_eq!(idle, ["b", "c"]);

        let name = AgentName::new("b").unwrap();
        store.update_agent_state(&name, AgentState::Offline).unwrap();
        assert_eq!(store.list_agents_by_state(AgentState::Idle).unwrap().len(), 1);
    }

    #[test]
    fn missing_records_report_not_found() {
        let store = MemoryStore::new();
        let name = AgentName::new("ghost").unwrap();
        assert!(store.get_agent(&name).unwrap().is_none());
        assert!(matches!(store.delete_agent(&name), Err(StoreError::NotFound)));
        assert!(matches!(
            store.update_agent_state(&name, AgentState::Idle),
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            store.delete_recording(&RecordingId::new("none").unwrap()),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn recordings_filter_by_agent() {
        let store = MemoryStore::new();
        let room = AgentName::new("room").unwrap();
        for (id, owner) in [("r1", Some(room.clone())), ("r2", None)] {
            let mut rec = Recording::new(
                RecordingId::new(id).unwrap(),
                RecordingState::Capturing,
                Utc::now(),
            );
            rec.agent = owner;
            store.put_recording(&rec).unwrap();
        }

        let owned = store.list_recordings_by_agent(&room).unwrap();
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id.as_str(), "r1");
        assert_eq!(store.list_recordings().unwrap().len(), 2);
    }
}

//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::Arc;

use capture_core::{Agent, AgentName, AgentState, Recording, RecordingId};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Collect the keys of an index column family that start with `prefix`.
    fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<Box<[u8]>>> {
        let cf = self.cf(cf_name)?;
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward));

        let mut found = Vec::new();
        for item in iter {
            let (key, _) = item?;

            // Stop if we're past the prefix
            if !key.starts_with(prefix) {
                break;
            }
            found.push(key);
        }
        Ok(found)
    }

    /// Decode every value of a primary column family.
    fn scan_all<T: serde::de::DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = item?;
            values.push(Self::deserialize(&value)?);
        }
        Ok(values)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Agent Operations
    // =========================================================================

    fn put_agent(&self, agent: &Agent) -> Result<()> {
        let cf_agents = self.cf(cf::AGENTS)?;
        let cf_by_state = self.cf(cf::AGENTS_BY_STATE)?;

        let agent_key = keys::agent_key(&agent.name);
        let state_key = keys::state_agent_key(agent.state.as_u8(), &agent.name);
        let value = Self::serialize(agent)?;

        // Check if agent exists to handle state index updates
        let old_state = self
            .get_agent(&agent.name)?
            .map(|a| a.state);

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_agents, &agent_key, &value);

        if let Some(old) = old_state {
            if old != agent.state {
                let old_key = keys::state_agent_key(old.as_u8(), &agent.name);
                batch.delete_cf(&cf_by_state, &old_key);
            }
        }
        batch.put_cf(&cf_by_state, &state_key, []);

        self.db.write(batch)?;

        Ok(())
    }

    fn get_agent(&self, name: &AgentName) -> Result<Option<Agent>> {
        let cf = self.cf(cf::AGENTS)?;

        self.db
            .get_cf(&cf, keys::agent_key(name))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn delete_agent(&self, name: &AgentName) -> Result<()> {
        let cf_agents = self.cf(cf::AGENTS)?;
        let cf_by_state = self.cf(cf::AGENTS_BY_STATE)?;

        let agent = self.get_agent(name)?.ok_or(StoreError::NotFound)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_agents, keys::agent_key(name));
        batch.delete_cf(
            &cf_by_state,
            keys::state_agent_key(agent.state.as_u8(), name),
        );

        self.db.write(batch)?;

        tracing::debug!(agent = %name, "Deleted agent record");
        Ok(())
    }

    fn list_agents(&self) -> Result<Vec<Agent>> {
        self.scan_all(cf::AGENTS)
    }

    fn list_agents_by_state(&self, state: AgentState) -> Result<Vec<Agent>> {
        let prefix = keys::state_prefix(state.as_u8());

        let mut agents = Vec::new();
        for key in self.scan_prefix(cf::AGENTS_BY_STATE, &prefix)? {
            let name = keys::extract_name_from_state_key(&key)?;
            if let Some(agent) = self.get_agent(&name)? {
                agents.push(agent);
            }
        }

        Ok(agents)
    }

    // =========================================================================
    // Recording Operations
    // =========================================================================

    fn put_recording(&self, recording: &Recording) -> Result<()> {
        let cf_recordings = self.cf(cf::RECORDINGS)?;
        let cf_by_agent = self.cf(cf::RECORDINGS_BY_AGENT)?;

        let value = Self::serialize(recording)?;
        let old_agent = self
            .get_recording(&recording.id)?
            .and_then(|r| r.agent);

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_recordings, keys::recording_key(&recording.id), &value);

        if let Some(old) = old_agent {
            if recording.agent.as_ref() != Some(&old) {
                batch.delete_cf(&cf_by_agent, keys::agent_recording_key(&old, &recording.id));
            }
        }
        if let Some(agent) = &recording.agent {
            batch.put_cf(&cf_by_agent, keys::agent_recording_key(agent, &recording.id), []);
        }

        self.db.write(batch)?;

        Ok(())
    }

    fn get_recording(&self, id: &RecordingId) -> Result<Option<Recording>> {
        let cf = self.cf(cf::RECORDINGS)?;

        self.db
            .get_cf(&cf, keys::recording_key(id))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn delete_recording(&self, id: &RecordingId) -> Result<()> {
        let cf_recordings = self.cf(cf::RECORDINGS)?;
        let cf_by_agent = self.cf(cf::RECORDINGS_BY_AGENT)?;

        let recording = self.get_recording(id)?.ok_or(StoreError::NotFound)?;

        let mut batch = WriteBatch::default();
        batch.delete_cf(&cf_recordings, keys::recording_key(id));
        if let Some(agent) = &recording.agent {
            batch.delete_cf(&cf_by_agent, keys::agent_recording_key(agent, id));
        }

        self.db.write(batch)?;

        tracing::debug!(recording_id = %id, "Deleted recording record");
        Ok(())
    }

    fn list_recordings(&self) -> Result<Vec<Recording>> {
        self.scan_all(cf::RECORDINGS)
    }

    fn list_recordings_by_agent(&self, name: &AgentName) -> Result<Vec<Recording>> {
        let prefix = keys::agent_prefix(name);

        let mut recordings = Vec::new();
        for key in self.scan_prefix(cf::RECORDINGS_BY_AGENT, &prefix)? {
            let id = keys::extract_recording_id(&key)?;
            if let Some(recording) = self.get_recording(&id)? {
                recordings.push(recording);
            }
        }

        Ok(recordings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_core::RecordingState;
    use chrono::Utc;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn create_test_agent(name: &str, state: AgentState) -> Agent {
        Agent::new(AgentName::new(name).unwrap(), state, Utc::now())
    }

    fn create_test_recording(id: &str, agent: Option<&str>) -> Recording {
        let mut recording = Recording::new(
            RecordingId::new(id).unwrap(),
            RecordingState::Capturing,
            Utc::now(),
        );
        recording.agent = agent.map(|a| AgentName::new(a).unwrap());
        recording
    }

    #[test]
    fn agent_crud() {
        let (store, _dir) = create_test_store();
        let mut agent = create_test_agent("room-101", AgentState::Idle);
        agent
            .capabilities
            .insert("capture.device.names".into(), "screen,camera".into());

        // Create
        store.put_agent(&agent).unwrap();

        // Read
        let retrieved = store.get_agent(&agent.name).unwrap().unwrap();
        assert_eq!(retrieved, agent);

        // Update
        store
            .update_agent_state(&agent.name, AgentState::Capturing)
            .unwrap();
        let updated = store.get_agent(&agent.name).unwrap().unwrap();
        assert_eq!(updated.state, AgentState::Capturing);
        assert_eq!(updated.last_checkin_at, agent.last_checkin_at);

        // Delete
        store.delete_agent(&agent.name).unwrap();
        assert!(store.get_agent(&agent.name).unwrap().is_none());
        assert!(matches!(
            store.delete_agent(&agent.name),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn state_index_follows_updates() {
        let (store, _dir) = create_test_store();
        let agent = create_test_agent("room-101", AgentState::Idle);
        store.put_agent(&agent).unwrap();
        store
            .put_agent(&create_test_agent("room-102", AgentState::Idle))
            .unwrap();

        assert_eq!(store.list_agents_by_state(AgentState::Idle).unwrap().len(), 2);

        store
            .update_agent_state(&agent.name, AgentState::Offline)
            .unwrap();

        assert_eq!(store.list_agents_by_state(AgentState::Idle).unwrap().len(), 1);
        let offline = store.list_agents_by_state(AgentState::Offline).unwrap();
        assert_eq!(offline.len(), 1);
        assert_eq!(offline[0].name, agent.name);

        store.delete_agent(&agent.name).unwrap();
        assert!(store
            .list_agents_by_state(AgentState::Offline)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn list_agents_sorted_by_name() {
        let (store, _dir) = create_test_store();
        for name in ["b-room", "a-room", "c-room"] {
            store
                .put_agent(&create_test_agent(name, AgentState::Idle))
                .unwrap();
        }

        let names: Vec<_> = store
            .list_agents()
            .unwrap()
            .into_iter()
            .map(|a| a.name.to_string())
            .collect();
        assert_eq!(names, ["a-room", "b-room", "c-room"]);
    }

    #[test]
    fn recording_crud() {
        let (store, _dir) = create_test_store();
        let mut recording = create_test_recording("event-1", Some("room-101"));
        recording
            .properties
            .insert("capture.device.names".into(), "screen".into());

        store.put_recording(&recording).unwrap();
        assert_eq!(store.get_recording(&recording.id).unwrap().unwrap(), recording);

        recording.set_state(RecordingState::CaptureFinished, Utc::now());
        store.put_recording(&recording).unwrap();
        assert_eq!(
            store.get_recording(&recording.id).unwrap().unwrap().state,
            RecordingState::CaptureFinished
        );

        store.delete_recording(&recording.id).unwrap();
        assert!(store.get_recording(&recording.id).unwrap().is_none());
        assert!(matches!(
            store.delete_recording(&recording.id),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn recordings_by_agent() {
        let (store, _dir) = create_test_store();
        store
            .put_recording(&create_test_recording("r1", Some("room-1")))
            .unwrap();
        store
            .put_recording(&create_test_recording("r2", Some("room-1")))
            .unwrap();
        store
            .put_recording(&create_test_recording("r3", Some("room-10")))
            .unwrap();
        store
            .put_recording(&create_test_recording("r4", None))
            .unwrap();

        let room1 = AgentName::new("room-1").unwrap();
        assert_eq!(store.list_recordings_by_agent(&room1).unwrap().len(), 2);
        assert_eq!(store.list_recordings().unwrap().len(), 4);

        // Reassigning a recording moves it in the index.
        let mut moved = create_test_recording("r2", Some("room-10"));
        moved.state = RecordingState::Uploading;
        store.put_recording(&moved).unwrap();
        assert_eq!(store.list_recordings_by_agent(&room1).unwrap().len(), 1);
        let room10 = AgentName::new("room-10").unwrap();
        assert_eq!(store.list_recordings_by_agent(&room10).unwrap().len(), 2);
    }

    #[test]
    fn data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = RocksStore::open(dir.path()).unwrap();
            store
                .put_agent(&create_test_agent("room-101", AgentState::Capturing))
                .unwrap();
        }

        let store = RocksStore::open(dir.path()).unwrap();
        let agent = store
            .get_agent(&AgentName::new("room-101").unwrap())
            .unwrap()
            .unwrap();
        assert_eq!(agent.state, AgentState::Capturing);
    }
}

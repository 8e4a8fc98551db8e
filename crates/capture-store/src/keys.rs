//! Key encoding utilities for `RocksDB`.
//!
//! Agent names and recording ids are variable-length, so composite keys join
//! them with a NUL separator, which neither identifier may contain. All
//! composite keys support prefix scans.

use capture_core::{AgentName, RecordingId};

use crate::error::{Result, StoreError};

const SEPARATOR: u8 = 0x00;

/// Encode an agent key (the name bytes).
#[must_use]
pub fn agent_key(name: &AgentName) -> Vec<u8> {
    name.as_bytes().to_vec()
}

/// Encode a state-agent index key: `state || name`.
#[must_use]
pub fn state_agent_key(state: u8, name: &AgentName) -> Vec<u8> {
    let mut key = Vec::with_capacity(1 + name.as_bytes().len());
    key.push(state);
    key.extend_from_slice(name.as_bytes());
    key
}

/// Encode a state prefix for scanning all agents in a state.
#[must_use]
pub fn state_prefix(state: u8) -> Vec<u8> {
    vec![state]
}

/// Extract the agent name from a state-agent key.
///
/// # Errors
///
/// Returns `StoreError::CorruptKey` if the key does not hold a valid name.
pub fn extract_name_from_state_key(key: &[u8]) -> Result<AgentName> {
    let bytes = key
        .get(1..)
        .ok_or_else(|| StoreError::CorruptKey("empty state key".into()))?;
    decode_name(bytes)
}

/// Encode a recording key (the id bytes).
#[must_use]
pub fn recording_key(id: &RecordingId) -> Vec<u8> {
    id.as_bytes().to_vec()
}

/// Encode an agent-recording index key: `name || 0x00 || recording_id`.
#[must_use]
pub fn agent_recording_key(name: &AgentName, id: &RecordingId) -> Vec<u8> {
    let mut key = agent_prefix(name);
    key.extend_from_slice(id.as_bytes());
    key
}

/// Encode an agent prefix for scanning all recordings of an agent.
///
/// The trailing separator keeps `room-1` from matching `room-10`.
#[must_use]
pub fn agent_prefix(name: &AgentName) -> Vec<u8> {
    let mut key = Vec::with_capacity(name.as_bytes().len() + 1);
    key.extend_from_slice(name.as_bytes());
    key.push(SEPARATOR);
    key
}

/// Extract the recording id from an agent-recording key.
///
/// # Errors
///
/// Returns `StoreError::CorruptKey` if the key has no separator or the id is
/// invalid.
pub fn extract_recording_id(key: &[u8]) -> Result<RecordingId> {
    let pos = key
        .iter()
        .position(|b| *b == SEPARATOR)
        .ok_or_else(|| StoreError::CorruptKey("missing separator".into()))?;
    let text = std::str::from_utf8(&key[pos + 1..])
        .map_err(|e| StoreError::CorruptKey(e.to_string()))?;
    Ok(RecordingId::new(text)?)
}

fn decode_name(bytes: &[u8]) -> Result<AgentName> {
    let text = std::str::from_utf8(bytes).map_err(|e| StoreError::CorruptKey(e.to_string()))?;
    Ok(AgentName::new(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> AgentName {
        AgentName::new(s).unwrap()
    }

    fn rid(s: &str) -> RecordingId {
        RecordingId::new(s).unwrap()
    }

    #[test]
    fn state_key_extracts_name() {
        let key = state_agent_key(3, &name("room-101"));
        assert_eq!(key[0], 3);
        assert_eq!(extract_name_from_state_key(&key).unwrap(), name("room-101"));
    }

    #[test]
    fn agent_recording_key_extracts_id() {
        let key = agent_recording_key(&name("room-101"), &rid("event:42"));
        assert_eq!(extract_recording_id(&key).unwrap(), rid("event:42"));
    }

    #[test]
    fn agent_prefix_does_not_match_longer_names() {
        let key = agent_recording_key(&name("room-10"), &rid("r"));
        assert!(key.starts_with(&agent_prefix(&name("room-10"))));
        assert!(!key.starts_with(&agent_prefix(&name("room-1"))));
    }

    #[test]
    fn corrupt_keys_are_reported() {
        assert!(matches!(
            extract_recording_id(b"no-separator"),
            Err(StoreError::CorruptKey(_))
        ));
        assert!(matches!(
            extract_name_from_state_key(&[]),
            Err(StoreError::CorruptKey(_))
        ));
    }
}

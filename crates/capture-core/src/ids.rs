//! Core identifier types for capture status tracking.
//!
//! Agents are identified by a human-assigned name, recordings by an id that is
//! either supplied by the scheduler or generated for unscheduled captures.
//! Both are validated on construction so that storage keys and URL paths
//! built from them are always well-formed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Maximum length of an agent name in bytes.
pub const MAX_AGENT_NAME_LEN: usize = 128;

/// Maximum length of a recording id in bytes.
pub const MAX_RECORDING_ID_LEN: usize = 255;

/// The name of a capture agent.
///
/// Names are 1-128 characters of ASCII alphanumerics, `.`, `_` or `-`.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AgentName(String);

impl AgentName {
    /// Parse and validate an agent name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty, too long, or contains characters
    /// outside `[A-Za-z0-9._-]`.
    pub fn new(name: impl Into<String>) -> Result<Self, IdError> {
        let name = name.into();
        if name.is_empty() {
            return Err(IdError::Empty);
        }
        if name.len() > MAX_AGENT_NAME_LEN {
            return Err(IdError::TooLong {
                max: MAX_AGENT_NAME_LEN,
                got: name.len(),
            });
        }
        if let Some(c) = name
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        {
            return Err(IdError::InvalidCharacter(c));
        }
        Ok(Self(name))
    }

    /// Return the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the name as bytes, for key encoding.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentName({})", self.0)
    }
}

impl fmt::Display for AgentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AgentName {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AgentName {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AgentName> for String {
    fn from(name: AgentName) -> Self {
        name.0
    }
}

impl AsRef<str> for AgentName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The identifier of a single recording.
///
/// Ids are 1-255 characters without whitespace, `/` or NUL, and never `.`
/// or `..`. Agents use the id as a directory name.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RecordingId(String);

impl RecordingId {
    /// Parse and validate a recording id.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty, too long, a relative path
    /// component, or contains whitespace, `/` or NUL.
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdError::Empty);
        }
        if id == "." || id == ".." {
            return Err(IdError::Reserved(id));
        }
        if id.len() > MAX_RECORDING_ID_LEN {
            return Err(IdError::TooLong {
                max: MAX_RECORDING_ID_LEN,
                got: id.len(),
            });
        }
        if let Some(c) = id
            .chars()
            .find(|c| c.is_whitespace() || matches!(c, '/' | '\0'))
        {
            return Err(IdError::InvalidCharacter(c));
        }
        Ok(Self(id))
    }

    /// Generate the id of a capture started without a scheduled id.
    ///
    /// The id has the form `unscheduled-<agent>-<unix millis>`.
    #[must_use]
    pub fn unscheduled(agent: &AgentName, at: DateTime<Utc>) -> Self {
        Self(format!("unscheduled-{agent}-{}", at.timestamp_millis()))
    }

    /// Return the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Return the id as bytes, for key encoding.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordingId({})", self.0)
    }
}

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordingId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for RecordingId {
    type Error = IdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RecordingId> for String {
    fn from(id: RecordingId) -> Self {
        id.0
    }
}

impl AsRef<str> for RecordingId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Errors that can occur when parsing identifiers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    /// The identifier is empty.
    #[error("identifier must not be empty")]
    Empty,

    /// The identifier exceeds the maximum length.
    #[error("identifier too long: max {max} bytes, got {got}")]
    TooLong {
        /// The maximum number of bytes.
        max: usize,
        /// The actual number of bytes.
        got: usize,
    },

    /// The identifier contains a character that is not allowed.
    #[error("invalid character in identifier: {0:?}")]
    InvalidCharacter(char),

    /// The identifier is reserved.
    #[error("reserved identifier: {0}")]
    Reserved(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn agent_name_accepts_typical_names() {
        for name in ["room-101", "hall_A.cam2", "AGENT7"] {
            assert_eq!(AgentName::new(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn agent_name_rejects_empty() {
        assert_eq!(AgentName::new(""), Err(IdError::Empty));
    }

    #[test]
    fn agent_name_rejects_slash_and_space() {
        assert_eq!(
            AgentName::new("room/101"),
            Err(IdError::InvalidCharacter('/'))
        );
        assert_eq!(
            AgentName::new("room 101"),
            Err(IdError::InvalidCharacter(' '))
        );
    }

    #[test]
    fn agent_name_too_long() {
        let name = "a".repeat(MAX_AGENT_NAME_LEN + 1);
        assert!(matches!(
            AgentName::new(name),
            Err(IdError::TooLong { max: 128, got: 129 })
        ));
    }

    #[test]
    fn recording_id_allows_punctuation() {
        let id = RecordingId::new("event:2024-01-01T10:00Z#1").unwrap();
        assert_eq!(id.to_string(), "event:2024-01-01T10:00Z#1");
    }

    #[test]
    fn recording_id_rejects_slash() {
        assert_eq!(
            RecordingId::new("a/b"),
            Err(IdError::InvalidCharacter('/'))
        );
    }

    #[test]
    fn recording_id_rejects_dot_components() {
        assert!(matches!(RecordingId::new(".."), Err(IdError::Reserved(_))));
        assert!(matches!(RecordingId::new("."), Err(IdError::Reserved(_))));
        assert!(RecordingId::new("..take-2").is_ok());
    }

    #[test]
    fn unscheduled_id_embeds_agent_and_time() {
        let agent = AgentName::new("room-101").unwrap();
        let at = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let id = RecordingId::unscheduled(&agent, at);
        assert_eq!(id.as_str(), "unscheduled-room-101-1700000000123");
        assert!(RecordingId::new(id.as_str()).is_ok());
    }

    #[test]
    fn agent_name_serde_rejects_invalid() {
        let result: Result<AgentName, _> = serde_json::from_str("\"bad name\"");
        assert!(result.is_err());

        let name: AgentName = serde_json::from_str("\"room-101\"").unwrap();
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"room-101\"");
    }
}

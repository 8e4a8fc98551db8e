//! Lifecycle state vocabularies for agents and recordings.
//!
//! Both vocabularies are closed: parsing any string outside of them fails.
//! Each state has a stable numeric code used for storage index keys.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle state reported by a capture agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum AgentState {
    /// Ready to capture.
    Idle = 1,
    /// A capture is in progress.
    Capturing = 2,
    /// Captured media is being ingested.
    Uploading = 3,
    /// The agent is stopping its services.
    ShuttingDown = 4,
    /// The agent reported a fault.
    Error = 5,
    /// The agent missed its check-in deadline.
    Offline = 6,
    /// No information about the agent.
    Unknown = 7,
}

impl AgentState {
    /// All agent states, in code order.
    pub const ALL: [Self; 7] = [
        Self::Idle,
        Self::Capturing,
        Self::Uploading,
        Self::ShuttingDown,
        Self::Error,
        Self::Offline,
        Self::Unknown,
    ];

    /// Convert the state to its numeric representation.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Try to convert a numeric value to an `AgentState`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Idle),
            2 => Some(Self::Capturing),
            3 => Some(Self::Uploading),
            4 => Some(Self::ShuttingDown),
            5 => Some(Self::Error),
            6 => Some(Self::Offline),
            7 => Some(Self::Unknown),
            _ => None,
        }
    }

    /// The wire name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Capturing => "capturing",
            Self::Uploading => "uploading",
            Self::ShuttingDown => "shutting_down",
            Self::Error => "error",
            Self::Offline => "offline",
            Self::Unknown => "unknown",
        }
    }

    /// Returns true if the agent can start a new capture.
    #[must_use]
    pub const fn is_available(self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns true if the agent is working on a recording.
    #[must_use]
    pub const fn is_busy(self) -> bool {
        matches!(self, Self::Capturing | Self::Uploading)
    }
}

impl fmt::Display for AgentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentState {
    type Err = StateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| StateParseError::UnknownState(s.to_string()))
    }
}

/// Lifecycle state of a recording.
///
/// States are grouped into processing stages (capture, manifest, compress,
/// upload). A recording only moves forward through the stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum RecordingState {
    /// No information about the recording.
    Unknown = 1,
    /// Media is being captured.
    Capturing = 2,
    /// Capture completed.
    CaptureFinished = 3,
    /// Capture failed.
    CaptureError = 4,
    /// The media manifest is being built.
    Manifest = 5,
    /// The manifest is complete.
    ManifestFinished = 6,
    /// Building the manifest failed.
    ManifestError = 7,
    /// Captured media is being compressed.
    Compressing = 8,
    /// Compression failed.
    CompressingError = 9,
    /// Media is being uploaded.
    Uploading = 10,
    /// Upload completed.
    UploadFinished = 11,
    /// Upload failed.
    UploadError = 12,
}

impl RecordingState {
    /// All recording states, in code order.
    pub const ALL: [Self; 12] = [
        Self::Unknown,
        Self::Capturing,
        Self::CaptureFinished,
        Self::CaptureError,
        Self::Manifest,
        Self::ManifestFinished,
        Self::ManifestError,
        Self::Compressing,
        Self::CompressingError,
        Self::Uploading,
        Self::UploadFinished,
        Self::UploadError,
    ];

    /// Convert the state to its numeric representation.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Try to convert a numeric value to a `RecordingState`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Unknown),
            2 => Some(Self::Capturing),
            3 => Some(Self::CaptureFinished),
            4 => Some(Self::CaptureError),
            5 => Some(Self::Manifest),
            6 => Some(Self::ManifestFinished),
            7 => Some(Self::ManifestError),
            8 => Some(Self::Compressing),
            9 => Some(Self::CompressingError),
            10 => Some(Self::Uploading),
            11 => Some(Self::UploadFinished),
            12 => Some(Self::UploadError),
            _ => None,
        }
    }

    /// The wire name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::Capturing => "capturing",
            Self::CaptureFinished => "capture_finished",
            Self::CaptureError => "capture_error",
            Self::Manifest => "manifest",
            Self::ManifestFinished => "manifest_finished",
            Self::ManifestError => "manifest_error",
            Self::Compressing => "compressing",
            Self::CompressingError => "compressing_error",
            Self::Uploading => "uploading",
            Self::UploadFinished => "upload_finished",
            Self::UploadError => "upload_error",
        }
    }

    /// Processing stage rank. Errors share the rank of the step that produced
    /// them.
    #[must_use]
    pub const fn stage(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Capturing => 1,
            Self::CaptureFinished | Self::CaptureError => 2,
            Self::Manifest => 3,
            Self::ManifestFinished | Self::ManifestError => 4,
            Self::Compressing => 5,
            Self::CompressingError => 6,
            Self::Uploading => 7,
            Self::UploadFinished | Self::UploadError => 8,
        }
    }

    /// Returns true if the state is a failure.
    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(
            self,
            Self::CaptureError | Self::ManifestError | Self::CompressingError | Self::UploadError
        )
    }

    /// Returns true if no further transitions are possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        self.is_error() || matches!(self, Self::UploadFinished)
    }

    /// Check whether moving from `self` to `to` is allowed.
    ///
    /// Re-reporting the current state is always allowed. Otherwise the source
    /// must not be terminal and the target must be at a later stage.
    #[must_use]
    pub const fn can_transition_to(self, to: Self) -> bool {
        if self.as_u8() == to.as_u8() {
            return true;
        }
        !self.is_terminal() && to.stage() > self.stage()
    }
}

impl fmt::Display for RecordingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordingState {
    type Err = StateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        Self::ALL
            .into_iter()
            .find(|state| state.as_str() == normalized)
            .ok_or_else(|| StateParseError::UnknownState(s.to_string()))
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_ascii_lowercase().replace('-', "_")
}

/// Error returned when a state string is outside the vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateParseError {
    /// The string does not name a known state.
    #[error("unknown state: {0}")]
    UnknownState(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agent_state_codes_roundtrip() {
        for state in AgentState::ALL {
            assert_eq!(AgentState::from_u8(state.as_u8()), Some(state));
        }
        assert_eq!(AgentState::from_u8(0), None);
        assert_eq!(AgentState::from_u8(8), None);
    }

    #[test]
    fn agent_state_parse_is_lenient_on_case_and_dashes() {
        assert_eq!("IDLE".parse::<AgentState>(), Ok(AgentState::Idle));
        assert_eq!(
            "shutting-down".parse::<AgentState>(),
            Ok(AgentState::ShuttingDown)
        );
        assert_eq!(
            " capturing ".parse::<AgentState>(),
            Ok(AgentState::Capturing)
        );
    }

    #[test]
    fn agent_state_parse_rejects_unknown_words() {
        assert_eq!(
            "sleeping".parse::<AgentState>(),
            Err(StateParseError::UnknownState("sleeping".into()))
        );
    }

    #[test]
    fn agent_state_serde_matches_display() {
        for state in AgentState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
        }
    }

    #[test]
    fn recording_state_serde_matches_display() {
        for state in RecordingState::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{state}\""));
            assert_eq!(state.as_str().parse::<RecordingState>(), Ok(state));
        }
    }

    #[test]
    fn recording_forward_transitions() {
        use RecordingState::{
            CaptureError, CaptureFinished, Capturing, Manifest, Unknown, UploadFinished, Uploading,
        };

        assert!(Unknown.can_transition_to(Capturing));
        assert!(Capturing.can_transition_to(CaptureFinished));
        assert!(Capturing.can_transition_to(CaptureError));
        assert!(CaptureFinished.can_transition_to(Manifest));
        // Stages may be skipped.
        assert!(CaptureFinished.can_transition_to(Uploading));
        assert!(Uploading.can_transition_to(UploadFinished));
    }

    #[test]
    fn recording_backward_transitions_rejected() {
        use RecordingState::{CaptureError, CaptureFinished, Capturing, Unknown, Uploading};

        assert!(!Uploading.can_transition_to(Capturing));
        assert!(!CaptureFinished.can_transition_to(CaptureError));
        assert!(!Capturing.can_transition_to(Unknown));
    }

    #[test]
    fn terminal_states_only_rereport() {
        use RecordingState::{
            CaptureError, Capturing, CompressingError, ManifestError, UploadError,
            UploadFinished, Uploading,
        };

        for state in [CaptureError, ManifestError, CompressingError, UploadError, UploadFinished] {
            assert!(state.is_terminal());
            assert!(state.can_transition_to(state));
            assert!(!state.can_transition_to(Uploading));
        }
        assert!(!Capturing.is_terminal());
    }
}

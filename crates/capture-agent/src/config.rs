//! Capture agent configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Configuration for a capture agent.
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// Directory under which each recording gets its own subdirectory.
    #[serde(default = "AgentConfig::default_capture_dir")]
    pub capture_dir: PathBuf,

    /// How long to wait for the pipeline to stop before aborting it (seconds).
    #[serde(default = "AgentConfig::default_stop_timeout")]
    pub stop_timeout_seconds: u64,

    /// Interval between check-ins with the admin service (seconds).
    #[serde(default = "AgentConfig::default_checkin_interval")]
    pub checkin_interval_seconds: u64,

    /// URL the admin service can reach this agent at.
    #[serde(default)]
    pub public_url: Option<String>,

    /// How long a reported recording is kept after its last update (seconds).
    #[serde(default = "AgentConfig::default_recording_retention")]
    pub recording_retention_seconds: u64,
}

impl AgentConfig {
    fn default_capture_dir() -> PathBuf {
        PathBuf::from("/var/lib/capture-agent/captures")
    }

    const fn default_stop_timeout() -> u64 {
        30
    }

    const fn default_checkin_interval() -> u64 {
        10
    }

    const fn default_recording_retention() -> u64 {
        24 * 60 * 60
    }

    /// Get the stop timeout as a `Duration`.
    #[must_use]
    pub const fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.stop_timeout_seconds)
    }

    /// Get the check-in interval as a `Duration`. Never zero.
    #[must_use]
    pub fn checkin_interval(&self) -> Duration {
        Duration::from_secs(self.checkin_interval_seconds.max(1))
    }

    /// Get the recording retention as a `Duration`.
    #[must_use]
    pub const fn recording_retention(&self) -> Duration {
        Duration::from_secs(self.recording_retention_seconds)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            capture_dir: Self::default_capture_dir(),
            stop_timeout_seconds: Self::default_stop_timeout(),
            checkin_interval_seconds: Self::default_checkin_interval(),
            public_url: None,
            recording_retention_seconds: Self::default_recording_retention(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = AgentConfig::default();
        assert_eq!(config.stop_timeout(), Duration::from_secs(30));
        assert_eq!(config.checkin_interval(), Duration::from_secs(10));
        assert!(config.public_url.is_none());
        assert_eq!(config.recording_retention(), Duration::from_secs(86_400));
    }

    #[test]
    fn partial_json_uses_defaults() {
        let config: AgentConfig =
            serde_json::from_str(r#"{"capture_dir": "/srv/captures", "checkin_interval_seconds": 0}"#)
                .unwrap();
        assert_eq!(config.capture_dir, PathBuf::from("/srv/captures"));
        assert_eq!(config.stop_timeout_seconds, 30);
        assert_eq!(config.checkin_interval(), Duration::from_secs(1));
    }
}

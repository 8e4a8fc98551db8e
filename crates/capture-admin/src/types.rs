//! Configuration and result types for the admin status service.

use std::time::Duration;

use capture_core::{AgentName, RecordingId};
use serde::{Deserialize, Serialize};

/// Configuration for the admin status service.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminConfig {
    /// How long without a check-in before an agent is marked offline (seconds).
    #[serde(default = "AdminConfig::default_agent_timeout")]
    pub agent_timeout_seconds: u64,

    /// How long a finished or failed recording is kept after its last update (seconds).
    #[serde(default = "AdminConfig::default_recording_ttl")]
    pub recording_ttl_seconds: u64,

    /// Interval between staleness sweeps (seconds).
    #[serde(default = "AdminConfig::default_sweep_interval")]
    pub sweep_interval_seconds: u64,
}

impl AdminConfig {
    const fn default_agent_timeout() -> u64 {
        120 // 2 minutes
    }

    const fn default_recording_ttl() -> u64 {
        86_400 // 1 day
    }

    const fn default_sweep_interval() -> u64 {
        30
    }

    /// Load configuration from environment variables.
    ///
    /// Supported environment variables:
    /// - `AGENT_TIMEOUT_SECONDS`: check-in timeout before an agent goes offline
    /// - `RECORDING_TTL_SECONDS`: retention of terminal recordings
    /// - `SWEEP_INTERVAL_SECONDS`: interval between staleness sweeps
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(n) = env_u64("AGENT_TIMEOUT_SECONDS") {
            config.agent_timeout_seconds = n;
        }
        if let Some(n) = env_u64("RECORDING_TTL_SECONDS") {
            config.recording_ttl_seconds = n;
        }
        if let Some(n) = env_u64("SWEEP_INTERVAL_SECONDS") {
            config.sweep_interval_seconds = n;
        }

        config
    }

    /// Get the agent timeout as a `Duration`.
    #[must_use]
    pub const fn agent_timeout(&self) -> Duration {
        Duration::from_secs(self.agent_timeout_seconds)
    }

    /// Get the recording TTL as a `Duration`.
    #[must_use]
    pub const fn recording_ttl(&self) -> Duration {
        Duration::from_secs(self.recording_ttl_seconds)
    }

    /// Get the sweep interval as a `Duration`. Never zero.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds.max(1))
    }
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            agent_timeout_seconds: Self::default_agent_timeout(),
            recording_ttl_seconds: Self::default_recording_ttl(),
            sweep_interval_seconds: Self::default_sweep_interval(),
        }
    }
}

fn env_u64(key: &str) -> Option<u64> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

/// Outcome of one staleness sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepReport {
    /// Agents marked offline by this sweep.
    pub agents_offline: Vec<AgentName>,
    /// Recordings removed by this sweep.
    pub recordings_expired: Vec<RecordingId>,
}

impl SweepReport {
    /// Returns true if the sweep changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.agents_offline.is_empty() && self.recordings_expired.is_empty()
    }
}

//! Background staleness sweeps.
//!
//! `StaleMonitor` periodically asks the admin service to mark agents that
//! stopped checking in as offline and to expire old finished recordings.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::service::CaptureAdmin;

/// Runs `CaptureAdmin::sweep` on a fixed interval.
pub struct StaleMonitor {
    admin: Arc<dyn CaptureAdmin>,
    interval: Duration,
}

impl StaleMonitor {
    /// Create a monitor that sweeps every `interval`.
    #[must_use]
    pub fn new(admin: Arc<dyn CaptureAdmin>, interval: Duration) -> Self {
        Self { admin, interval }
    }

    /// Run a single sweep now, logging the outcome.
    pub async fn tick(&self) {
        match self.admin.sweep(Utc::now()).await {
            Ok(report) if !report.is_empty() => {
                tracing::info!(
                    agents_offline = report.agents_offline.len(),
                    recordings_expired = report.recordings_expired.len(),
                    "Staleness sweep changed state"
                );
            }
            Ok(_) => tracing::trace!("Staleness sweep found nothing"),
            Err(e) => tracing::error!(error = %e, "Staleness sweep failed"),
        }
    }

    /// Sweep forever. The first sweep runs immediately.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(interval_secs = self.interval.as_secs(), "Starting staleness monitor");

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// Spawn the monitor as a background task.
    #[must_use]
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AdminConfig, CaptureAdminService};
    use capture_core::{Agent, AgentName, AgentState};
    use capture_store::{MemoryStore, Store};

    #[tokio::test(start_paused = true)]
    async fn monitor_marks_silent_agents_offline() {
        let store = Arc::new(MemoryStore::new());
        let name = AgentName::new("room-101").unwrap();
        let silent_since = Utc::now() - chrono::Duration::hours(1);
        store
            .put_agent(&Agent::new(name.clone(), AgentState::Idle, silent_since))
            .unwrap();

        let admin = Arc::new(CaptureAdminService::new(
            Arc::clone(&store),
            AdminConfig::default(),
        ));
        let handle = StaleMonitor::new(admin, Duration::from_secs(30)).spawn();

        tokio::time::sleep(Duration::from_millis(10)).await;

        let agent = store.get_agent(&name).unwrap().unwrap();
        assert_eq!(agent.state, AgentState::Offline);

        handle.abort();
    }
}

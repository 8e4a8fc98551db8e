//! Admin status service implementation.
//!
//! This module provides the `CaptureAdmin` trait and `CaptureAdminService`
//! implementation that records agent check-ins and recording states and
//! answers status queries with state-update snapshots.

use std::sync::Arc;

use async_trait::async_trait;
use capture_core::{
    elapsed_millis, Agent, AgentName, AgentState, AgentStateUpdate, Properties, Recording,
    RecordingId, RecordingState, RecordingStateUpdate,
};
use capture_store::Store;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::{AdminError, Result};
use crate::lifecycle;
use crate::types::{AdminConfig, SweepReport};

/// Trait defining the admin status operations.
///
/// Agents push their state through `check_in` and recording updates;
/// polling clients read snapshots back.
#[async_trait]
pub trait CaptureAdmin: Send + Sync {
    // =========================================================================
    // Agent Operations
    // =========================================================================

    /// Record a check-in from an agent, registering it on first contact.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Store` if the agent cannot be persisted.
    async fn check_in(
        &self,
        name: &AgentName,
        state: AgentState,
        url: Option<String>,
    ) -> Result<AgentStateUpdate>;

    /// Get the full agent record.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::AgentNotFound` if the agent doesn't exist.
    async fn get_agent(&self, name: &AgentName) -> Result<Agent>;

    /// Get a snapshot of an agent's state.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::AgentNotFound` if the agent doesn't exist.
    async fn agent_state(&self, name: &AgentName) -> Result<AgentStateUpdate>;

    /// List snapshots of all known agents, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Store` if the store cannot be read.
    async fn list_agents(&self) -> Result<Vec<AgentStateUpdate>>;

    /// Forget an agent.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::AgentNotFound` if the agent doesn't exist.
    async fn remove_agent(&self, name: &AgentName) -> Result<()>;

    // =========================================================================
    // Agent Properties
    // =========================================================================

    /// Replace the capabilities an agent advertises.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::AgentNotFound` if the agent doesn't exist.
    async fn set_agent_capabilities(&self, name: &AgentName, capabilities: Properties)
        -> Result<()>;

    /// Get the capabilities an agent advertises.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::AgentNotFound` if the agent doesn't exist.
    async fn agent_capabilities(&self, name: &AgentName) -> Result<Properties>;

    /// Replace the configuration an agent runs with.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::AgentNotFound` if the agent doesn't exist.
    async fn set_agent_configuration(
        &self,
        name: &AgentName,
        configuration: Properties,
    ) -> Result<()>;

    /// Get the configuration an agent runs with.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::AgentNotFound` if the agent doesn't exist.
    async fn agent_configuration(&self, name: &AgentName) -> Result<Properties>;

    // =========================================================================
    // Recording Operations
    // =========================================================================

    /// Update a recording's state, creating the recording if it is unknown.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::InvalidTransition` if the recording cannot move
    /// to `state`.
    async fn update_recording_state(
        &self,
        id: &RecordingId,
        state: RecordingState,
        agent: Option<AgentName>,
    ) -> Result<RecordingStateUpdate>;

    /// Get the full recording record.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::RecordingNotFound` if the recording doesn't exist.
    async fn get_recording(&self, id: &RecordingId) -> Result<Recording>;

    /// Get a snapshot of a recording's state.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::RecordingNotFound` if the recording doesn't exist.
    async fn recording_state(&self, id: &RecordingId) -> Result<RecordingStateUpdate>;

    /// List snapshots of all known recordings, sorted by id.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Store` if the store cannot be read.
    async fn list_recordings(&self) -> Result<Vec<RecordingStateUpdate>>;

    /// Forget a recording.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::RecordingNotFound` if the recording doesn't exist.
    async fn remove_recording(&self, id: &RecordingId) -> Result<()>;

    // =========================================================================
    // Operational
    // =========================================================================

    /// Mark stale agents offline and drop expired recordings as of `now`.
    ///
    /// # Errors
    ///
    /// Returns `AdminError::Store` if the store cannot be read or written.
    async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport>;
}

/// The main admin status service implementation.
pub struct CaptureAdminService<S: Store> {
    store: Arc<S>,
    config: AdminConfig,
    /// Serializes read-modify-write cycles against the store.
    write_lock: Mutex<()>,
}

impl<S: Store> CaptureAdminService<S> {
    /// Create a new admin service.
    #[must_use]
    pub fn new(store: Arc<S>, config: AdminConfig) -> Self {
        Self {
            store,
            config,
            write_lock: Mutex::new(()),
        }
    }

    /// Create with default configuration.
    #[must_use]
    pub fn with_defaults(store: Arc<S>) -> Self {
        Self::new(store, AdminConfig::default())
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &AdminConfig {
        &self.config
    }

    fn load_agent(&self, name: &AgentName) -> Result<Agent> {
        self.store
            .get_agent(name)?
            .ok_or_else(|| AdminError::AgentNotFound(name.clone()))
    }

    fn load_recording(&self, id: &RecordingId) -> Result<Recording> {
        self.store
            .get_recording(id)?
            .ok_or_else(|| AdminError::RecordingNotFound(id.clone()))
    }

    /// Apply `f` to a stored agent and write it back.
    fn modify_agent(&self, name: &AgentName, f: impl FnOnce(&mut Agent)) -> Result<()> {
        let _guard = self.write_lock.lock();
        let mut agent = self.load_agent(name)?;
        f(&mut agent);
        self.store.put_agent(&agent)?;
        Ok(())
    }

    /// Record a check-in at an explicit time.
    fn check_in_at(
        &self,
        name: &AgentName,
        state: AgentState,
        url: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<AgentStateUpdate> {
        let _guard = self.write_lock.lock();

        let agent = match self.store.get_agent(name)? {
            Some(mut agent) => {
                if agent.state != state {
                    tracing::info!(
                        agent = %name,
                        from = %agent.state,
                        to = %state,
                        "Agent changed state"
                    );
                }
                agent.check_in(state, now);
                if url.is_some() {
                    agent.url = url;
                }
                agent
            }
            None => {
                let mut agent = Agent::new(name.clone(), state, now);
                agent.url = url;
                tracing::info!(agent = %name, state = %state, "Registered agent");
                agent
            }
        };

        self.store.put_agent(&agent)?;
        tracing::debug!(agent = %name, state = %state, "Processed check-in");

        Ok(AgentStateUpdate::at(&agent, now))
    }

    /// Update a recording at an explicit time.
    fn update_recording_at(
        &self,
        id: &RecordingId,
        state: RecordingState,
        agent: Option<AgentName>,
        now: DateTime<Utc>,
    ) -> Result<RecordingStateUpdate> {
        let _guard = self.write_lock.lock();

        let recording = match self.store.get_recording(id)? {
            Some(mut recording) => {
                lifecycle::validate_transition(id, recording.state, state)?;
                recording.set_state(state, now);
                if agent.is_some() {
                    recording.agent = agent;
                }
                recording
            }
            None => {
                let mut recording = Recording::new(id.clone(), state, now);
                recording.agent = agent;
                tracing::info!(recording_id = %id, "Tracking new recording");
                recording
            }
        };

        self.store.put_recording(&recording)?;
        tracing::debug!(recording_id = %id, state = %state, "Updated recording state");

        Ok(RecordingStateUpdate::at(&recording, now))
    }
}

#[async_trait]
impl<S: Store + 'static> CaptureAdmin for CaptureAdminService<S> {
    // =========================================================================
    // Agent Operations
    // =========================================================================

    async fn check_in(
        &self,
        name: &AgentName,
        state: AgentState,
        url: Option<String>,
    ) -> Result<AgentStateUpdate> {
        self.check_in_at(name, state, url, Utc::now())
    }

    async fn get_agent(&self, name: &AgentName) -> Result<Agent> {
        self.load_agent(name)
    }

    async fn agent_state(&self, name: &AgentName) -> Result<AgentStateUpdate> {
        Ok(AgentStateUpdate::new(&self.load_agent(name)?))
    }

    async fn list_agents(&self) -> Result<Vec<AgentStateUpdate>> {
        let now = Utc::now();
        let mut agents = self.store.list_agents()?;
        agents.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(agents
            .iter()
            .map(|agent| AgentStateUpdate::at(agent, now))
            .collect())
    }

    async fn remove_agent(&self, name: &AgentName) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.load_agent(name)?;
        self.store.delete_agent(name)?;

        tracing::info!(agent = %name, "Removed agent");
        Ok(())
    }

    // =========================================================================
    // Agent Properties
    // =========================================================================

    async fn set_agent_capabilities(
        &self,
        name: &AgentName,
        capabilities: Properties,
    ) -> Result<()> {
        let count = capabilities.len();
        self.modify_agent(name, |agent| agent.capabilities = capabilities)?;
        tracing::debug!(agent = %name, count, "Updated agent capabilities");
        Ok(())
    }

    async fn agent_capabilities(&self, name: &AgentName) -> Result<Properties> {
        Ok(self.load_agent(name)?.capabilities)
    }

    async fn set_agent_configuration(
        &self,
        name: &AgentName,
        configuration: Properties,
    ) -> Result<()> {
        let count = configuration.len();
        self.modify_agent(name, |agent| agent.configuration = configuration)?;
        tracing::debug!(agent = %name, count, "Updated agent configuration");
        Ok(())
    }

    async fn agent_configuration(&self, name: &AgentName) -> Result<Properties> {
        Ok(self.load_agent(name)?.configuration)
    }

    // =========================================================================
    // Recording Operations
    // =========================================================================

    async fn update_recording_state(
        &self,
        id: &RecordingId,
        state: RecordingState,
        agent: Option<AgentName>,
    ) -> Result<RecordingStateUpdate> {
        self.update_recording_at(id, state, agent, Utc::now())
    }

    async fn get_recording(&self, id: &RecordingId) -> Result<Recording> {
        self.load_recording(id)
    }

    async fn recording_state(&self, id: &RecordingId) -> Result<RecordingStateUpdate> {
        Ok(RecordingStateUpdate::new(&self.load_recording(id)?))
    }

    async fn list_recordings(&self) -> Result<Vec<RecordingStateUpdate>> {
        let now = Utc::now();
        let mut recordings = self.store.list_recordings()?;
        recordings.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(recordings
            .iter()
            .map(|recording| RecordingStateUpdate::at(recording, now))
            .collect())
    }

    async fn remove_recording(&self, id: &RecordingId) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.load_recording(id)?;
        self.store.delete_recording(id)?;

        tracing::info!(recording_id = %id, "Removed recording");
        Ok(())
    }

    // =========================================================================
    // Operational
    // =========================================================================

    async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport> {
        let timeout = u64::try_from(self.config.agent_timeout().as_millis()).unwrap_or(u64::MAX);
        let ttl = u64::try_from(self.config.recording_ttl().as_millis()).unwrap_or(u64::MAX);
        let mut report = SweepReport::default();

        let _guard = self.write_lock.lock();

        for agent in self.store.list_agents()? {
            if agent.state == AgentState::Offline {
                continue;
            }
            let silent_for = elapsed_millis(agent.last_checkin_at, now);
            if silent_for > timeout {
                self.store
                    .update_agent_state(&agent.name, AgentState::Offline)?;
                tracing::warn!(
                    agent = %agent.name,
                    last_state = %agent.state,
                    silent_ms = silent_for,
                    "Agent missed check-ins, marking offline"
                );
                report.agents_offline.push(agent.name);
            }
        }

        for recording in self.store.list_recordings()? {
            if lifecycle::is_expirable(recording.state)
                && elapsed_millis(recording.last_update_at, now) > ttl
            {
                self.store.delete_recording(&recording.id)?;
                tracing::debug!(
                    recording_id = %recording.id,
                    state = %recording.state,
                    "Expired recording"
                );
                report.recordings_expired.push(recording.id);
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use capture_store::{MemoryStore, RocksStore};
    use chrono::Duration;
    use tempfile::TempDir;

    fn setup() -> (CaptureAdminService<RocksStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let config = AdminConfig {
            agent_timeout_seconds: 60,
            recording_ttl_seconds: 3600,
            ..Default::default()
        };
        (CaptureAdminService::new(store, config), dir)
    }

    fn name(s: &str) -> AgentName {
        AgentName::new(s).unwrap()
    }

    fn rid(s: &str) -> RecordingId {
        RecordingId::new(s).unwrap()
    }

    #[tokio::test]
    async fn check_in_registers_agent() {
        let (service, _dir) = setup();
        let room = name("room-101");

        let update = service
            .check_in(&room, AgentState::Idle, Some("http://room-101:8080".into()))
            .await
            .unwrap();
        assert_eq!(update.name.as_ref(), Some(&room));
        assert_eq!(update.state, Some(AgentState::Idle));

        let agent = service.get_agent(&room).await.unwrap();
        assert_eq!(agent.url.as_deref(), Some("http://room-101:8080"));
        assert_eq!(agent.registered_at, agent.last_checkin_at);
    }

    #[tokio::test]
    async fn check_in_updates_state_and_keeps_url() {
        let (service, _dir) = setup();
        let room = name("room-101");

        service
            .check_in(&room, AgentState::Idle, Some("http://a".into()))
            .await
            .unwrap();
        service
            .check_in(&room, AgentState::Capturing, None)
            .await
            .unwrap();

        let agent = service.get_agent(&room).await.unwrap();
        assert_eq!(agent.state, AgentState::Capturing);
        assert_eq!(agent.url.as_deref(), Some("http://a"));
    }

    #[tokio::test]
    async fn check_in_time_never_goes_backwards() {
        let (service, _dir) = setup();
        let room = name("room-101");
        let t0 = Utc::now();

        service
            .check_in_at(&room, AgentState::Idle, None, t0)
            .unwrap();
        service
            .check_in_at(&room, AgentState::Idle, None, t0 - Duration::seconds(30))
            .unwrap();

        let agent = service.get_agent(&room).await.unwrap();
        assert_eq!(agent.last_checkin_at, t0);
    }

    #[tokio::test]
    async fn unknown_agent_queries_fail() {
        let (service, _dir) = setup();
        let ghost = name("ghost");

        assert!(matches!(
            service.agent_state(&ghost).await,
            Err(AdminError::AgentNotFound(_))
        ));
        assert!(matches!(
            service.remove_agent(&ghost).await,
            Err(AdminError::AgentNotFound(_))
        ));
        assert!(matches!(
            service
                .set_agent_capabilities(&ghost, Properties::new())
                .await,
            Err(AdminError::AgentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn list_agents_sorted() {
        let (service, _dir) = setup();
        for n in ["c", "a", "b"] {
            service
                .check_in(&name(n), AgentState::Idle, None)
                .await
                .unwrap();
        }

        let names: Vec<_> = service
            .list_agents()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.name.unwrap().to_string())
            .collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[tokio::test]
    async fn agent_properties() {
        let (service, _dir) = setup();
        let room = name("room-101");
        service.check_in(&room, AgentState::Idle, None).await.unwrap();

        let mut caps = Properties::new();
        caps.insert("capture.device.names".into(), "screen".into());
        service
            .set_agent_capabilities(&room, caps.clone())
            .await
            .unwrap();

        let mut conf = Properties::new();
        conf.insert("capture.max.length".into(), "28800".into());
        service
            .set_agent_configuration(&room, conf.clone())
            .await
            .unwrap();

        assert_eq!(service.agent_capabilities(&room).await.unwrap(), caps);
        assert_eq!(service.agent_configuration(&room).await.unwrap(), conf);

        // Check-ins leave properties alone.
        service
            .check_in(&room, AgentState::Capturing, None)
            .await
            .unwrap();
        assert_eq!(service.agent_capabilities(&room).await.unwrap(), caps);
    }

    #[tokio::test]
    async fn recording_lifecycle() {
        let (service, _dir) = setup();
        let id = rid("event-1");
        let room = name("room-101");

        let update = service
            .update_recording_state(&id, RecordingState::Capturing, Some(room.clone()))
            .await
            .unwrap();
        assert_eq!(update.state, Some(RecordingState::Capturing));

        for state in [
            RecordingState::CaptureFinished,
            RecordingState::Uploading,
            RecordingState::UploadFinished,
        ] {
            service
                .update_recording_state(&id, state, None)
                .await
                .unwrap();
        }

        let recording = service.get_recording(&id).await.unwrap();
        assert_eq!(recording.state, RecordingState::UploadFinished);
        assert_eq!(recording.agent, Some(room));

        service.remove_recording(&id).await.unwrap();
        assert!(matches!(
            service.recording_state(&id).await,
            Err(AdminError::RecordingNotFound(_))
        ));
    }

    #[tokio::test]
    async fn invalid_recording_transition_rejected() {
        let (service, _dir) = setup();
        let id = rid("event-1");

        service
            .update_recording_state(&id, RecordingState::CaptureError, None)
            .await
            .unwrap();

        let result = service
            .update_recording_state(&id, RecordingState::Uploading, None)
            .await;
        assert!(matches!(
            result,
            Err(AdminError::InvalidTransition {
                from: RecordingState::CaptureError,
                to: RecordingState::Uploading,
                ..
            })
        ));

        // State is unchanged after the rejected update.
        let recording = service.get_recording(&id).await.unwrap();
        assert_eq!(recording.state, RecordingState::CaptureError);
    }

    #[tokio::test]
    async fn sweep_marks_stale_agents_offline() {
        let (service, _dir) = setup();
        let t0 = Utc::now();
        service
            .check_in_at(&name("stale"), AgentState::Capturing, None, t0)
            .unwrap();
        service
            .check_in_at(
                &name("fresh"),
                AgentState::Idle,
                None,
                t0 + Duration::seconds(100),
            )
            .unwrap();

        let report = service.sweep(t0 + Duration::seconds(120)).await.unwrap();
        assert_eq!(report.agents_offline, vec![name("stale")]);

        let stale = service.get_agent(&name("stale")).await.unwrap();
        assert_eq!(stale.state, AgentState::Offline);
        assert_eq!(stale.last_checkin_at, t0);

        // A second sweep does not report the same agent again.
        let report = service.sweep(t0 + Duration::seconds(130)).await.unwrap();
        assert!(report.is_empty());

        // Checking in again brings the agent back.
        service
            .check_in(&name("stale"), AgentState::Idle, None)
            .await
            .unwrap();
        assert_eq!(
            service.get_agent(&name("stale")).await.unwrap().state,
            AgentState::Idle
        );
    }

    #[tokio::test]
    async fn sweep_expires_only_terminal_recordings() {
        let store = Arc::new(MemoryStore::new());
        let service = CaptureAdminService::new(
            store,
            AdminConfig {
                recording_ttl_seconds: 60,
                ..Default::default()
            },
        );
        let t0 = Utc::now();
        service
            .update_recording_at(&rid("done"), RecordingState::UploadFinished, None, t0)
            .unwrap();
        service
            .update_recording_at(&rid("busy"), RecordingState::Uploading, None, t0)
            .unwrap();

        let report = service.sweep(t0 + Duration::seconds(30)).await.unwrap();
        assert!(report.recordings_expired.is_empty());

        let report = service.sweep(t0 + Duration::seconds(61)).await.unwrap();
        assert_eq!(report.recordings_expired, vec![rid("done")]);

        let remaining = service.list_recordings().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, Some(rid("busy")));
    }
}

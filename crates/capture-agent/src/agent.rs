//! The device-side capture agent.
//!
//! `CaptureAgent` owns the agent's state, the recordings it has captured and
//! the capture framework. It answers status queries and turns capture
//! requests into pipeline sessions.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Duration;

use capture_core::{
    Agent, AgentName, AgentState, AgentStateUpdate, Properties, Recording, RecordingId,
    RecordingState, RecordingStateUpdate,
};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::config::AgentConfig;
use crate::error::{AgentError, PipelineError, Result};
use crate::pipeline::{CaptureBackend, CaptureFramework, FailureHandler};
use crate::status::StatusService;

/// Property holding the id to capture under.
pub const RECORDING_ID_PROPERTY: &str = "capture.recording.id";

struct AgentData {
    agent: Agent,
    recordings: BTreeMap<RecordingId, Recording>,
    /// Last state the admin service accepted for each recording.
    reported: BTreeMap<RecordingId, RecordingState>,
    active: Option<RecordingId>,
}

struct AgentInner {
    config: AgentConfig,
    data: Mutex<AgentData>,
    framework: CaptureFramework,
}

/// A capture agent. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct CaptureAgent {
    inner: Arc<AgentInner>,
}

impl CaptureAgent {
    /// Create an idle agent named `name` capturing through `backend`.
    #[must_use]
    pub fn new(name: AgentName, config: AgentConfig, backend: Arc<dyn CaptureBackend>) -> Self {
        let mut agent = Agent::new(name, AgentState::Idle, Utc::now());
        agent.url.clone_from(&config.public_url);

        Self {
            inner: Arc::new(AgentInner {
                config,
                data: Mutex::new(AgentData {
                    agent,
                    recordings: BTreeMap::new(),
                    reported: BTreeMap::new(),
                    active: None,
                }),
                framework: CaptureFramework::new(backend),
            }),
        }
    }

    /// The agent's name.
    #[must_use]
    pub fn name(&self) -> AgentName {
        self.inner.data.lock().agent.name.clone()
    }

    /// The URL the agent advertises, if any.
    #[must_use]
    pub fn url(&self) -> Option<String> {
        self.inner.data.lock().agent.url.clone()
    }

    /// The agent's configuration.
    #[must_use]
    pub fn config(&self) -> &AgentConfig {
        &self.inner.config
    }

    /// The capabilities the agent advertises.
    #[must_use]
    pub fn capabilities(&self) -> Properties {
        self.inner.data.lock().agent.capabilities.clone()
    }

    /// Replace the capabilities the agent advertises.
    pub fn set_capabilities(&self, capabilities: Properties) {
        self.inner.data.lock().agent.capabilities = capabilities;
    }

    /// Id of the recording being captured, if any.
    #[must_use]
    pub fn active_recording(&self) -> Option<RecordingId> {
        self.inner.data.lock().active.clone()
    }

    /// Snapshot of the agent's state.
    #[must_use]
    pub fn agent_state_update(&self) -> AgentStateUpdate {
        AgentStateUpdate::new(&self.inner.data.lock().agent)
    }

    /// Snapshot of one recording, or `None` if the id is unknown.
    #[must_use]
    pub fn recording_state_update(&self, id: &RecordingId) -> Option<RecordingStateUpdate> {
        self.inner
            .data
            .lock()
            .recordings
            .get(id)
            .map(RecordingStateUpdate::new)
    }

    /// Snapshots of every recording, sorted by id.
    #[must_use]
    pub fn recording_state_updates(&self) -> Vec<RecordingStateUpdate> {
        let now = Utc::now();
        self.inner
            .data
            .lock()
            .recordings
            .values()
            .map(|recording| RecordingStateUpdate::at(recording, now))
            .collect()
    }

    /// A copy of one recording.
    #[must_use]
    pub fn recording(&self, id: &RecordingId) -> Option<Recording> {
        self.inner.data.lock().recordings.get(id).cloned()
    }

    /// Start capturing with the given properties.
    ///
    /// The recording id comes from the `capture.recording.id` property, or is
    /// generated for an unscheduled capture.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::AgentBusy` unless the agent is idle,
    /// `AgentError::RecordingExists` for a duplicate id, or the error that
    /// kept the capture from starting.
    pub async fn start_capture(&self, properties: Properties) -> Result<RecordingId> {
        let now = Utc::now();

        let recording = {
            let mut data = self.inner.data.lock();
            if data.agent.state != AgentState::Idle {
                return Err(AgentError::AgentBusy(data.agent.state));
            }

            let id = match properties.get(RECORDING_ID_PROPERTY) {
                Some(id) => RecordingId::new(id.as_str())?,
                None => RecordingId::unscheduled(&data.agent.name, now),
            };
            if data.recordings.contains_key(&id) {
                return Err(AgentError::RecordingExists(id));
            }

            let mut recording = Recording::new(id.clone(), RecordingState::Capturing, now);
            recording.agent = Some(data.agent.name.clone());
            recording.properties = properties;
            recording.directory = Some(self.inner.config.capture_dir.join(id.as_str()));

            data.recordings.insert(id.clone(), recording.clone());
            data.active = Some(id);
            data.agent.check_in(AgentState::Capturing, now);
            recording
        };

        let id = recording.id.clone();
        tracing::info!(recording_id = %id, "Starting capture");

        if let Some(directory) = &recording.directory {
            if let Err(e) = tokio::fs::create_dir_all(directory).await {
                self.inner.finish_capture(&id, RecordingState::CaptureError);
                return Err(e.into());
            }
        }

        let handler: Arc<dyn FailureHandler> = Arc::clone(&self.inner) as Arc<dyn FailureHandler>;
        if let Err(e) = self.inner.framework.start(recording, handler) {
            tracing::error!(recording_id = %id, error = %e, "Capture failed to start");
            self.inner.finish_capture(&id, RecordingState::CaptureError);
            return Err(e.into());
        }

        Ok(id)
    }

    /// Stop the capture of `id`.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::NotActive` if `id` is not being captured, or the
    /// pipeline error the capture stopped with.
    pub async fn stop_capture(&self, id: &RecordingId) -> Result<RecordingStateUpdate> {
        if self.inner.data.lock().active.as_ref() != Some(id) {
            return Err(AgentError::NotActive(id.clone()));
        }

        tracing::info!(recording_id = %id, "Stopping capture");

        match self.inner.framework.stop(self.inner.config.stop_timeout()).await {
            Ok(()) => {
                self.inner.finish_capture(id, RecordingState::CaptureFinished);
                self.recording_state_update(id)
                    .ok_or_else(|| AgentError::RecordingNotFound(id.clone()))
            }
            // The session ended on its own and its handler settles the state.
            Err(PipelineError::NotCapturing) => Err(AgentError::NotActive(id.clone())),
            Err(e) => {
                self.inner.finish_capture(id, RecordingState::CaptureError);
                Err(e.into())
            }
        }
    }

    /// Move a recording to a later processing state.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::RecordingNotFound` for an unknown id or
    /// `AgentError::InvalidTransition` if the recording cannot move to `state`.
    pub fn set_recording_state(
        &self,
        id: &RecordingId,
        state: RecordingState,
    ) -> Result<RecordingStateUpdate> {
        let now = Utc::now();
        let mut data = self.inner.data.lock();
        let recording = data
            .recordings
            .get_mut(id)
            .ok_or_else(|| AgentError::RecordingNotFound(id.clone()))?;

        if !recording.state.can_transition_to(state) {
            return Err(AgentError::InvalidTransition {
                id: id.clone(),
                from: recording.state,
                to: state,
            });
        }

        recording.set_state(state, now);
        tracing::debug!(recording_id = %id, state = %state, "Recording state changed");
        Ok(RecordingStateUpdate::at(recording, now))
    }

    /// Forget a recording.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::RecordingActive` while it is being captured, or
    /// `AgentError::RecordingNotFound` for an unknown id.
    pub fn remove_recording(&self, id: &RecordingId) -> Result<Recording> {
        let mut data = self.inner.data.lock();
        if data.active.as_ref() == Some(id) {
            return Err(AgentError::RecordingActive(id.clone()));
        }
        let recording = data
            .recordings
            .remove(id)
            .ok_or_else(|| AgentError::RecordingNotFound(id.clone()))?;
        data.reported.remove(id);

        tracing::info!(recording_id = %id, "Removed recording");
        Ok(recording)
    }

    /// Recordings whose current state the admin service has not accepted yet.
    #[must_use]
    pub fn unreported_recordings(&self) -> Vec<(RecordingId, RecordingState)> {
        let data = self.inner.data.lock();
        data.recordings
            .values()
            .filter(|recording| data.reported.get(&recording.id) != Some(&recording.state))
            .map(|recording| (recording.id.clone(), recording.state))
            .collect()
    }

    /// Note that the admin service accepted `state` for `id`.
    pub fn mark_reported(&self, id: &RecordingId, state: RecordingState) {
        let mut data = self.inner.data.lock();
        if data.recordings.contains_key(id) {
            data.reported.insert(id.clone(), state);
        }
    }

    /// Drop recordings that have sat in a reported state for longer than the
    /// configured retention as of `now`. Returns the ids removed.
    pub fn prune_recordings(&self, now: DateTime<Utc>) -> Vec<RecordingId> {
        let retention = chrono::Duration::from_std(self.inner.config.recording_retention())
            .unwrap_or(chrono::Duration::MAX);

        let mut data = self.inner.data.lock();
        let AgentData {
            recordings,
            reported,
            active,
            ..
        } = &mut *data;

        let expired: Vec<RecordingId> = recordings
            .values()
            .filter(|recording| {
                active.as_ref() != Some(&recording.id)
                    && reported.get(&recording.id) == Some(&recording.state)
                    && now - recording.last_update_at > retention
            })
            .map(|recording| recording.id.clone())
            .collect();

        for id in &expired {
            recordings.remove(id);
            reported.remove(id);
            tracing::info!(recording_id = %id, "Pruned expired recording");
        }
        expired
    }

    /// Shut the agent down, stopping any capture within `timeout`.
    ///
    /// The agent stays `shutting_down` and refuses new captures.
    ///
    /// # Errors
    ///
    /// Returns the pipeline error the running capture stopped with.
    pub async fn shutdown(&self, timeout: Duration) -> Result<()> {
        let active = {
            let mut data = self.inner.data.lock();
            data.agent.check_in(AgentState::ShuttingDown, Utc::now());
            data.active.clone()
        };

        tracing::info!(agent = %self.name(), "Shutting down capture agent");

        let Some(id) = active else {
            return Ok(());
        };

        match self.inner.framework.stop(timeout).await {
            Ok(()) => {
                self.inner.finish_capture(&id, RecordingState::CaptureFinished);
                Ok(())
            }
            Err(PipelineError::NotCapturing) => Ok(()),
            Err(e) => {
                self.inner.finish_capture(&id, RecordingState::CaptureError);
                Err(e.into())
            }
        }
    }
}

impl AgentInner {
    /// Settle the capture of `id` in `state` and release the agent.
    fn finish_capture(&self, id: &RecordingId, state: RecordingState) {
        let now = Utc::now();
        let mut data = self.data.lock();
        if data.active.as_ref() != Some(id) {
            return;
        }
        data.active = None;

        if let Some(recording) = data.recordings.get_mut(id) {
            if recording.state.can_transition_to(state) {
                recording.set_state(state, now);
            }
        }
        if data.agent.state == AgentState::Capturing {
            data.agent.check_in(AgentState::Idle, now);
        }

        tracing::info!(recording_id = %id, state = %state, "Capture finished");
    }
}

impl FailureHandler for AgentInner {
    fn capture_failed(&self, id: &RecordingId, error: &PipelineError) {
        tracing::error!(recording_id = %id, error = %error, "Capture pipeline failed");
        self.finish_capture(id, RecordingState::CaptureError);
    }

    fn capture_completed(&self, id: &RecordingId) {
        self.finish_capture(id, RecordingState::CaptureFinished);
    }
}

impl StatusService for CaptureAgent {
    fn agent_state(&self) -> AgentState {
        self.inner.data.lock().agent.state
    }

    fn recordings(&self) -> BTreeSet<RecordingId> {
        self.inner.data.lock().recordings.keys().cloned().collect()
    }

    fn recording_state(&self, id: &RecordingId) -> Option<RecordingState> {
        self.inner.data.lock().recordings.get(id).map(|r| r.state)
    }
}

//! Check-ins with the admin status service.
//!
//! This module provides the `StateReporter` for pushing the agent's state and
//! its recordings' states to the admin REST API, plus the periodic check-in
//! loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use capture_core::{AgentName, AgentState, Properties, RecordingId, RecordingState};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::time::MissedTickBehavior;

use crate::agent::CaptureAgent;
use crate::error::{AgentError, Result};
use crate::status::StatusService;

/// Trait for reporting state to the admin service.
///
/// This trait abstracts the transport, allowing for mock implementations in
/// tests.
#[async_trait]
pub trait StateReporter: Send + Sync {
    /// Check in with the agent's current state.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the admin rejects it.
    async fn report_agent_state(
        &self,
        name: &AgentName,
        state: AgentState,
        url: Option<&str>,
    ) -> Result<()>;

    /// Report a recording's state.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the admin rejects it.
    async fn report_recording_state(
        &self,
        id: &RecordingId,
        state: RecordingState,
        agent: &AgentName,
    ) -> Result<()>;

    /// Publish the agent's capabilities.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP request fails or the admin rejects it.
    async fn report_capabilities(&self, name: &AgentName, capabilities: &Properties)
        -> Result<()>;
}

/// Request body for an agent check-in.
#[derive(Debug, Serialize)]
struct AgentStateRequest<'a> {
    state: AgentState,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<&'a str>,
}

/// Request body for a recording state update.
#[derive(Debug, Serialize)]
struct RecordingStateRequest<'a> {
    state: RecordingState,
    agent: &'a AgentName,
}

/// Error body returned by the admin API.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

/// HTTP client for the admin status API.
#[derive(Debug, Clone)]
pub struct HttpStateReporter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStateReporter {
    /// Create a new reporter.
    ///
    /// # Arguments
    ///
    /// * `base_url` - The base URL of the admin service (e.g., "http://admin:8080")
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to create HTTP client");

        Self::with_client(client, base_url)
    }

    /// Create a new reporter with a custom reqwest client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    /// Get the base URL of the admin service.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Join path segments onto the base URL, escaping each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.base_url)
            .map_err(|e| AgentError::Report(format!("Invalid admin URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| AgentError::Report("Admin URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn check(response: reqwest::Response) -> Result<()> {
        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let error = response
            .json::<ErrorResponse>()
            .await
            .map(|e| e.error.message)
            .unwrap_or_else(|_| format!("Admin returned status {status}"));

        Err(AgentError::Report(error))
    }
}

#[async_trait]
impl StateReporter for HttpStateReporter {
    async fn report_agent_state(
        &self,
        name: &AgentName,
        state: AgentState,
        url: Option<&str>,
    ) -> Result<()> {
        let endpoint = self.endpoint(&["v1", "agents", name.as_str(), "state"])?;

        let response = self
            .client
            .post(endpoint)
            .json(&AgentStateRequest { state, url })
            .send()
            .await
            .map_err(|e| AgentError::Report(format!("Check-in request failed: {e}")))?;

        Self::check(response).await?;
        tracing::debug!(agent = %name, state = %state, "Checked in with admin");
        Ok(())
    }

    async fn report_recording_state(
        &self,
        id: &RecordingId,
        state: RecordingState,
        agent: &AgentName,
    ) -> Result<()> {
        let endpoint = self.endpoint(&["v1", "recordings", id.as_str(), "state"])?;

        let response = self
            .client
            .post(endpoint)
            .json(&RecordingStateRequest { state, agent })
            .send()
            .await
            .map_err(|e| AgentError::Report(format!("Recording update failed: {e}")))?;

        Self::check(response).await?;
        tracing::debug!(recording_id = %id, state = %state, "Reported recording state");
        Ok(())
    }

    async fn report_capabilities(
        &self,
        name: &AgentName,
        capabilities: &Properties,
    ) -> Result<()> {
        let endpoint = self.endpoint(&["v1", "agents", name.as_str(), "capabilities"])?;

        let response = self
            .client
            .put(endpoint)
            .json(capabilities)
            .send()
            .await
            .map_err(|e| AgentError::Report(format!("Capabilities update failed: {e}")))?;

        Self::check(response).await
    }
}

/// A no-op reporter for agents running without an admin service.
#[derive(Debug, Clone, Default)]
pub struct NoopStateReporter;

impl NoopStateReporter {
    /// Create a new no-op reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl StateReporter for NoopStateReporter {
    async fn report_agent_state(
        &self,
        name: &AgentName,
        state: AgentState,
        _url: Option<&str>,
    ) -> Result<()> {
        tracing::trace!(agent = %name, state = %state, "No admin configured, skipping check-in");
        Ok(())
    }

    async fn report_recording_state(
        &self,
        _id: &RecordingId,
        _state: RecordingState,
        _agent: &AgentName,
    ) -> Result<()> {
        Ok(())
    }

    async fn report_capabilities(
        &self,
        _name: &AgentName,
        _capabilities: &Properties,
    ) -> Result<()> {
        Ok(())
    }
}

/// Push the agent's state, then every recording state not yet accepted.
///
/// A recording is reported again only after its state changes, so the admin
/// service is free to expire recordings it has already seen settle. All
/// pending recordings are attempted even if one fails.
///
/// # Errors
///
/// Returns the first error encountered.
pub async fn check_in_once(agent: &CaptureAgent, reporter: &dyn StateReporter) -> Result<()> {
    let name = agent.name();
    let url = agent.url();

    reporter
        .report_agent_state(&name, agent.agent_state(), url.as_deref())
        .await?;

    let mut first_error = None;
    for (id, state) in agent.unreported_recordings() {
        match reporter.report_recording_state(&id, state, &name).await {
            Ok(()) => agent.mark_reported(&id, state),
            Err(e) => {
                tracing::warn!(recording_id = %id, error = %e, "Failed to report recording state");
                first_error.get_or_insert(e);
            }
        }
    }

    first_error.map_or(Ok(()), Err)
}

/// Shut the agent down, then check in once more so the admin service sees
/// the final states.
///
/// The final check-in runs even when the capture fails to stop cleanly.
///
/// # Errors
///
/// Returns the error the running capture stopped with.
pub async fn shutdown_and_check_in(
    agent: &CaptureAgent,
    reporter: &dyn StateReporter,
    timeout: Duration,
) -> Result<()> {
    let shutdown = agent.shutdown(timeout).await;
    if let Err(e) = &shutdown {
        tracing::error!(agent = %agent.name(), error = %e, "Capture did not stop cleanly");
    }

    if let Err(e) = check_in_once(agent, reporter).await {
        tracing::warn!(agent = %agent.name(), error = %e, "Final check-in failed");
    }

    shutdown
}

/// Check in every `interval` forever, logging failures.
///
/// Capabilities are published after the first successful check-in, once the
/// admin service knows the agent, and retried until they are accepted.
/// Recordings past their retention are pruned on every tick.
pub async fn run_checkin_loop(
    agent: CaptureAgent,
    reporter: Arc<dyn StateReporter>,
    interval: Duration,
) {
    let name = agent.name();
    let mut capabilities_published = false;

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        agent = %name,
        interval_secs = interval.as_secs(),
        "Starting check-in loop"
    );

    loop {
        ticker.tick().await;
        agent.prune_recordings(Utc::now());

        if let Err(e) = check_in_once(&agent, reporter.as_ref()).await {
            tracing::warn!(agent = %name, error = %e, "Check-in failed");
            continue;
        }

        if !capabilities_published {
            match reporter
                .report_capabilities(&name, &agent.capabilities())
                .await
            {
                Ok(()) => capabilities_published = true,
                Err(e) => {
                    tracing::warn!(agent = %name, error = %e, "Failed to publish capabilities");
                }
            }
        }
    }
}

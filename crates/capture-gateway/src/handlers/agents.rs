//! Agent check-in and property endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use capture_admin::CaptureAdmin;
use capture_core::{AgentName, AgentState, AgentStateUpdate, Properties};

use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Response for the agent list.
#[derive(Debug, Serialize)]
pub struct ListAgentsResponse {
    /// Snapshot of every known agent, sorted by name.
    pub agents: Vec<AgentStateUpdate>,
}

/// Check-in request body.
#[derive(Debug, Deserialize)]
pub struct CheckInBody {
    /// Reported agent state.
    pub state: String,
    /// URL the agent can be reached at.
    #[serde(default)]
    pub url: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// List snapshots of all agents.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn list_agents<A>(
    State(state): State<Arc<GatewayState<A>>>,
) -> Result<impl IntoResponse, ApiError>
where
    A: CaptureAdmin + 'static,
{
    let agents = state.admin.list_agents().await?;
    Ok(Json(ListAgentsResponse { agents }))
}

/// Get the full record of an agent.
///
/// # Errors
///
/// Returns an error if the name is invalid or the agent is unknown.
pub async fn get_agent<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    A: CaptureAdmin + 'static,
{
    let name = AgentName::new(name)?;
    let agent = state.admin.get_agent(&name).await?;
    Ok(Json(agent))
}

/// Remove an agent.
///
/// # Errors
///
/// Returns an error if the name is invalid or the agent is unknown.
pub async fn delete_agent<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    A: CaptureAdmin + 'static,
{
    let name = AgentName::new(name)?;
    state.admin.remove_agent(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get the state snapshot of an agent.
///
/// # Errors
///
/// Returns an error if the name is invalid or the agent is unknown.
pub async fn get_agent_state<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    A: CaptureAdmin + 'static,
{
    let name = AgentName::new(name)?;
    let update = state.admin.agent_state(&name).await?;
    Ok(Json(update))
}

/// Record a check-in, registering the agent on first contact.
///
/// # Errors
///
/// Returns an error if the name or state is invalid.
pub async fn check_in<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Path(name): Path<String>,
    Json(body): Json<CheckInBody>,
) -> Result<impl IntoResponse, ApiError>
where
    A: CaptureAdmin + 'static,
{
    let name = AgentName::new(name)?;
    let agent_state: AgentState = body.state.parse()?;
    let update = state.admin.check_in(&name, agent_state, body.url).await?;
    Ok(Json(update))
}

/// Get an agent's capabilities.
///
/// # Errors
///
/// Returns an error if the name is invalid or the agent is unknown.
pub async fn get_capabilities<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    A: CaptureAdmin + 'static,
{
    let name = AgentName::new(name)?;
    Ok(Json(state.admin.agent_capabilities(&name).await?))
}

/// Replace an agent's capabilities.
///
/// # Errors
///
/// Returns an error if the name is invalid or the agent is unknown.
pub async fn put_capabilities<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Path(name): Path<String>,
    Json(capabilities): Json<Properties>,
) -> Result<impl IntoResponse, ApiError>
where
    A: CaptureAdmin + 'static,
{
    let name = AgentName::new(name)?;
    state
        .admin
        .set_agent_capabilities(&name, capabilities)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get an agent's configuration.
///
/// # Errors
///
/// Returns an error if the name is invalid or the agent is unknown.
pub async fn get_configuration<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    A: CaptureAdmin + 'static,
{
    let name = AgentName::new(name)?;
    Ok(Json(state.admin.agent_configuration(&name).await?))
}

/// Replace an agent's configuration.
///
/// # Errors
///
/// Returns an error if the name is invalid or the agent is unknown.
pub async fn put_configuration<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Path(name): Path<String>,
    Json(configuration): Json<Properties>,
) -> Result<impl IntoResponse, ApiError>
where
    A: CaptureAdmin + 'static,
{
    let name = AgentName::new(name)?;
    state
        .admin
        .set_agent_configuration(&name, configuration)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

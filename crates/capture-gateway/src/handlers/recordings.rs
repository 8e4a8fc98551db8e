//! Recording state endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use capture_admin::CaptureAdmin;
use capture_core::{AgentName, RecordingId, RecordingState, RecordingStateUpdate};

use crate::error::ApiError;
use crate::state::GatewayState;

/// Response for the recording list.
#[derive(Debug, Serialize)]
pub struct ListRecordingsResponse {
    /// Snapshot of every known recording, sorted by id.
    pub recordings: Vec<RecordingStateUpdate>,
}

/// Recording state update body.
#[derive(Debug, Deserialize)]
pub struct RecordingStateBody {
    /// New recording state.
    pub state: String,
    /// Agent performing the recording.
    #[serde(default)]
    pub agent: Option<String>,
}

/// List snapshots of all recordings.
///
/// # Errors
///
/// Returns an error if the store cannot be read.
pub async fn list_recordings<A>(
    State(state): State<Arc<GatewayState<A>>>,
) -> Result<impl IntoResponse, ApiError>
where
    A: CaptureAdmin + 'static,
{
    let recordings = state.admin.list_recordings().await?;
    Ok(Json(ListRecordingsResponse { recordings }))
}

/// Get the full record of a recording.
///
/// # Errors
///
/// Returns an error if the id is invalid or the recording is unknown.
pub async fn get_recording<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    A: CaptureAdmin + 'static,
{
    let id = RecordingId::new(id)?;
    Ok(Json(state.admin.get_recording(&id).await?))
}

/// Remove a recording.
///
/// # Errors
///
/// Returns an error if the id is invalid or the recording is unknown.
pub async fn delete_recording<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    A: CaptureAdmin + 'static,
{
    let id = RecordingId::new(id)?;
    state.admin.remove_recording(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Get the state snapshot of a recording.
///
/// # Errors
///
/// Returns an error if the id is invalid or the recording is unknown.
pub async fn get_recording_state<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    A: CaptureAdmin + 'static,
{
    let id = RecordingId::new(id)?;
    Ok(Json(state.admin.recording_state(&id).await?))
}

/// Record a recording state change, creating the recording if new.
///
/// # Errors
///
/// Returns an error if the id, agent or state is invalid, or the
/// transition is not allowed.
pub async fn update_recording_state<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Path(id): Path<String>,
    Json(body): Json<RecordingStateBody>,
) -> Result<impl IntoResponse, ApiError>
where
    A: CaptureAdmin + 'static,
{
    let id = RecordingId::new(id)?;
    let recording_state: RecordingState = body.state.parse()?;
    let agent = body.agent.map(AgentName::new).transpose()?;

    let update = state
        .admin
        .update_recording_state(&id, recording_state, agent)
        .await?;
    Ok(Json(update))
}

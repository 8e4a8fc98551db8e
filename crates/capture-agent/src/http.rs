//! Local HTTP API of a capture agent.
//!
//! # Routes
//!
//! - `GET /health` - Health check
//! - `GET /v1/status/agent` - Agent state snapshot
//! - `GET /v1/status/recordings` - Snapshots of all recordings
//! - `GET /v1/status/recordings/:id` - Snapshot of one recording
//! - `DELETE /v1/status/recordings/:id` - Forget a finished recording
//! - `POST /v1/captures` - Start a capture (body: properties map)
//! - `POST /v1/captures/:id/stop` - Stop a capture

use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use capture_core::{AgentStateUpdate, Properties, RecordingId, RecordingStateUpdate};
use serde::Serialize;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::agent::CaptureAgent;
use crate::error::AgentError;

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: self.code(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// Response for the recording list.
#[derive(Debug, Serialize)]
pub struct RecordingsResponse {
    /// Snapshots of every recording.
    pub recordings: Vec<RecordingStateUpdate>,
}

/// Response for a started capture.
#[derive(Debug, Serialize)]
pub struct CaptureStartedResponse {
    /// Id of the new recording.
    pub id: RecordingId,
}

/// Create the agent router.
pub fn create_router(agent: CaptureAgent) -> Router {
    // Leave room for a full stop timeout inside a request.
    let request_timeout = agent.config().stop_timeout() + Duration::from_secs(10);

    Router::new()
        .route("/health", get(health))
        .route("/v1/status/agent", get(agent_status))
        .route("/v1/status/recordings", get(list_recordings))
        .route(
            "/v1/status/recordings/:id",
            get(recording_status).delete(delete_recording),
        )
        .route("/v1/captures", post(start_capture))
        .route("/v1/captures/:id/stop", post(stop_capture))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(agent)
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn agent_status(State(agent): State<CaptureAgent>) -> Json<AgentStateUpdate> {
    Json(agent.agent_state_update())
}

async fn list_recordings(State(agent): State<CaptureAgent>) -> Json<RecordingsResponse> {
    Json(RecordingsResponse {
        recordings: agent.recording_state_updates(),
    })
}

async fn recording_status(
    State(agent): State<CaptureAgent>,
    Path(id): Path<String>,
) -> Result<Json<RecordingStateUpdate>, AgentError> {
    let id = RecordingId::new(id)?;
    agent
        .recording_state_update(&id)
        .map(Json)
        .ok_or(AgentError::RecordingNotFound(id))
}

async fn delete_recording(
    State(agent): State<CaptureAgent>,
    Path(id): Path<String>,
) -> Result<StatusCode, AgentError> {
    let id = RecordingId::new(id)?;
    agent.remove_recording(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn start_capture(
    State(agent): State<CaptureAgent>,
    Json(properties): Json<Properties>,
) -> Result<impl IntoResponse, AgentError> {
    let id = agent.start_capture(properties).await?;
    Ok((StatusCode::CREATED, Json(CaptureStartedResponse { id })))
}

async fn stop_capture(
    State(agent): State<CaptureAgent>,
    Path(id): Path<String>,
) -> Result<Json<RecordingStateUpdate>, AgentError> {
    let id = RecordingId::new(id)?;
    Ok(Json(agent.stop_capture(&id).await?))
}

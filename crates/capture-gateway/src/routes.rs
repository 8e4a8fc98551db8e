//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use capture_admin::CaptureAdmin;

use crate::handlers::{agents, health, recordings};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// - `GET /health` - Health check
///
/// ## Agents
/// - `GET /v1/agents` - List agent snapshots
/// - `GET /v1/agents/:name` - Get agent
/// - `DELETE /v1/agents/:name` - Remove agent
/// - `GET /v1/agents/:name/state` - Agent snapshot
/// - `POST /v1/agents/:name/state` - Check in
/// - `GET|PUT /v1/agents/:name/capabilities` - Capabilities map
/// - `GET|PUT /v1/agents/:name/configuration` - Configuration map
///
/// ## Recordings
/// - `GET /v1/recordings` - List recording snapshots
/// - `GET /v1/recordings/:id` - Get recording
/// - `DELETE /v1/recordings/:id` - Remove recording
/// - `GET /v1/recordings/:id/state` - Recording snapshot
/// - `POST /v1/recordings/:id/state` - Update recording state
pub fn create_router<A>(state: GatewayState<A>) -> Router
where
    A: CaptureAdmin + 'static,
{
    // Extract config values before moving state
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health::health))
        // Agents
        .route("/v1/agents", get(agents::list_agents::<A>))
        .route(
            "/v1/agents/:name",
            get(agents::get_agent::<A>).delete(agents::delete_agent::<A>),
        )
        .route(
            "/v1/agents/:name/state",
            get(agents::get_agent_state::<A>).post(agents::check_in::<A>),
        )
        .route(
            "/v1/agents/:name/capabilities",
            get(agents::get_capabilities::<A>).put(agents::put_capabilities::<A>),
        )
        .route(
            "/v1/agents/:name/configuration",
            get(agents::get_configuration::<A>).put(agents::put_configuration::<A>),
        )
        // Recordings
        .route("/v1/recordings", get(recordings::list_recordings::<A>))
        .route(
            "/v1/recordings/:id",
            get(recordings::get_recording::<A>).delete(recordings::delete_recording::<A>),
        )
        .route(
            "/v1/recordings/:id/state",
            get(recordings::get_recording_state::<A>)
                .post(recordings::update_recording_state::<A>),
        )
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

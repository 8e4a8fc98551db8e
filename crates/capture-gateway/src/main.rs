//! Capture Gateway - admin status service over HTTP.
//!
//! Opens the RocksDB store, starts the staleness monitor and serves the
//! REST API.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use capture_admin::{AdminConfig, CaptureAdmin, CaptureAdminService, StaleMonitor};
use capture_gateway::{create_router, GatewayConfig, GatewayState};
use capture_store::RocksStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,capture=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Capture Gateway");

    let gateway_config = GatewayConfig::from_env();
    let admin_config = AdminConfig::from_env();

    tracing::info!(
        listen_addr = %gateway_config.listen_addr,
        data_dir = %gateway_config.data_dir.display(),
        agent_timeout_secs = admin_config.agent_timeout_seconds,
        recording_ttl_secs = admin_config.recording_ttl_seconds,
        "Gateway configuration loaded"
    );

    tracing::info!(path = %gateway_config.data_dir.display(), "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&gateway_config.data_dir)?);

    let sweep_interval = admin_config.sweep_interval();
    let admin = Arc::new(CaptureAdminService::new(store, admin_config));

    let monitor_admin: Arc<dyn CaptureAdmin> = admin.clone();
    let monitor = StaleMonitor::new(monitor_admin, sweep_interval).spawn();

    let listen_addr = gateway_config.listen_addr.clone();
    let state = GatewayState::new(admin, gateway_config);
    let app = create_router(state);

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await?;

    monitor.abort();
    tracing::info!("Gateway stopped");

    Ok(())
}

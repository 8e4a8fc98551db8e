//! Capture Agent - device-side capture service.
//!
//! Serves the local status API, drives the ffmpeg capture pipeline and
//! checks in with the admin service.
//!
//! # Admin Integration
//!
//! Set `ADMIN_URL` to enable check-ins. If not set, the agent runs
//! standalone and only serves its local API.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use capture_agent::{
    create_router, run_checkin_loop, shutdown_and_check_in, AgentConfig, CaptureAgent,
    FfmpegBackend, HttpStateReporter, NoopStateReporter, StateReporter,
};
use capture_core::{AgentName, Properties};

/// Capture Agent - device-side capture service.
#[derive(Parser, Debug)]
#[command(name = "capture-agent")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Name this agent registers under.
    #[arg(long, env = "CAPTURE_AGENT_NAME")]
    name: String,

    /// Address for the local HTTP API.
    #[arg(long, env = "LISTEN_ADDR", default_value = "0.0.0.0:8081")]
    listen_addr: String,

    /// Base URL of the admin service.
    #[arg(long, env = "ADMIN_URL")]
    admin_url: Option<String>,

    /// JSON configuration file. Flags override its values.
    #[arg(long, env = "CAPTURE_AGENT_CONFIG")]
    config: Option<PathBuf>,

    /// JSON file with the capabilities map published to the admin service.
    #[arg(long, env = "CAPTURE_AGENT_CAPABILITIES")]
    capabilities: Option<PathBuf>,

    /// Directory for recording output.
    #[arg(long, env = "CAPTURE_DIR")]
    capture_dir: Option<PathBuf>,

    /// URL the admin service can reach this agent at.
    #[arg(long, env = "PUBLIC_URL")]
    public_url: Option<String>,

    /// Seconds between check-ins.
    #[arg(long, env = "CHECKIN_INTERVAL_SECONDS")]
    checkin_interval: Option<u64>,

    /// Seconds to wait for a capture to stop.
    #[arg(long, env = "STOP_TIMEOUT_SECONDS")]
    stop_timeout: Option<u64>,

    /// Seconds a reported recording is kept after its last update.
    #[arg(long, env = "RECORDING_RETENTION_SECONDS")]
    recording_retention: Option<u64>,

    /// Path to the ffmpeg binary.
    #[arg(long, env = "FFMPEG_BINARY", default_value = "ffmpeg")]
    ffmpeg: PathBuf,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<AgentConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing {}", path.display()))?
            }
            None => AgentConfig::default(),
        };

        if let Some(dir) = &self.capture_dir {
            config.capture_dir.clone_from(dir);
        }
        if let Some(url) = &self.public_url {
            config.public_url = Some(url.clone());
        }
        if let Some(secs) = self.checkin_interval {
            config.checkin_interval_seconds = secs;
        }
        if let Some(secs) = self.stop_timeout {
            config.stop_timeout_seconds = secs;
        }
        if let Some(secs) = self.recording_retention {
            config.recording_retention_seconds = secs;
        }
        Ok(config)
    }

    fn load_capabilities(&self) -> anyhow::Result<Properties> {
        let Some(path) = &self.capabilities else {
            return Ok(Properties::new());
        };
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,capture_agent=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Capture Agent");

    let name = AgentName::new(args.name.clone()).context("invalid agent name")?;
    let config = args.load_config()?;
    let capabilities = args.load_capabilities()?;

    tracing::info!(
        agent = %name,
        listen_addr = %args.listen_addr,
        admin_url = ?args.admin_url,
        capture_dir = %config.capture_dir.display(),
        "Agent configuration loaded"
    );

    std::fs::create_dir_all(&config.capture_dir)
        .with_context(|| format!("creating {}", config.capture_dir.display()))?;

    let backend = Arc::new(FfmpegBackend::new(args.ffmpeg.clone()));
    let checkin_interval = config.checkin_interval();
    let stop_timeout = config.stop_timeout();
    let agent = CaptureAgent::new(name, config, backend);
    agent.set_capabilities(capabilities);

    let reporter: Arc<dyn StateReporter> = if let Some(url) = &args.admin_url {
        tracing::info!(admin_url = %url, "Admin check-ins enabled");
        Arc::new(HttpStateReporter::new(url.clone()))
    } else {
        tracing::warn!("No ADMIN_URL set - running without admin check-ins");
        Arc::new(NoopStateReporter::new())
    };
    let checkin = tokio::spawn(run_checkin_loop(
        agent.clone(),
        Arc::clone(&reporter),
        checkin_interval,
    ));

    let app = create_router(agent.clone());

    tracing::info!(listen_addr = %args.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&args.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
        })
        .await?;

    tracing::info!("Shutting down");
    checkin.abort();
    shutdown_and_check_in(&agent, reporter.as_ref(), stop_timeout).await?;

    Ok(())
}

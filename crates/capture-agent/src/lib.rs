//! Device-side capture agent.
//!
//! A capture agent owns one capture pipeline, keeps an in-memory record of
//! its own state and of every recording it has made, answers local status
//! queries, and periodically checks in with the admin service.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐   status / capture   ┌────────────────────────────┐
//! │ Local HTTP   │ ───────────────────▶ │        CaptureAgent        │
//! └──────────────┘                      │  agent + recordings state  │
//!                                       └────────────────────────────┘
//!                                          │                   │
//!                                 start/stop│                   │ check-in
//!                                          ▼                   ▼
//!                               ┌──────────────────┐   ┌───────────────┐
//!                               │ CaptureFramework │   │ StateReporter │
//!                               │  (ffmpeg, mock)  │   │  (admin HTTP) │
//!                               └──────────────────┘   └───────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use capture_agent::{AgentConfig, CaptureAgent, FfmpegBackend, StatusService};
//! use capture_core::{AgentName, Properties};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let agent = CaptureAgent::new(
//!     AgentName::new("room-101")?,
//!     AgentConfig::default(),
//!     Arc::new(FfmpegBackend::default()),
//! );
//!
//! let mut properties = Properties::new();
//! properties.insert("capture.device.names".into(), "cam".into());
//! properties.insert("capture.device.cam.src".into(), "/dev/video0".into());
//!
//! let id = agent.start_capture(properties).await?;
//! println!("{id} is {:?}", agent.recording_state(&id));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod agent;
pub mod config;
pub mod error;
pub mod ffmpeg;
pub mod http;
pub mod pipeline;
pub mod reporter;
pub mod status;

pub use agent::{CaptureAgent, RECORDING_ID_PROPERTY};
pub use config::AgentConfig;
pub use error::{AgentError, PipelineError, Result};
pub use ffmpeg::{FfmpegBackend, DEVICE_NAMES_PROPERTY};
pub use http::create_router;
pub use pipeline::{CaptureBackend, CaptureFramework, FailureHandler};
pub use reporter::{
    check_in_once, run_checkin_loop, shutdown_and_check_in, HttpStateReporter, NoopStateReporter,
    StateReporter,
};
pub use status::StatusService;

#[cfg(any(test, feature = "test-utils"))]
pub use pipeline::mock::{MockBackend, MockBehavior};

//! Admin-side status service for capture agents.
//!
//! Capture agents check in periodically with their state and push recording
//! state changes. This crate persists both, answers polling clients with
//! state-update snapshots, and marks agents that go silent as offline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Gateway (HTTP)                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   CaptureAdminService                       │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │  Check-ins  │ │ Recordings  │ │    Lifecycle        │    │
//! │  │ & properties│ │  tracking   │ │    State Machine    │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                 │                            ▲
//!                 ▼                            │ sweep
//!          ┌──────────┐                 ┌──────────────┐
//!          │  Store   │                 │ StaleMonitor │
//!          │ (RocksDB)│                 └──────────────┘
//!          └──────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use capture_admin::{CaptureAdmin, CaptureAdminService};
//! use capture_core::{AgentName, AgentState};
//! use capture_store::RocksStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/capture-admin")?);
//! let admin = CaptureAdminService::with_defaults(store);
//!
//! let name = AgentName::new("room-101")?;
//! let update = admin.check_in(&name, AgentState::Idle, None).await?;
//!
//! println!("{:?} checked in", update.name);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod lifecycle;
pub mod monitor;
pub mod service;
pub mod types;

pub use error::{AdminError, Result};
pub use monitor::StaleMonitor;
pub use service::{CaptureAdmin, CaptureAdminService};
pub use types::{AdminConfig, SweepReport};

// Re-export commonly used types from dependencies for convenience
pub use capture_core::{
    Agent, AgentName, AgentState, AgentStateUpdate, Properties, Recording, RecordingId,
    RecordingState, RecordingStateUpdate,
};

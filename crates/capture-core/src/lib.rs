//! Core types for capture agent status tracking.
//!
//! This crate provides the model shared by capture agents and the admin
//! status service:
//!
//! - **Identifiers**: validated agent names and recording ids
//! - **States**: the closed agent and recording state vocabularies
//! - **Entities**: agent and recording records
//! - **Snapshots**: state updates with time since last update
//!
//! # Example
//!
//! ```
//! use capture_core::{Agent, AgentName, AgentState, AgentStateUpdate};
//! use chrono::Utc;
//!
//! let name = AgentName::new("room-101").unwrap();
//! let agent = Agent::new(name, AgentState::Idle, Utc::now());
//!
//! let update = AgentStateUpdate::new(&agent);
//! assert_eq!(update.state, Some(AgentState::Idle));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod model;
pub mod state;
pub mod update;

pub use error::{CoreError, Result};
pub use ids::{AgentName, IdError, RecordingId};
pub use model::{Agent, Properties, Recording};
pub use state::{AgentState, RecordingState, StateParseError};
pub use update::{elapsed_millis, AgentStateUpdate, RecordingStateUpdate};

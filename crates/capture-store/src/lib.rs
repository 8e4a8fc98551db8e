//! Storage layer for capture status tracking.
//!
//! This crate provides persistent storage for agents and recordings using
//! `RocksDB` with column families for efficient indexing, plus an in-memory
//! implementation for tests and single-process deployments.
//!
//! # Architecture
//!
//! The `RocksDB` storage uses the following column families:
//!
//! - `agents`: Primary agent records, keyed by agent name
//! - `agents_by_state`: Index for listing agents by state
//! - `recordings`: Primary recording records, keyed by recording id
//! - `recordings_by_agent`: Index for listing recordings by agent
//!
//! # Example
//!
//! ```no_run
//! use capture_store::{RocksStore, Store};
//! use capture_core::AgentState;
//!
//! let store = RocksStore::open("/tmp/capture-db").unwrap();
//!
//! // List idle agents
//! let idle = store.list_agents_by_state(AgentState::Idle).unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod memory;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use rocks::RocksStore;

pub use capture_core::{
    Agent, AgentName, AgentState, Properties, Recording, RecordingId, RecordingState,
};

/// The storage trait defining all database operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations (`RocksDB`, in-memory).
pub trait Store: Send + Sync {
    // =========================================================================
    // Agent Operations
    // =========================================================================

    /// Insert or update an agent record.
    ///
    /// This also maintains the state index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_agent(&self, agent: &Agent) -> Result<()>;

    /// Get an agent by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_agent(&self, name: &AgentName) -> Result<Option<Agent>>;

    /// Delete an agent by name.
    ///
    /// Recordings produced by the agent are kept.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the agent doesn't exist.
    fn delete_agent(&self, name: &AgentName) -> Result<()>;

    /// List all agents, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_agents(&self) -> Result<Vec<Agent>>;

    /// List all agents in a given state.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_agents_by_state(&self, state: AgentState) -> Result<Vec<Agent>>;

    /// Update an agent's state without touching its check-in time.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the agent doesn't exist.
    fn update_agent_state(&self, name: &AgentName, state: AgentState) -> Result<()> {
        let mut agent = self.get_agent(name)?.ok_or(StoreError::NotFound)?;
        agent.state = state;
        self.put_agent(&agent)
    }

    // =========================================================================
    // Recording Operations
    // =========================================================================

    /// Insert or update a recording record.
    ///
    /// This also maintains the agent index.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_recording(&self, recording: &Recording) -> Result<()>;

    /// Get a recording by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_recording(&self, id: &RecordingId) -> Result<Option<Recording>>;

    /// Delete a recording by id.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the recording doesn't exist.
    fn delete_recording(&self, id: &RecordingId) -> Result<()>;

    /// List all recordings, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_recordings(&self) -> Result<Vec<Recording>>;

    /// List all recordings produced by an agent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_recordings_by_agent(&self, name: &AgentName) -> Result<Vec<Recording>>;
}

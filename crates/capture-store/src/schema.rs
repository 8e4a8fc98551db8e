//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary agent records, keyed by agent name.
    pub const AGENTS: &str = "agents";

    /// Index: agents by state, keyed by `state || name`.
    pub const AGENTS_BY_STATE: &str = "agents_by_state";

    /// Primary recording records, keyed by recording id.
    pub const RECORDINGS: &str = "recordings";

    /// Index: recordings by agent, keyed by `name || 0x00 || recording_id`.
    pub const RECORDINGS_BY_AGENT: &str = "recordings_by_agent";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::AGENTS,
        cf::AGENTS_BY_STATE,
        cf::RECORDINGS,
        cf::RECORDINGS_BY_AGENT,
    ]
}

//! Error types for spawning.

use thiserror::Error;
use triad_memory::MemoryError;
use triad_models::TeamId;

/// Errors that can occur while spawning or tearing down teams.
#[derive(Error, Debug)]
pub enum SpawnError {
    /// The request would push the number of active teams past the cap.
    /// Nothing was spawned.
    #[error("spawn limit exceeded: requested {requested} with {active} active (max {max})")]
    SpawnLimitExceeded {
        requested: usize,
        active: usize,
        max: usize,
    },

    /// Team is not in the registry.
    #[error("team not found: {0}")]
    NotFound(TeamId),

    /// A spawned team tried to spawn further teams.
    #[error("recursive spawning disabled (team depth {depth})")]
    RecursionDisabled { depth: u32 },

    /// Lock poisoned (thread panicked while holding lock).
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// Shared-memory error.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
}

/// Result type alias for spawner operations.
pub type Result<T> = std::result::Result<T, SpawnError>;

//! Error types for the orchestrator.

use thiserror::Error;

use crate::state_machine::StateMachineError;

/// Orchestrator-specific errors.
///
/// Runtime trouble inside a task (stalls, disputes, backend failures) does
/// not surface here; it ends up in the [`ExecutionResult`](triad_models::ExecutionResult)
/// status. These errors reject a request outright.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Task failed validation.
    #[error("Validation error: {0}")]
    Validation(#[from] triad_models::ValidationError),

    /// Spawning failed, e.g. the team cap was hit without degraded mode.
    #[error("Spawn error: {0}")]
    Spawn(#[from] triad_spawner::SpawnError),

    /// Shared-memory error, including state corruption.
    #[error("Memory error: {0}")]
    Memory(#[from] triad_memory::MemoryError),

    /// A role tried something its capabilities do not allow.
    #[error("Access denied: {role} may not {action}")]
    AccessDenied { role: String, action: &'static str },

    #[error("State machine error: {0}")]
    StateMachine(#[from] StateMachineError),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

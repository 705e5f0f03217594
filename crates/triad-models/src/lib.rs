//! Core data models for Triad.
//!
//! This crate provides the fundamental data types shared by every Triad
//! crate: tasks, identifiers, roles and their status records, the entries
//! recorded in a workspace's shared memory, and execution results.

pub mod error;
pub mod ids;
pub mod records;
pub mod result;
pub mod role;
pub mod snapshot;
pub mod task;
pub mod team;

// Re-export main types
pub use error::ValidationError;
pub use ids::{TeamId, WorkspaceId};
pub use records::{
    ActivityLine, BugRecord, ContextEntry, ConversationEntry, DecisionRecord, LogLevel,
    SolutionRecord, SpawnRecord, CODEBASE_CONTEXT, USER_DOCS, USER_INPUT,
};
pub use result::{ExecutionResult, ExecutionStatus, SpawnedOutcome};
pub use role::{Activity, Capabilities, Layer, RoleId, RoleKind, RoleStatus};
pub use snapshot::WorkspaceSnapshot;
pub use task::{Difficulty, Task};
pub use team::Team;

//! Team coordination for Triad.
//!
//! This crate provides the [`Coordinator`], which runs a three-role team
//! (primary, assistant, arbitrator) over a task and spawns parallel teams
//! for complex work.
//!
//! # Overview
//!
//! The coordinator manages:
//! - Role handles with per-role capabilities over shared memory
//! - A state machine for stalls, disputes, rotation and cancellation
//! - Spawned teams, each with its own coordinator and workspace
//! - Optional monitors that take over unresponsive roles
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use triad_inference::MockBackend;
//! use triad_memory::SharedMemory;
//! use triad_models::{Task, WorkspaceId};
//! use triad_orchestrator::{Backends, Coordinator, CoordinatorConfig};
//!
//! # async fn example() -> triad_orchestrator::Result<()> {
//! let mut coordinator = Coordinator::new(
//!     WorkspaceId::new("demo"),
//!     Arc::new(SharedMemory::new()),
//!     Backends::single(Arc::new(MockBackend::echo("mock"))),
//!     CoordinatorConfig::default(),
//! )?;
//!
//! let result = coordinator.execute_task(Task::new("Fix typo")).await?;
//! println!("{}: {:?}", result.status, result.completed_subtasks);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod coordinator;
pub mod error;
pub mod roles;
pub mod scenario;
pub mod state_machine;
pub mod status;

pub use config::CoordinatorConfig;
pub use coordinator::{Backends, Coordinator};
pub use error::{OrchestratorError, Result};
pub use roles::RoleHandle;
pub use scenario::{Scenario, Signal};
pub use state_machine::{
    CoordinatorEvent, CoordinatorState, CoordinatorStateMachine, StateMachineError,
};
pub use status::SystemStatus;

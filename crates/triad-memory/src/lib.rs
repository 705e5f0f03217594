//! Shared memory for Triad teams.
//!
//! Every team works against one [`SharedState`], keyed by workspace id.
//! A [`SharedMemory`] registry hands out `Arc<SharedState>` handles, creating
//! workspaces lazily on first access and loading/flushing them through an
//! optional [`WorkspaceStore`](triad_persistence::WorkspaceStore).
//!
//! # Concurrency
//!
//! Each workspace guards its data with one `Mutex`. Every append is a
//! read-modify-write under that lock, so concurrent writers (roles of one
//! team, or several teams that happen to share a workspace) never lose or
//! duplicate entries. Sequence numbers are assigned under the same lock.
//!
//! # Access control
//!
//! The store does not know about roles' permissions. Which role may write
//! user context or read the activity log is enforced by the coordinator's
//! role handles; the store only guarantees log integrity (a solution must
//! reference an existing bug).

mod error;
mod health;
mod registry;
mod state;

pub use error::{MemoryError, Result};
pub use health::{Health, HealthReport, DIAGNOSIS_WINDOW};
pub use registry::SharedMemory;
pub use state::SharedState;

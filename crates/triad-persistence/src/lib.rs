//! Persistence layer for Triad.
//!
//! Shared memory lives in process; this crate gives it explicit load/flush
//! boundaries. Snapshots are written atomically (temp file, then rename) so
//! a crash never leaves a half-written workspace behind.
//!
//! # Example
//!
//! ```no_run
//! use triad_persistence::WorkspaceStore;
//! use triad_models::{WorkspaceId, WorkspaceSnapshot};
//!
//! let store = WorkspaceStore::new("/home/user/.triad/state");
//!
//! let snapshot = WorkspaceSnapshot::new(WorkspaceId::new("demo"));
//! store.save(&snapshot).unwrap();
//!
//! let loaded = store.load(&snapshot.workspace_id).unwrap();
//! ```

pub mod atomic;
pub mod error;
pub mod workspace_store;

pub use error::{PersistenceError, Result};
pub use workspace_store::WorkspaceStore;

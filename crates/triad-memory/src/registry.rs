//! Registry of workspaces.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::{debug, info};
use triad_models::WorkspaceId;
use triad_persistence::WorkspaceStore;

use crate::error::{MemoryError, Result};
use crate::state::SharedState;

/// Hands out one [`SharedState`] per workspace id.
///
/// Two lookups of the same id always return the same `Arc`, so every team
/// pointed at a workspace sees the same logs.
#[derive(Debug, Default)]
pub struct SharedMemory {
    workspaces: RwLock<HashMap<WorkspaceId, Arc<SharedState>>>,
    store: Option<WorkspaceStore>,
}

impl SharedMemory {
    /// In-memory registry with no backing store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry that loads existing workspaces from `store` and can flush to it.
    pub fn with_store(store: WorkspaceStore) -> Self {
        Self {
            workspaces: RwLock::new(HashMap::new()),
            store: Some(store),
        }
    }

    /// Returns the workspace, creating it on first access.
    ///
    /// With a store, a workspace that exists on disk is loaded instead of
    /// being created empty.
    pub fn workspace(&self, id: &WorkspaceId) -> Result<Arc<SharedState>> {
        if let Some(state) = self.get(id)? {
            return Ok(state);
        }

        let mut workspaces = self
            .workspaces
            .write()
            .map_err(|e| MemoryError::LockPoisoned(e.to_string()))?;

        // Another caller may have created it between the two locks.
        if let Some(state) = workspaces.get(id) {
            return Ok(Arc::clone(state));
        }

        let state = match &self.store {
            Some(store) if store.exists(id) => {
                debug!(workspace = %id, "Loading workspace from disk");
                Arc::new(SharedState::from_snapshot(store.load(id)?))
            }
            _ => {
                debug!(workspace = %id, "Creating workspace");
                Arc::new(SharedState::new(id.clone()))
            }
        };
        workspaces.insert(id.clone(), Arc::clone(&state));
        Ok(state)
    }

    /// Returns the workspace only if it is already loaded.
    pub fn get(&self, id: &WorkspaceId) -> Result<Option<Arc<SharedState>>> {
        let workspaces = self
            .workspaces
            .read()
            .map_err(|e| MemoryError::LockPoisoned(e.to_string()))?;
        Ok(workspaces.get(id).cloned())
    }

    pub fn contains(&self, id: &WorkspaceId) -> bool {
        self.get(id).map(|s| s.is_some()).unwrap_or(false)
    }

    /// Ids of loaded workspaces, sorted.
    pub fn workspace_ids(&self) -> Result<Vec<WorkspaceId>> {
        let workspaces = self
            .workspaces
            .read()
            .map_err(|e| MemoryError::LockPoisoned(e.to_string()))?;
        let mut ids: Vec<WorkspaceId> = workspaces.keys().cloned().collect();
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }

    /// Writes one workspace to the store. No-op without a store.
    pub fn flush(&self, id: &WorkspaceId) -> Result<()> {
        let Some(store) = &self.store else {
            return Ok(());
        };
        if let Some(state) = self.get(id)? {
            store.save(&state.snapshot()?)?;
            debug!(workspace = %id, "Flushed workspace");
        }
        Ok(())
    }

    /// Writes every loaded workspace to the store.
    pub fn flush_all(&self) -> Result<usize> {
        if self.store.is_none() {
            return Ok(0);
        }
        let ids = self.workspace_ids()?;
        for id in &ids {
            self.flush(id)?;
        }
        info!(count = ids.len(), "Flushed all workspaces");
        Ok(ids.len())
    }

    /// Drops a workspace from the registry. Data on disk is kept.
    pub fn remove(&self, id: &WorkspaceId) -> Result<Option<Arc<SharedState>>> {
        let mut workspaces = self
            .workspaces
            .write()
            .map_err(|e| MemoryError::LockPoisoned(e.to_string()))?;
        Ok(workspaces.remove(id))
    }
}

//! Workspace store for shared-memory snapshots.

use std::fs;
use std::path::PathBuf;

use tracing::{debug, warn};
use triad_models::{WorkspaceId, WorkspaceSnapshot};

use crate::atomic::{atomic_write, atomic_write_json, read_json};
use crate::error::{PersistenceError, Result};

const SNAPSHOT_FILE: &str = "memory.json";
const ACTIVITY_FILE: &str = "activity.log";

/// Manages persistence of workspace snapshots.
///
/// Each workspace gets its own directory:
/// ```text
/// base_path/
/// └── workspaces/
///     └── {workspace_id}/
///         ├── memory.json
///         └── activity.log
/// ```
///
/// `activity.log` is a plain-text rendering of the activity log for humans;
/// `memory.json` is the source of truth.
#[derive(Debug, Clone)]
pub struct WorkspaceStore {
    base_path: PathBuf,
}

impl WorkspaceStore {
    /// Creates a new WorkspaceStore with the given base path.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn workspaces_dir(&self) -> PathBuf {
        self.base_path.join("workspaces")
    }

    fn workspace_dir(&self, workspace: &WorkspaceId) -> PathBuf {
        self.workspaces_dir().join(workspace.as_str())
    }

    fn snapshot_path(&self, workspace: &WorkspaceId) -> PathBuf {
        self.workspace_dir(workspace).join(SNAPSHOT_FILE)
    }

    /// Path of the human-readable activity log of a workspace.
    pub fn activity_log_path(&self, workspace: &WorkspaceId) -> PathBuf {
        self.workspace_dir(workspace).join(ACTIVITY_FILE)
    }

    /// Returns `true` if a snapshot exists for the workspace.
    pub fn exists(&self, workspace: &WorkspaceId) -> bool {
        self.snapshot_path(workspace).exists()
    }

    /// Saves a snapshot and re-renders its activity log.
    pub fn save(&self, snapshot: &WorkspaceSnapshot) -> Result<()> {
        let path = self.snapshot_path(&snapshot.workspace_id);
        atomic_write_json(&path, snapshot)?;

        let mut log = String::new();
        for line in &snapshot.activity {
            log.push_str(&line.to_string());
            log.push('\n');
        }
        atomic_write(&self.activity_log_path(&snapshot.workspace_id), log.as_bytes())?;

        debug!(
            workspace = %snapshot.workspace_id,
            conversation = snapshot.conversation.len(),
            decisions = snapshot.decisions.len(),
            "Saved workspace snapshot"
        );
        Ok(())
    }

    /// Loads a snapshot by workspace id.
    pub fn load(&self, workspace: &WorkspaceId) -> Result<WorkspaceSnapshot> {
        let path = self.snapshot_path(workspace);
        if !path.exists() {
            return Err(PersistenceError::NotFound {
                kind: "workspace".to_string(),
                id: workspace.to_string(),
            });
        }
        read_json(&path)
    }

    /// Lists the ids of all persisted workspaces, sorted.
    pub fn list(&self) -> Result<Vec<WorkspaceId>> {
        let dir = self.workspaces_dir();
        if !dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&dir).map_err(|source| PersistenceError::ReadError {
            path: dir.clone(),
            source,
        })?;

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| PersistenceError::ReadError {
                path: dir.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.join(SNAPSHOT_FILE).exists() {
                warn!(path = %path.display(), "Skipping workspace directory without snapshot");
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                ids.push(WorkspaceId::new(name));
            }
        }

        ids.sort();
        Ok(ids)
    }

    /// Deletes a workspace's directory. Missing workspaces are not an error.
    pub fn delete(&self, workspace: &WorkspaceId) -> Result<()> {
        let dir = self.workspace_dir(workspace);
        if dir.exists() {
            fs::remove_dir_all(&dir)
                .map_err(|source| PersistenceError::WriteError { path: dir, source })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tempfile::tempdir;
    use triad_models::{ActivityLine, LogLevel};

    fn snapshot(id: &str) -> WorkspaceSnapshot {
        WorkspaceSnapshot::new(WorkspaceId::new(id))
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let store = WorkspaceStore::new(dir.path());

        let mut snap = snapshot("demo");
        snap.next_seq = 7;
        store.save(&snap).unwrap();

        let loaded = store.load(&snap.workspace_id).unwrap();
        assert_eq!(loaded, snap);
    }

    #[test]
    fn test_load_not_found() {
        let dir = tempdir().unwrap();
        let store = WorkspaceStore::new(dir.path());

        let result = store.load(&WorkspaceId::new("nope"));
        assert!(matches!(result, Err(PersistenceError::NotFound { .. })));
    }

    #[test]
    fn test_activity_log_rendered() {
        let dir = tempdir().unwrap();
        let store = WorkspaceStore::new(dir.path());

        let mut snap = snapshot("logs");
        snap.activity.push(ActivityLine {
            seq: 0,
            source: "primary".to_string(),
            level: LogLevel::Info,
            message: "Starting task".to_string(),
            timestamp: Utc::now(),
        });
        store.save(&snap).unwrap();

        let text = fs::read_to_string(store.activity_log_path(&snap.workspace_id)).unwrap();
        assert!(text.contains("[primary] INFO: Starting task"));
    }

    #[test]
    fn test_list_sorted() {
        let dir = tempdir().unwrap();
        let store = WorkspaceStore::new(dir.path());

        store.save(&snapshot("beta")).unwrap();
        store.save(&snapshot("alpha")).unwrap();

        let ids = store.list().unwrap();
        assert_eq!(ids, vec![WorkspaceId::new("alpha"), WorkspaceId::new("beta")]);
    }

    #[test]
    fn test_list_empty() {
        let dir = tempdir().unwrap();
        let store = WorkspaceStore::new(dir.path());
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_delete() {
        let dir = tempdir().unwrap();
        let store = WorkspaceStore::new(dir.path());
        let snap = snapshot("gone");

        store.save(&snap).unwrap();
        assert!(store.exists(&snap.workspace_id));

        store.delete(&snap.workspace_id).unwrap();
        assert!(!store.exists(&snap.workspace_id));
        store.delete(&snap.workspace_id).unwrap();
    }
}

//! Team records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{TeamId, WorkspaceId};
use crate::role::RoleId;

/// One bound set of roles plus the workspace its shared memory lives under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    /// Unique team id.
    pub id: TeamId,
    /// Workspace of the team's shared memory.
    pub workspace: WorkspaceId,
    /// Workspace of the team that spawned this one (`None` for a root team).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_workspace: Option<WorkspaceId>,
    /// Role that requested the spawn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spawned_by: Option<RoleId>,
    /// Subtasks assigned to the team.
    #[serde(default)]
    pub assignment: Vec<String>,
    /// Spawn depth; 0 for a root team.
    #[serde(default)]
    pub depth: u32,
    /// Whether the team runs monitor counterparts.
    #[serde(default)]
    pub dual_layer: bool,
    /// When the team was created.
    pub created_at: DateTime<Utc>,
}

impl Team {
    /// Creates a root team over `workspace`.
    pub fn root(workspace: WorkspaceId) -> Self {
        Self {
            id: TeamId::new(),
            workspace,
            parent_workspace: None,
            spawned_by: None,
            assignment: Vec::new(),
            depth: 0,
            dual_layer: false,
            created_at: Utc::now(),
        }
    }

    /// Returns `true` if the team was created by a spawner.
    pub fn is_spawned(&self) -> bool {
        self.parent_workspace.is_some()
    }
}

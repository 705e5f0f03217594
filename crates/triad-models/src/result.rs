//! Execution results.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{TeamId, WorkspaceId};

/// Terminal status of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// All assigned subtasks recorded done.
    Completed,
    /// Could not finish; see the reason.
    Failed,
    /// Stopped cooperatively after a teardown.
    Cancelled,
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(label)
    }
}

/// Outcome of one spawned team.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnedOutcome {
    /// Team id.
    pub team_id: TeamId,
    /// Workspace of the team.
    pub workspace: WorkspaceId,
    /// Subtasks the team was given.
    pub assignment: Vec<String>,
    /// How the team finished.
    pub status: ExecutionStatus,
    /// Failure or cancellation reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// What a coordinator returns for one `execute_task` call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Final status of the primary team.
    pub status: ExecutionStatus,
    /// Human-readable reason when not completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Workspace of the primary team, for later inspection.
    pub workspace: WorkspaceId,
    /// Complexity score of the submitted task.
    pub complexity: u32,
    /// Ids of teams spawned for this task.
    #[serde(default)]
    pub spawned_teams: Vec<TeamId>,
    /// Outcomes of every spawned team, in spawn order. Teams spawned by a
    /// spawned team follow it.
    #[serde(default)]
    pub spawned: Vec<SpawnedOutcome>,
    /// Subtasks the primary team recorded done.
    #[serde(default)]
    pub completed_subtasks: Vec<String>,
}

impl ExecutionResult {
    /// Returns `true` if the primary team completed.
    pub fn is_completed(&self) -> bool {
        self.status == ExecutionStatus::Completed
    }
}

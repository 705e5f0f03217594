//! System status reporting.

use serde::Serialize;

use triad_memory::HealthReport;
use triad_models::{RoleKind, RoleStatus, SpawnRecord, Team, TeamId, WorkspaceId};

use crate::state_machine::CoordinatorState;

/// Point-in-time view of a team, its roles and the teams it spawned.
#[derive(Debug, Clone, Serialize)]
pub struct SystemStatus {
    pub team_id: TeamId,
    pub workspace: WorkspaceId,
    pub state: CoordinatorState,
    pub dual_layer: bool,
    /// Status of every role, monitors included.
    pub roles: Vec<RoleStatus>,
    /// Roles currently handled by their monitor.
    pub promoted: Vec<RoleKind>,
    /// Spawned teams that have not been torn down.
    pub active_teams: Vec<Team>,
    /// Every spawn recorded in the workspace.
    pub spawned: Vec<SpawnRecord>,
    pub health: HealthReport,
}

impl SystemStatus {
    /// Renders the status as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

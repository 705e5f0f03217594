//! Workspace health diagnosis.

use serde::{Deserialize, Serialize};
use std::fmt;
use triad_models::{Activity, LogLevel, RoleId, WorkspaceSnapshot};

/// Number of trailing activity lines considered by a diagnosis.
pub const DIAGNOSIS_WINDOW: usize = 200;

const CRITICAL_ERRORS: usize = 5;
const WARNING_WARNINGS: usize = 10;

/// Overall health of a workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Health {
    Healthy,
    Warning,
    Critical,
}

impl fmt::Display for Health {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Health::Healthy => write!(f, "healthy"),
            Health::Warning => write!(f, "warning"),
            Health::Critical => write!(f, "critical"),
        }
    }
}

/// Result of [`SharedState::diagnose`](crate::SharedState::diagnose).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Activity of the primary, if it has reported one.
    pub primary: Option<Activity>,
    /// Activity of the assistant, if it has reported one.
    pub assistant: Option<Activity>,
    /// Error lines in the window.
    pub errors: usize,
    /// Warning lines in the window.
    pub warnings: usize,
    pub health: Health,
}

pub(crate) fn diagnose(memory: &WorkspaceSnapshot) -> HealthReport {
    let start = memory.activity.len().saturating_sub(DIAGNOSIS_WINDOW);
    let window = &memory.activity[start..];
    let errors = window.iter().filter(|l| l.level == LogLevel::Error).count();
    let warnings = window.iter().filter(|l| l.level == LogLevel::Warning).count();

    let health = if errors > CRITICAL_ERRORS {
        Health::Critical
    } else if warnings > WARNING_WARNINGS {
        Health::Warning
    } else {
        Health::Healthy
    };

    let activity = |role: RoleId| memory.statuses.get(&role.label()).map(|s| s.activity);

    HealthReport {
        primary: activity(RoleId::PRIMARY),
        assistant: activity(RoleId::ASSISTANT),
        errors,
        warnings,
        health,
    }
}

#[cfg(test)]
mod tests {
    use crate::SharedState;
    use super::*;
    use triad_models::{RoleStatus, WorkspaceId};

    #[test]
    fn test_healthy_when_quiet() {
        let state = SharedState::new(WorkspaceId::new("quiet"));
        state.log("primary", LogLevel::Info, "working").unwrap();

        let report = state.diagnose().unwrap();
        assert_eq!(report.health, Health::Healthy);
        assert_eq!(report.errors, 0);
        assert!(report.primary.is_none());
    }

    #[test]
    fn test_critical_after_many_errors() {
        let state = SharedState::new(WorkspaceId::new("errors"));
        for _ in 0..6 {
            state.log("primary", LogLevel::Error, "boom").unwrap();
        }
        state
            .set_status(RoleStatus::new(RoleId::PRIMARY, Activity::Busy, None))
            .unwrap();

        let report = state.diagnose().unwrap();
        assert_eq!(report.health, Health::Critical);
        assert_eq!(report.errors, 6);
        assert_eq!(report.primary, Some(Activity::Busy));
    }

    #[test]
    fn test_warning_threshold() {
        let state = SharedState::new(WorkspaceId::new("warn"));
        for _ in 0..10 {
            state.log("assistant", LogLevel::Warning, "slow").unwrap();
        }
        assert_eq!(state.diagnose().unwrap().health, Health::Healthy);

        state.log("assistant", LogLevel::Warning, "slower").unwrap();
        assert_eq!(state.diagnose().unwrap().health, Health::Warning);
    }
}

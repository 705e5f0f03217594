//! Entries recorded in a workspace's shared memory.
//!
//! Every entry carries a per-workspace sequence number assigned under the
//! workspace lock, so entries are strictly ordered even when wall-clock
//! timestamps collide.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::TeamId;
use crate::role::RoleId;

/// Context key for user input.
pub const USER_INPUT: &str = "user_input";
/// Context key for user documentation.
pub const USER_DOCS: &str = "user_docs";
/// Context key for codebase notes.
pub const CODEBASE_CONTEXT: &str = "codebase_context";

/// One line of conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEntry {
    /// Workspace sequence number.
    pub seq: u64,
    /// Role that produced the entry.
    pub role: RoleId,
    /// Speaker label (`system`, `assistant`, ...).
    pub speaker: String,
    /// Message text.
    pub message: String,
    /// When the entry was appended.
    pub timestamp: DateTime<Utc>,
}

/// A recorded decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Workspace sequence number.
    pub seq: u64,
    /// Role that made the decision.
    pub role: RoleId,
    /// Subtask the decision concerns, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtask: Option<String>,
    /// Decision text.
    pub decision: String,
    /// Rationale.
    pub rationale: String,
    /// Whether this decision settles a dispute.
    #[serde(default)]
    pub binding: bool,
    /// When the decision was appended.
    pub timestamp: DateTime<Utc>,
}

/// A recorded bug encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BugRecord {
    /// Workspace sequence number.
    pub seq: u64,
    /// Role that reported the bug.
    pub role: RoleId,
    /// Bug description.
    pub description: String,
    /// Structured details (task, subtask, error source...).
    #[serde(default)]
    pub details: serde_json::Value,
    /// Set once a solution references this bug.
    #[serde(default)]
    pub resolved: bool,
    /// When the bug was appended.
    pub timestamp: DateTime<Utc>,
}

/// A recorded solution to a bug.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolutionRecord {
    /// Workspace sequence number.
    pub seq: u64,
    /// Role that resolved the bug.
    pub role: RoleId,
    /// Index of the bug in the bug log.
    pub bug_index: usize,
    /// Solution text.
    pub solution: String,
    /// When the solution was appended.
    pub timestamp: DateTime<Utc>,
}

/// A user-supplied context value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextEntry {
    /// Context value.
    pub content: String,
    /// When the value was added.
    pub timestamp: DateTime<Utc>,
}

/// Record of a team spawned from a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRecord {
    /// Role that triggered the spawn.
    pub parent_role: RoleId,
    /// Spawned team.
    pub team_id: TeamId,
    /// Work handed to the team.
    pub task: String,
    /// `active` or `terminated`.
    pub status: String,
    /// When the team was spawned.
    pub timestamp: DateTime<Utc>,
}

/// Severity of an activity log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Informational.
    #[default]
    Info,
    /// Something looked off.
    Warning,
    /// Something failed.
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// One line of the workspace activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLine {
    /// Workspace sequence number.
    pub seq: u64,
    /// Who wrote the line (a role label, `spawner`, ...).
    pub source: String,
    /// Severity.
    pub level: LogLevel,
    /// Message.
    pub message: String,
    /// When the line was written.
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for ActivityLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] [{}] {}: {}",
            self.timestamp.to_rfc3339(),
            self.source,
            self.level,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activity_line_format() {
        let line = ActivityLine {
            seq: 3,
            source: "assistant".to_string(),
            level: LogLevel::Warning,
            message: "Hit a wall".to_string(),
            timestamp: Utc::now(),
        };
        let text = line.to_string();
        assert!(text.contains("[assistant] WARNING: Hit a wall"));
    }

    #[test]
    fn test_log_level_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&LogLevel::Error).unwrap(), "\"ERROR\"");
    }
}

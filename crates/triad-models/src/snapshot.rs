//! Serializable form of one workspace's shared memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ids::WorkspaceId;
use crate::records::{
    ActivityLine, BugRecord, ContextEntry, ConversationEntry, DecisionRecord, SolutionRecord,
    SpawnRecord, CODEBASE_CONTEXT, USER_DOCS, USER_INPUT,
};
use crate::role::RoleStatus;

/// Everything a workspace holds, as written to and read from disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceSnapshot {
    /// Workspace id.
    pub workspace_id: WorkspaceId,
    /// When the workspace was created.
    pub created_at: DateTime<Utc>,
    /// Next sequence number to hand out.
    #[serde(default)]
    pub next_seq: u64,
    /// Conversation log.
    #[serde(default)]
    pub conversation: Vec<ConversationEntry>,
    /// Decision log.
    #[serde(default)]
    pub decisions: Vec<DecisionRecord>,
    /// Bug log.
    #[serde(default)]
    pub bugs: Vec<BugRecord>,
    /// Solution log.
    #[serde(default)]
    pub solutions: Vec<SolutionRecord>,
    /// Role statuses keyed by role label.
    #[serde(default)]
    pub statuses: BTreeMap<String, RoleStatus>,
    /// User context keyed by context key.
    #[serde(default)]
    pub context: BTreeMap<String, Vec<ContextEntry>>,
    /// Teams spawned from this workspace.
    #[serde(default)]
    pub spawned: Vec<SpawnRecord>,
    /// Activity log.
    #[serde(default)]
    pub activity: Vec<ActivityLine>,
}

impl WorkspaceSnapshot {
    /// Creates an empty snapshot with the standard context keys.
    pub fn new(workspace_id: WorkspaceId) -> Self {
        let mut context = BTreeMap::new();
        for key in [USER_INPUT, USER_DOCS, CODEBASE_CONTEXT] {
            context.insert(key.to_string(), Vec::new());
        }

        Self {
            workspace_id,
            created_at: Utc::now(),
            next_seq: 0,
            conversation: Vec::new(),
            decisions: Vec::new(),
            bugs: Vec::new(),
            solutions: Vec::new(),
            statuses: BTreeMap::new(),
            context,
            spawned: Vec::new(),
            activity: Vec::new(),
        }
    }
}

//! SharedState - one workspace's logs, statuses and context.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, trace};
use triad_models::{
    ActivityLine, BugRecord, ContextEntry, ConversationEntry, DecisionRecord, LogLevel, RoleId,
    RoleStatus, SolutionRecord, SpawnRecord, TeamId, WorkspaceId, WorkspaceSnapshot,
};

use crate::error::{MemoryError, Result};
use crate::health::{self, HealthReport};

/// Shared memory of one workspace.
///
/// All logs are append-only. Every mutating method takes the workspace lock
/// once, so each append is atomic with respect to other writers.
#[derive(Debug)]
pub struct SharedState {
    workspace: WorkspaceId,
    inner: Mutex<WorkspaceSnapshot>,
}

impl SharedState {
    /// Creates an empty workspace.
    pub fn new(workspace: WorkspaceId) -> Self {
        Self::from_snapshot(WorkspaceSnapshot::new(workspace))
    }

    /// Restores a workspace from a snapshot.
    pub fn from_snapshot(snapshot: WorkspaceSnapshot) -> Self {
        Self {
            workspace: snapshot.workspace_id.clone(),
            inner: Mutex::new(snapshot),
        }
    }

    /// Workspace id.
    pub fn workspace(&self) -> &WorkspaceId {
        &self.workspace
    }

    fn lock(&self) -> Result<MutexGuard<'_, WorkspaceSnapshot>> {
        self.inner
            .lock()
            .map_err(|e| MemoryError::LockPoisoned(e.to_string()))
    }

    fn next_seq(memory: &mut WorkspaceSnapshot) -> u64 {
        let seq = memory.next_seq;
        memory.next_seq += 1;
        seq
    }

    /// Appends a conversation entry. Returns its sequence number.
    pub fn add_conversation(
        &self,
        role: RoleId,
        speaker: &str,
        message: impl Into<String>,
    ) -> Result<u64> {
        let mut memory = self.lock()?;
        let seq = Self::next_seq(&mut memory);
        let entry = ConversationEntry {
            seq,
            role,
            speaker: speaker.to_string(),
            message: message.into(),
            timestamp: Utc::now(),
        };
        trace!(workspace = %self.workspace, seq, role = %role, "conversation: {}", entry.message);
        memory.conversation.push(entry);
        Ok(seq)
    }

    /// Appends a decision. Returns its index in the decision log.
    pub fn add_decision(
        &self,
        role: RoleId,
        subtask: Option<&str>,
        decision: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Result<usize> {
        self.push_decision(role, subtask, decision.into(), rationale.into(), false)
    }

    /// Appends a binding decision that settles a dispute.
    pub fn add_binding_decision(
        &self,
        role: RoleId,
        subtask: Option<&str>,
        decision: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Result<usize> {
        self.push_decision(role, subtask, decision.into(), rationale.into(), true)
    }

    fn push_decision(
        &self,
        role: RoleId,
        subtask: Option<&str>,
        decision: String,
        rationale: String,
        binding: bool,
    ) -> Result<usize> {
        let mut memory = self.lock()?;
        let seq = Self::next_seq(&mut memory);
        memory.decisions.push(DecisionRecord {
            seq,
            role,
            subtask: subtask.map(str::to_string),
            decision,
            rationale,
            binding,
            timestamp: Utc::now(),
        });
        debug!(workspace = %self.workspace, seq, role = %role, binding, "Recorded decision");
        Ok(memory.decisions.len() - 1)
    }

    /// Appends a bug record. Returns the bug's index.
    pub fn add_bug(
        &self,
        role: RoleId,
        description: impl Into<String>,
        details: serde_json::Value,
    ) -> Result<usize> {
        let mut memory = self.lock()?;
        let seq = Self::next_seq(&mut memory);
        memory.bugs.push(BugRecord {
            seq,
            role,
            description: description.into(),
            details,
            resolved: false,
            timestamp: Utc::now(),
        });
        let index = memory.bugs.len() - 1;
        debug!(workspace = %self.workspace, seq, bug_index = index, role = %role, "Recorded bug");
        Ok(index)
    }

    /// Appends a solution for bug `bug_index` and marks the bug resolved.
    ///
    /// # Errors
    /// [`MemoryError::DanglingSolution`] if no bug exists at `bug_index`;
    /// nothing is stored in that case.
    pub fn add_solution(
        &self,
        role: RoleId,
        bug_index: usize,
        solution: impl Into<String>,
    ) -> Result<usize> {
        let mut memory = self.lock()?;
        let bug_count = memory.bugs.len();
        if bug_index >= bug_count {
            return Err(MemoryError::DanglingSolution {
                bug_index,
                bug_count,
            });
        }

        let seq = Self::next_seq(&mut memory);
        memory.solutions.push(SolutionRecord {
            seq,
            role,
            bug_index,
            solution: solution.into(),
            timestamp: Utc::now(),
        });
        memory.bugs[bug_index].resolved = true;
        debug!(workspace = %self.workspace, seq, bug_index, role = %role, "Recorded solution");
        Ok(memory.solutions.len() - 1)
    }

    /// Returns a bug together with every solution that references it.
    pub fn bug_with_solutions(
        &self,
        bug_index: usize,
    ) -> Result<Option<(BugRecord, Vec<SolutionRecord>)>> {
        let memory = self.lock()?;
        Ok(memory.bugs.get(bug_index).map(|bug| {
            let solutions = memory
                .solutions
                .iter()
                .filter(|s| s.bug_index == bug_index)
                .cloned()
                .collect();
            (bug.clone(), solutions)
        }))
    }

    /// Returns the most recent unresolved bug and its index.
    pub fn latest_unresolved_bug(&self) -> Result<Option<(usize, BugRecord)>> {
        let memory = self.lock()?;
        Ok(memory
            .bugs
            .iter()
            .enumerate()
            .rev()
            .find(|(_, bug)| !bug.resolved)
            .map(|(i, bug)| (i, bug.clone())))
    }

    /// Replaces the status record of `status.role`.
    pub fn set_status(&self, status: RoleStatus) -> Result<()> {
        let mut memory = self.lock()?;
        trace!(workspace = %self.workspace, role = %status.role, activity = %status.activity, "Status update");
        memory.statuses.insert(status.role.label(), status);
        Ok(())
    }

    /// Status record of `role`, if one was ever written.
    pub fn status(&self, role: RoleId) -> Result<Option<RoleStatus>> {
        Ok(self.lock()?.statuses.get(&role.label()).cloned())
    }

    /// All status records, ordered by role label.
    pub fn statuses(&self) -> Result<Vec<RoleStatus>> {
        Ok(self.lock()?.statuses.values().cloned().collect())
    }

    /// Appends a value under a context key.
    ///
    /// Role ownership of the context is checked by the caller.
    pub fn put_context(&self, key: &str, content: impl Into<String>) -> Result<()> {
        let mut memory = self.lock()?;
        memory
            .context
            .entry(key.to_string())
            .or_default()
            .push(ContextEntry {
                content: content.into(),
                timestamp: Utc::now(),
            });
        Ok(())
    }

    /// Copy of the whole context mapping.
    pub fn context(&self) -> Result<BTreeMap<String, Vec<ContextEntry>>> {
        Ok(self.lock()?.context.clone())
    }

    /// Writes one activity log line.
    pub fn log(&self, source: &str, level: LogLevel, message: impl Into<String>) -> Result<()> {
        let mut memory = self.lock()?;
        let seq = Self::next_seq(&mut memory);
        memory.activity.push(ActivityLine {
            seq,
            source: source.to_string(),
            level,
            message: message.into(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// The last `lines` activity log lines, oldest first.
    pub fn read_logs(&self, lines: usize) -> Result<Vec<ActivityLine>> {
        let memory = self.lock()?;
        let start = memory.activity.len().saturating_sub(lines);
        Ok(memory.activity[start..].to_vec())
    }

    /// The last `limit` conversation entries, oldest first.
    pub fn recent_conversation(&self, limit: usize) -> Result<Vec<ConversationEntry>> {
        let memory = self.lock()?;
        let start = memory.conversation.len().saturating_sub(limit);
        Ok(memory.conversation[start..].to_vec())
    }

    /// Full conversation log.
    pub fn conversation(&self) -> Result<Vec<ConversationEntry>> {
        Ok(self.lock()?.conversation.clone())
    }

    /// Full decision log.
    pub fn decisions(&self) -> Result<Vec<DecisionRecord>> {
        Ok(self.lock()?.decisions.clone())
    }

    /// Full bug log.
    pub fn bugs(&self) -> Result<Vec<BugRecord>> {
        Ok(self.lock()?.bugs.clone())
    }

    /// Full solution log.
    pub fn solutions(&self) -> Result<Vec<SolutionRecord>> {
        Ok(self.lock()?.solutions.clone())
    }

    /// Records a team spawned from this workspace.
    pub fn register_spawn(&self, parent_role: RoleId, team_id: &TeamId, task: &str) -> Result<()> {
        let mut memory = self.lock()?;
        memory.spawned.push(SpawnRecord {
            parent_role,
            team_id: team_id.clone(),
            task: task.to_string(),
            status: "active".to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Marks a spawn record terminated. Returns `false` if the team was never
    /// registered here.
    pub fn mark_spawn_terminated(&self, team_id: &TeamId) -> Result<bool> {
        let mut memory = self.lock()?;
        match memory.spawned.iter_mut().find(|r| &r.team_id == team_id) {
            Some(record) => {
                record.status = "terminated".to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Teams spawned from this workspace.
    pub fn spawned_records(&self) -> Result<Vec<SpawnRecord>> {
        Ok(self.lock()?.spawned.clone())
    }

    /// Health diagnosis over the recent activity log.
    pub fn diagnose(&self) -> Result<HealthReport> {
        let memory = self.lock()?;
        Ok(health::diagnose(&memory))
    }

    /// Copy of everything, for persistence.
    pub fn snapshot(&self) -> Result<WorkspaceSnapshot> {
        Ok(self.lock()?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;
    use triad_models::{Activity, RoleKind, USER_INPUT};

    fn state() -> SharedState {
        SharedState::new(WorkspaceId::new("test"))
    }

    #[test]
    fn test_bug_and_solution_are_correlated() {
        let state = state();
        let bug = state
            .add_bug(RoleId::PRIMARY, "TypeError", json!({"subtask": "parse"}))
            .unwrap();
        state
            .add_solution(RoleId::ASSISTANT, bug, "Check input types")
            .unwrap();

        let (record, solutions) = state.bug_with_solutions(bug).unwrap().unwrap();
        assert!(record.resolved);
        assert_eq!(solutions.len(), 1);
        assert_eq!(solutions[0].bug_index, bug);
        assert_eq!(solutions[0].role, RoleId::ASSISTANT);
    }

    #[test]
    fn test_dangling_solution_is_rejected() {
        let state = state();
        state.add_bug(RoleId::PRIMARY, "bug", json!({})).unwrap();

        let err = state.add_solution(RoleId::ASSISTANT, 5, "fix").unwrap_err();
        assert!(matches!(
            err,
            MemoryError::DanglingSolution {
                bug_index: 5,
                bug_count: 1
            }
        ));
        assert!(state.solutions().unwrap().is_empty());
    }

    #[test]
    fn test_solution_without_any_bug_is_rejected() {
        let state = state();
        let err = state.add_solution(RoleId::ARBITRATOR, 0, "cure").unwrap_err();
        assert!(err.is_state_corruption());
    }

    #[test]
    fn test_sequence_numbers_are_monotonic_across_logs() {
        let state = state();
        let a = state.add_conversation(RoleId::PRIMARY, "system", "start").unwrap();
        state
            .add_decision(RoleId::ARBITRATOR, None, "go", "because")
            .unwrap();
        let c = state.add_conversation(RoleId::PRIMARY, "system", "done").unwrap();

        assert!(a < c);
        let decision_seq = state.decisions().unwrap()[0].seq;
        assert!(a < decision_seq && decision_seq < c);
    }

    #[test]
    fn test_latest_unresolved_bug() {
        let state = state();
        let first = state.add_bug(RoleId::PRIMARY, "one", json!({})).unwrap();
        let second = state.add_bug(RoleId::PRIMARY, "two", json!({})).unwrap();
        state.add_solution(RoleId::ASSISTANT, second, "fixed").unwrap();

        let (index, bug) = state.latest_unresolved_bug().unwrap().unwrap();
        assert_eq!(index, first);
        assert_eq!(bug.description, "one");
    }

    #[test]
    fn test_read_logs_bounded_window() {
        let state = state();
        for i in 0..10 {
            state.log("primary", LogLevel::Info, format!("line {}", i)).unwrap();
        }

        let lines = state.read_logs(3).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].message, "line 7");
        assert_eq!(lines[2].message, "line 9");
        assert_eq!(state.read_logs(100).unwrap().len(), 10);
    }

    #[test]
    fn test_status_roundtrip() {
        let state = state();
        assert!(state.status(RoleId::PRIMARY).unwrap().is_none());

        state
            .set_status(RoleStatus::new(
                RoleId::PRIMARY,
                Activity::Busy,
                Some("parse".to_string()),
            ))
            .unwrap();

        let status = state.status(RoleId::PRIMARY).unwrap().unwrap();
        assert_eq!(status.activity, Activity::Busy);
        assert_eq!(status.current.as_deref(), Some("parse"));
        assert!(state
            .status(RoleId::monitor(RoleKind::Primary))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_context_appends() {
        let state = state();
        state.put_context(USER_INPUT, "first").unwrap();
        state.put_context(USER_INPUT, "second").unwrap();

        let context = state.context().unwrap();
        assert_eq!(context[USER_INPUT].len(), 2);
        assert_eq!(context[USER_INPUT][1].content, "second");
    }

    #[test]
    fn test_spawn_records() {
        let state = state();
        let team = TeamId::from("team-1");
        state.register_spawn(RoleId::PRIMARY, &team, "Build auth").unwrap();

        assert!(state.mark_spawn_terminated(&team).unwrap());
        assert!(!state.mark_spawn_terminated(&TeamId::from("team-2")).unwrap());
        assert_eq!(state.spawned_records().unwrap()[0].status, "terminated");
    }

    #[test]
    fn test_concurrent_appends_lose_nothing() {
        let state = Arc::new(state());
        let writers = 8;
        let per_writer = 250;

        let handles: Vec<_> = (0..writers)
            .map(|w| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    for i in 0..per_writer {
                        state
                            .add_conversation(RoleId::PRIMARY, "system", format!("{}-{}", w, i))
                            .unwrap();
                        state.add_bug(RoleId::PRIMARY, "bug", json!({})).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let conversation = state.conversation().unwrap();
        assert_eq!(conversation.len(), writers * per_writer);
        assert_eq!(state.bugs().unwrap().len(), writers * per_writer);

        let mut seqs: Vec<u64> = conversation.iter().map(|e| e.seq).collect();
        seqs.dedup();
        assert_eq!(seqs.len(), writers * per_writer);
        assert!(seqs.windows(2).all(|w| w[0] < w[1]));
    }
}

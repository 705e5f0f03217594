//! TeamSpawner - creates and tracks spawned teams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info, warn};
use triad_memory::{SharedMemory, SharedState};
use triad_models::{LogLevel, RoleId, Task, Team, TeamId, WorkspaceId};

use crate::config::SpawnerConfig;
use crate::error::{Result, SpawnError};
use crate::partition::partition;
use crate::score::assess;

/// A spawned team and the handles needed to run and stop it.
#[derive(Debug, Clone)]
pub struct SpawnedTeam {
    pub team: Team,
    pub state: Arc<SharedState>,
    cancel: Arc<AtomicBool>,
}

impl SpawnedTeam {
    /// Flag the team's coordinator polls at each transition.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }
}

/// Spawns teams for one originating team.
///
/// # Concurrency
///
/// The registry sits behind one `Mutex`. The cap counts teams across the
/// whole spawn tree: spawners made with [`TeamSpawner::nested`] share one
/// counter, and a request reserves all of its teams on it in a single
/// atomic update, so concurrent requests at any depth can never overshoot
/// `max_teams` together.
pub struct TeamSpawner {
    config: SpawnerConfig,
    memory: Arc<SharedMemory>,
    parent: Team,
    registry: Mutex<HashMap<TeamId, SpawnedTeam>>,
    /// Active teams across every spawner of the tree.
    tree_active: Arc<AtomicUsize>,
}

impl TeamSpawner {
    /// Creates a spawner for teams originating from `parent`.
    pub fn new(config: SpawnerConfig, memory: Arc<SharedMemory>, parent: Team) -> Self {
        Self {
            config,
            memory,
            parent,
            registry: Mutex::new(HashMap::new()),
            tree_active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Spawner for teams originating from `parent`, a team this spawner
    /// created. It shares the config and the cap with `self`.
    pub fn nested(&self, parent: Team) -> Self {
        Self {
            config: self.config.clone(),
            memory: Arc::clone(&self.memory),
            parent,
            registry: Mutex::new(HashMap::new()),
            tree_active: Arc::clone(&self.tree_active),
        }
    }

    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    pub fn parent(&self) -> &Team {
        &self.parent
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<TeamId, SpawnedTeam>>> {
        self.registry
            .lock()
            .map_err(|e| SpawnError::LockPoisoned(e.to_string()))
    }

    /// Number of extra teams `task` calls for.
    pub fn assess(&self, task: &Task) -> usize {
        assess(task)
    }

    /// Spawns `count` teams for `task`.
    ///
    /// Team `k` (1-based) gets slot `k` of
    /// [`partition`](crate::partition)`(&task.subtasks, count)`. The spawn is
    /// recorded in the parent workspace.
    ///
    /// # Errors
    /// - [`SpawnError::SpawnLimitExceeded`] if `count` more teams would take
    ///   the spawn tree past the cap. Nothing is spawned.
    /// - [`SpawnError::RecursionDisabled`] if the parent is itself spawned
    ///   and recursion is off.
    pub fn spawn(&self, task: &Task, role: RoleId, count: usize) -> Result<Vec<TeamId>> {
        if count == 0 {
            return Ok(Vec::new());
        }
        if self.parent.depth > 0 && !self.config.allow_recursive {
            warn!(team_id = %self.parent.id, depth = self.parent.depth, "Refusing recursive spawn");
            return Err(SpawnError::RecursionDisabled {
                depth: self.parent.depth,
            });
        }

        let parent_state = self.memory.workspace(&self.parent.workspace)?;
        let mut registry = self.lock()?;

        let max = self.config.max_teams;
        if let Err(active) = self
            .tree_active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |active| {
                (active + count <= max).then_some(active + count)
            })
        {
            warn!(requested = count, active, max, "Spawn limit exceeded");
            return Err(SpawnError::SpawnLimitExceeded {
                requested: count,
                active,
                max,
            });
        }

        let slices = partition(&task.subtasks, count);
        let mut spawned = Vec::with_capacity(count);

        for assignment in slices.into_iter().skip(1) {
            match self.register(&mut registry, &parent_state, role, assignment) {
                Ok(id) => spawned.push(id),
                Err(e) => {
                    self.tree_active
                        .fetch_sub(count - spawned.len(), Ordering::SeqCst);
                    return Err(e);
                }
            }
        }

        Ok(spawned)
    }

    fn register(
        &self,
        registry: &mut HashMap<TeamId, SpawnedTeam>,
        parent_state: &SharedState,
        role: RoleId,
        assignment: Vec<String>,
    ) -> Result<TeamId> {
        let (id, workspace) = self.allocate_ids(registry);
        let state = self.memory.workspace(&workspace)?;

        let team = Team {
            id: id.clone(),
            workspace,
            parent_workspace: Some(self.parent.workspace.clone()),
            spawned_by: Some(role),
            assignment,
            depth: self.parent.depth + 1,
            dual_layer: self.config.dual_layer,
            created_at: Utc::now(),
        };

        let summary = team.assignment.join(", ");
        parent_state.register_spawn(role, &id, &summary)?;
        parent_state.log(
            "spawner",
            LogLevel::Info,
            format!("Spawned team {} for: {}", id, summary),
        )?;
        info!(team_id = %id, workspace = %team.workspace, depth = team.depth, role = %role, "Spawned team");

        registry.insert(
            id.clone(),
            SpawnedTeam {
                team,
                state,
                cancel: Arc::new(AtomicBool::new(false)),
            },
        );
        Ok(id)
    }

    /// Assesses `task` and spawns that many teams.
    pub fn spawn_for_task(&self, task: &Task, role: RoleId) -> Result<Vec<TeamId>> {
        let count = self.assess(task);
        if count == 0 {
            debug!(team_id = %self.parent.id, "Task complexity low, no spawn");
            return Ok(Vec::new());
        }
        self.spawn(task, role, count)
    }

    /// Picks a team id and workspace unseen by this registry and by memory.
    fn allocate_ids(&self, registry: &HashMap<TeamId, SpawnedTeam>) -> (TeamId, WorkspaceId) {
        loop {
            let id = TeamId::new();
            let workspace = WorkspaceId::child(&self.parent.workspace, &id);
            if !registry.contains_key(&id) && !self.memory.contains(&workspace) {
                return (id, workspace);
            }
            warn!(team_id = %id, "Team id collision, retrying");
        }
    }

    /// Ids of active teams, oldest first.
    pub fn list_active(&self) -> Result<Vec<TeamId>> {
        let registry = self.lock()?;
        let mut teams: Vec<&SpawnedTeam> = registry.values().collect();
        teams.sort_by(|a, b| a.team.created_at.cmp(&b.team.created_at));
        Ok(teams.into_iter().map(|t| t.team.id.clone()).collect())
    }

    /// Active team record, or `None` if unknown or torn down.
    pub fn team(&self, id: &TeamId) -> Result<Option<SpawnedTeam>> {
        Ok(self.lock()?.get(id).cloned())
    }

    pub fn active_count(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Active teams across the whole spawn tree, the figure the cap bounds.
    pub fn tree_active_count(&self) -> usize {
        self.tree_active.load(Ordering::SeqCst)
    }

    /// Removes a team and raises its cancellation flag.
    ///
    /// # Errors
    /// [`SpawnError::NotFound`] if the team is unknown or already torn down.
    pub fn teardown(&self, id: &TeamId) -> Result<SpawnedTeam> {
        let removed = self
            .lock()?
            .remove(id)
            .ok_or_else(|| SpawnError::NotFound(id.clone()))?;
        removed.cancel.store(true, Ordering::SeqCst);
        self.tree_active.fetch_sub(1, Ordering::SeqCst);

        let parent_state = self.memory.workspace(&self.parent.workspace)?;
        parent_state.mark_spawn_terminated(id)?;
        parent_state.log("spawner", LogLevel::Info, format!("Terminated team {}", id))?;
        info!(team_id = %id, "Tore down team");

        Ok(removed)
    }

    /// Tears down every active team. Returns how many were removed.
    pub fn teardown_all(&self) -> Result<usize> {
        let ids: Vec<TeamId> = self.lock()?.keys().cloned().collect();
        for id in &ids {
            self.teardown(id)?;
        }
        Ok(ids.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use triad_models::Difficulty;

    fn spawner(max: usize) -> TeamSpawner {
        let memory = Arc::new(SharedMemory::new());
        let parent = Team::root(WorkspaceId::new("root"));
        TeamSpawner::new(SpawnerConfig::new().with_max_teams(max), memory, parent)
    }

    fn complex_task() -> Task {
        Task::new("Build microservices")
            .with_subtasks([
                "Design API gateway",
                "Build auth service",
                "Build user service",
                "Build payment service",
                "Setup monitoring",
            ])
            .with_hours(20.0)
            .with_dependencies(["Docker", "K8s", "PostgreSQL"])
            .with_difficulty(Difficulty::High)
    }

    #[test]
    fn test_spawn_returns_distinct_active_teams() {
        let spawner = spawner(10);
        let ids = spawner.spawn(&complex_task(), RoleId::PRIMARY, 3).unwrap();

        assert_eq!(ids.len(), 3);
        let unique: HashSet<_> = ids.iter().collect();
        assert_eq!(unique.len(), 3);

        let active = spawner.list_active().unwrap();
        for id in &ids {
            assert!(active.contains(id));
        }

        let workspaces: HashSet<_> = ids
            .iter()
            .map(|id| spawner.team(id).unwrap().unwrap().team.workspace)
            .collect();
        assert_eq!(workspaces.len(), 3);
        assert!(!workspaces.contains(&WorkspaceId::new("root")));
    }

    #[test]
    fn test_spawned_team_record() {
        let spawner = spawner(10);
        let ids = spawner.spawn(&complex_task(), RoleId::PRIMARY, 2).unwrap();
        let team = spawner.team(&ids[0]).unwrap().unwrap().team;

        assert_eq!(team.parent_workspace, Some(WorkspaceId::new("root")));
        assert_eq!(team.spawned_by, Some(RoleId::PRIMARY));
        assert_eq!(team.depth, 1);
        assert_eq!(team.assignment, vec!["Build auth service", "Setup monitoring"]);
        assert!(team.workspace.as_str().starts_with("root_team-"));
    }

    #[test]
    fn test_spawn_records_in_parent_workspace() {
        let memory = Arc::new(SharedMemory::new());
        let root = WorkspaceId::new("root");
        let spawner = TeamSpawner::new(
            SpawnerConfig::default(),
            Arc::clone(&memory),
            Team::root(root.clone()),
        );
        let ids = spawner.spawn(&complex_task(), RoleId::PRIMARY, 2).unwrap();

        let records = memory.workspace(&root).unwrap().spawned_records().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].team_id, ids[0]);
        assert_eq!(records[0].status, "active");
    }

    #[test]
    fn test_cap_fails_whole_request() {
        let spawner = spawner(4);
        spawner.spawn(&complex_task(), RoleId::PRIMARY, 3).unwrap();

        let err = spawner.spawn(&complex_task(), RoleId::PRIMARY, 2).unwrap_err();
        assert!(matches!(
            err,
            SpawnError::SpawnLimitExceeded {
                requested: 2,
                active: 3,
                max: 4
            }
        ));
        assert_eq!(spawner.active_count().unwrap(), 3);
    }

    #[test]
    fn test_spawn_zero_is_noop() {
        let spawner = spawner(0);
        assert!(spawner.spawn(&complex_task(), RoleId::PRIMARY, 0).unwrap().is_empty());
    }

    #[test]
    fn test_spawn_for_task_uses_assessment() {
        let spawner = spawner(10);
        let simple = Task::new("typo").with_subtasks(["Fix typo"]).with_difficulty(Difficulty::Low);
        assert!(spawner.spawn_for_task(&simple, RoleId::PRIMARY).unwrap().is_empty());

        let ids = spawner.spawn_for_task(&complex_task(), RoleId::PRIMARY).unwrap();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn test_teardown_twice_is_not_found() {
        let spawner = spawner(10);
        let ids = spawner.spawn(&complex_task(), RoleId::PRIMARY, 1).unwrap();

        let torn = spawner.teardown(&ids[0]).unwrap();
        assert!(torn.is_cancelled());
        assert!(spawner.list_active().unwrap().is_empty());

        let err = spawner.teardown(&ids[0]).unwrap_err();
        assert!(matches!(err, SpawnError::NotFound(ref id) if id == &ids[0]));
    }

    #[test]
    fn test_teardown_unknown_team() {
        let spawner = spawner(10);
        let err = spawner.teardown(&TeamId::from("team-missing")).unwrap_err();
        assert!(matches!(err, SpawnError::NotFound(_)));
    }

    #[test]
    fn test_teardown_frees_capacity() {
        let spawner = spawner(2);
        let ids = spawner.spawn(&complex_task(), RoleId::PRIMARY, 2).unwrap();
        spawner.teardown(&ids[1]).unwrap();
        assert_eq!(spawner.spawn(&complex_task(), RoleId::PRIMARY, 1).unwrap().len(), 1);
        assert_eq!(spawner.teardown_all().unwrap(), 2);
    }

    #[test]
    fn test_spawned_parent_cannot_spawn() {
        let memory = Arc::new(SharedMemory::new());
        let mut parent = Team::root(WorkspaceId::new("child"));
        parent.depth = 1;
        parent.parent_workspace = Some(WorkspaceId::new("root"));
        let spawner = TeamSpawner::new(SpawnerConfig::default(), memory, parent);

        let err = spawner.spawn(&complex_task(), RoleId::PRIMARY, 1).unwrap_err();
        assert!(matches!(err, SpawnError::RecursionDisabled { depth: 1 }));
    }

    #[test]
    fn test_nested_spawner_shares_cap() {
        let root = TeamSpawner::new(
            SpawnerConfig::new().with_max_teams(4).with_recursion(true),
            Arc::new(SharedMemory::new()),
            Team::root(WorkspaceId::new("root")),
        );
        let ids = root.spawn(&complex_task(), RoleId::PRIMARY, 3).unwrap();
        let child = root.team(&ids[0]).unwrap().unwrap().team;
        let nested = root.nested(child.clone());

        let grandchild = nested.spawn(&complex_task(), RoleId::PRIMARY, 1).unwrap();
        let team = nested.team(&grandchild[0]).unwrap().unwrap().team;
        assert_eq!(team.depth, 2);
        assert_eq!(team.parent_workspace, Some(child.workspace));
        assert_eq!(root.tree_active_count(), 4);

        let err = root.spawn(&complex_task(), RoleId::PRIMARY, 1).unwrap_err();
        assert!(matches!(
            err,
            SpawnError::SpawnLimitExceeded {
                requested: 1,
                active: 4,
                max: 4
            }
        ));

        nested.teardown(&grandchild[0]).unwrap();
        assert_eq!(root.tree_active_count(), 3);
        assert_eq!(root.spawn(&complex_task(), RoleId::PRIMARY, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_spawns_respect_cap() {
        let spawner = Arc::new(spawner(10));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let spawner = Arc::clone(&spawner);
                std::thread::spawn(move || spawner.spawn(&complex_task(), RoleId::PRIMARY, 3).is_ok())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        assert_eq!(successes, 3);
        assert_eq!(spawner.active_count().unwrap(), 9);
    }
}

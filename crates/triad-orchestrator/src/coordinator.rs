//! Team coordinator.
//!
//! A [`Coordinator`] drives one team through a task: it scores the task,
//! spawns parallel teams when the score calls for them, then walks its own
//! subtasks through the [`CoordinatorStateMachine`]. Stalls escalate to the
//! assistant and then to the arbitrator, disputes are settled by a single
//! binding ruling, and a fatigued primary is rotated out for one subtask.
//! In dual-layer mode every main role is shadowed by a monitor that takes
//! over on a timeout, a backend error, or a stale status.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use triad_inference::{Generation, GenerationBackend, InferenceError};
use triad_memory::{MemoryError, SharedMemory, SharedState};
use triad_models::{
    Activity, ExecutionResult, ExecutionStatus, LogLevel, RoleId, RoleKind, SpawnedOutcome,
    Task, Team, TeamId, WorkspaceId, USER_DOCS, USER_INPUT,
};
use triad_spawner::{partition, score, teams_for_score, SpawnError, TeamSpawner};

use crate::config::CoordinatorConfig;
use crate::error::{OrchestratorError, Result};
use crate::roles::TeamRoles;
use crate::scenario::{Scenario, Signal};
use crate::state_machine::{
    CoordinatorEvent, CoordinatorState, CoordinatorStateMachine, StateMachineError,
};
use crate::status::SystemStatus;

/// Speaker used for coordinator notes in the conversation log.
const COORDINATOR: &str = "coordinator";

/// Generated text tagged with the backend that produced it.
fn attributed(generation: &Generation) -> String {
    format!("{} (via {})", generation.text, generation.provider)
}

/// Generation backends available to a team.
#[derive(Clone)]
pub struct Backends {
    /// Backend used by the main roles.
    pub main: Arc<dyn GenerationBackend>,
    /// Backend used by monitors in dual-layer mode.
    pub monitor: Option<Arc<dyn GenerationBackend>>,
}

impl Backends {
    pub fn single(main: Arc<dyn GenerationBackend>) -> Self {
        Self {
            main,
            monitor: None,
        }
    }

    pub fn dual(main: Arc<dyn GenerationBackend>, monitor: Arc<dyn GenerationBackend>) -> Self {
        Self {
            main,
            monitor: Some(monitor),
        }
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("main", &self.main.name())
            .field("monitor", &self.monitor.as_ref().map(|b| b.name()))
            .finish()
    }
}

/// Why a run stopped before completing.
enum Stop {
    Cancelled,
    /// The state machine is already in `Failed`.
    Failed(String),
    Error(OrchestratorError),
}

impl From<OrchestratorError> for Stop {
    fn from(err: OrchestratorError) -> Self {
        Stop::Error(err)
    }
}

impl From<MemoryError> for Stop {
    fn from(err: MemoryError) -> Self {
        Stop::Error(err.into())
    }
}

impl From<StateMachineError> for Stop {
    fn from(err: StateMachineError) -> Self {
        Stop::Error(err.into())
    }
}

type Step<T> = std::result::Result<T, Stop>;

/// Outcome of one team's own run, before spawned teams are joined.
#[derive(Debug)]
struct RunOutcome {
    status: ExecutionStatus,
    reason: Option<String>,
    completed: Vec<String>,
}

/// A spawned team that is running on its own tokio task.
struct Launched {
    team: Team,
    handle: JoinHandle<Result<ExecutionResult>>,
}

type TeamRun = Pin<Box<dyn Future<Output = Result<ExecutionResult>> + Send>>;

/// Coordinates one three-role team.
pub struct Coordinator {
    team: Team,
    config: CoordinatorConfig,
    memory: Arc<SharedMemory>,
    state: Arc<SharedState>,
    backends: Backends,
    roles: TeamRoles,
    spawner: Arc<TeamSpawner>,
    scenario: Arc<Scenario>,
    cancel: Arc<AtomicBool>,
    machine: CoordinatorStateMachine,
    /// Roles that will not answer their next call.
    hangs: HashSet<RoleKind>,
}

impl Coordinator {
    /// Creates a root coordinator over `workspace`.
    pub fn new(
        workspace: WorkspaceId,
        memory: Arc<SharedMemory>,
        backends: Backends,
        config: CoordinatorConfig,
    ) -> Result<Self> {
        let mut team = Team::root(workspace);
        team.dual_layer = config.dual_layer;
        Self::for_team(
            team,
            memory,
            backends,
            config,
            Arc::new(AtomicBool::new(false)),
        )
    }

    fn for_team(
        team: Team,
        memory: Arc<SharedMemory>,
        backends: Backends,
        config: CoordinatorConfig,
        cancel: Arc<AtomicBool>,
    ) -> Result<Self> {
        let state = memory.workspace(&team.workspace)?;

        let monitor_backend = if team.dual_layer {
            if backends.monitor.is_none() {
                warn!(team_id = %team.id, "No monitor backend configured, monitors share the main backend");
            }
            Some(backends.monitor.as_ref().unwrap_or(&backends.main))
        } else {
            None
        };
        let roles = TeamRoles::new(
            &state,
            &backends.main,
            monitor_backend,
            config.backend_timeout,
        );
        for handle in roles.mains() {
            handle.set_activity(Activity::Idle, None)?;
        }
        for handle in roles.monitors() {
            handle.set_activity(Activity::Standby, None)?;
        }

        let spawner = Arc::new(TeamSpawner::new(
            config.spawner.clone(),
            Arc::clone(&memory),
            team.clone(),
        ));

        debug!(team_id = %team.id, workspace = %team.workspace, depth = team.depth, "Coordinator created");

        Ok(Self {
            team,
            config,
            memory,
            state,
            backends,
            roles,
            spawner,
            scenario: Arc::new(Scenario::new()),
            cancel,
            machine: CoordinatorStateMachine::new(),
            hangs: HashSet::new(),
        })
    }

    /// Attaches scripted events. Spawned teams inherit the scenario.
    pub fn with_scenario(mut self, scenario: Scenario) -> Self {
        self.scenario = Arc::new(scenario);
        self
    }

    pub fn team(&self) -> &Team {
        &self.team
    }

    pub fn workspace(&self) -> &WorkspaceId {
        &self.team.workspace
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Current coordinator state.
    pub fn state(&self) -> CoordinatorState {
        self.machine.state()
    }

    /// Transitions taken during the last run.
    pub fn history(&self) -> &[(CoordinatorState, CoordinatorEvent, CoordinatorState)] {
        self.machine.history()
    }

    /// Shared memory of this team's workspace.
    pub fn shared_state(&self) -> &Arc<SharedState> {
        &self.state
    }

    pub fn spawner(&self) -> &Arc<TeamSpawner> {
        &self.spawner
    }

    /// Flag that cancels the run when set. Cloneable across tasks.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Requests cancellation. Takes effect at the next transition.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Snapshot of roles, spawned teams and workspace health.
    pub fn system_status(&self) -> Result<SystemStatus> {
        let active_teams = self
            .spawner
            .list_active()?
            .iter()
            .filter_map(|id| match self.spawner.team(id) {
                Ok(team) => team.map(|t| Ok(t.team)),
                Err(e) => Some(Err(e)),
            })
            .collect::<std::result::Result<Vec<_>, SpawnError>>()?;

        Ok(SystemStatus {
            team_id: self.team.id.clone(),
            workspace: self.team.workspace.clone(),
            state: self.machine.state(),
            dual_layer: self.roles.is_dual(),
            roles: self.state.statuses()?,
            promoted: self.roles.promoted(),
            active_teams,
            spawned: self.state.spawned_records()?,
            health: self.state.diagnose()?,
        })
    }

    /// Executes `task` to completion, failure, or cancellation.
    ///
    /// # Errors
    /// Requests that are rejected before any work starts: an invalid task,
    /// or a spawn cap overflow when degraded mode is off. Everything that
    /// goes wrong while running is reported in the returned result.
    pub async fn execute_task(&mut self, task: Task) -> Result<ExecutionResult> {
        task.validate()?;
        self.machine = CoordinatorStateMachine::new();
        self.execute(&task).await
    }

    async fn execute(&mut self, task: &Task) -> Result<ExecutionResult> {
        let complexity = score(task);
        let mut wanted = teams_for_score(complexity);
        if self.team.is_spawned() {
            // A spawned team only fans out over subtasks it can hand away.
            wanted = wanted.min(task.subtasks.len().saturating_sub(1));
        }
        info!(
            team_id = %self.team.id,
            complexity,
            extra_teams = wanted,
            subtasks = task.subtasks.len(),
            "Executing task"
        );

        let spawned_ids = self.spawn_teams(task, wanted)?;
        let own = partition(&task.subtasks, spawned_ids.len())
            .into_iter()
            .next()
            .unwrap_or_default();
        let launched = self.launch(task, &spawned_ids)?;

        let outcome = self.run(task, own).await;

        if outcome.status == ExecutionStatus::Cancelled && !spawned_ids.is_empty() {
            let cancelled = self.spawner.teardown_all()?;
            info!(team_id = %self.team.id, cancelled, "Cancelled spawned teams");
        }

        let mut spawned = Vec::with_capacity(launched.len());
        for Launched { team, handle } in launched {
            let mut nested = Vec::new();
            let (status, reason) = match handle.await {
                Ok(Ok(run)) => {
                    nested = run.spawned;
                    (run.status, run.reason)
                }
                Ok(Err(e)) => {
                    error!(team_id = %team.id, error = %e, "Spawned team rejected its slice");
                    (ExecutionStatus::Failed, Some(e.to_string()))
                }
                Err(e) => {
                    error!(team_id = %team.id, error = %e, "Spawned team did not finish");
                    (ExecutionStatus::Failed, Some(format!("team task aborted: {}", e)))
                }
            };
            info!(team_id = %team.id, status = %status, "Spawned team finished");
            spawned.push(SpawnedOutcome {
                team_id: team.id,
                workspace: team.workspace,
                assignment: team.assignment,
                status,
                reason,
            });
            spawned.extend(nested);
        }

        if self.config.teardown_on_completion {
            for id in &spawned_ids {
                match self.spawner.teardown(id) {
                    Ok(_) | Err(SpawnError::NotFound(_)) => {}
                    Err(e) => return Err(e.into()),
                }
            }
        }

        self.memory.flush(&self.team.workspace)?;
        for outcome in &spawned {
            self.memory.flush(&outcome.workspace)?;
        }

        info!(
            team_id = %self.team.id,
            status = %outcome.status,
            completed = outcome.completed.len(),
            "Task finished"
        );

        Ok(ExecutionResult {
            status: outcome.status,
            reason: outcome.reason,
            workspace: self.team.workspace.clone(),
            complexity,
            spawned_teams: spawned_ids,
            spawned,
            completed_subtasks: outcome.completed,
        })
    }

    fn spawn_teams(&self, task: &Task, wanted: usize) -> Result<Vec<TeamId>> {
        if wanted == 0 {
            return Ok(Vec::new());
        }
        if self.team.is_spawned() && !self.config.spawner.allow_recursive {
            debug!(team_id = %self.team.id, "Spawned team works its slice alone");
            return Ok(Vec::new());
        }

        // Only the root request is rejected at the cap. A spawned team that
        // finds the tree full works its slice alone.
        let degrade = self.config.degrade_on_spawn_limit || self.team.is_spawned();
        match self.spawner.spawn(task, RoleId::PRIMARY, wanted) {
            Ok(ids) => Ok(ids),
            Err(SpawnError::SpawnLimitExceeded {
                requested,
                active,
                max,
            }) if degrade => {
                warn!(
                    team_id = %self.team.id,
                    requested, active, max,
                    "Spawn limit reached, running as a single team"
                );
                self.state.log(
                    COORDINATOR,
                    LogLevel::Warning,
                    format!(
                        "spawn limit reached ({} active of {}), running without {} extra teams",
                        active, max, requested
                    ),
                )?;
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn launch(&self, task: &Task, ids: &[TeamId]) -> Result<Vec<Launched>> {
        let mut launched = Vec::with_capacity(ids.len());
        for id in ids {
            let spawned = self
                .spawner
                .team(id)?
                .ok_or_else(|| SpawnError::NotFound(id.clone()))?;
            let team = spawned.team.clone();
            let child_task = task.slice(team.assignment.clone());

            let mut child = Coordinator::for_team(
                team.clone(),
                Arc::clone(&self.memory),
                self.backends.clone(),
                self.config.clone(),
                spawned.cancel_flag(),
            )?;
            child.scenario = Arc::clone(&self.scenario);
            child.spawner = Arc::new(self.spawner.nested(team.clone()));

            let handle = tokio::spawn(child.run_spawned(child_task));
            launched.push(Launched { team, handle });
        }
        Ok(launched)
    }

    /// Runs a spawned team's slice, including any teams it spawns in turn.
    fn run_spawned(mut self, task: Task) -> TeamRun {
        Box::pin(async move { self.execute(&task).await })
    }

    async fn run(&mut self, task: &Task, subtasks: Vec<String>) -> RunOutcome {
        let mut completed = Vec::new();
        let (status, reason) = match self.drive(task, &subtasks, &mut completed).await {
            Ok(()) => (ExecutionStatus::Completed, None),
            Err(Stop::Cancelled) => (ExecutionStatus::Cancelled, Some("cancelled".to_string())),
            Err(Stop::Failed(reason)) => (ExecutionStatus::Failed, Some(reason)),
            Err(Stop::Error(e)) => {
                let reason = e.to_string();
                self.record_failure(&reason);
                (ExecutionStatus::Failed, Some(reason))
            }
        };

        for kind in RoleKind::ALL {
            let handle = self.roles.acting(kind);
            if let Err(e) = handle.set_activity(Activity::Idle, None) {
                warn!(role = %handle.role(), error = %e, "Could not reset role status");
            }
        }
        RunOutcome {
            status,
            reason,
            completed,
        }
    }

    async fn drive(
        &mut self,
        task: &Task,
        subtasks: &[String],
        completed: &mut Vec<String>,
    ) -> Step<()> {
        self.transition(
            CoordinatorEvent::Start,
            RoleId::PRIMARY,
            &format!("starting: {}", task.description),
        )?;

        let primary = self.roles.acting(RoleKind::Primary).clone();
        if let Some(input) = &task.user_input {
            primary.write_context(USER_INPUT, input.as_str())?;
        }
        if let Some(docs) = &task.user_docs {
            primary.write_context(USER_DOCS, docs.as_str())?;
        }
        primary.log(
            LogLevel::Info,
            format!("Starting task: {}", task.description),
        )?;

        let work = if subtasks.is_empty() {
            vec![task.description.clone()]
        } else {
            subtasks.to_vec()
        };

        for subtask in &work {
            self.check_cancel()?;
            self.supervise()?;

            let signals = self.scenario.signals_for(subtask).to_vec();
            self.hangs = signals
                .iter()
                .filter_map(|signal| match signal {
                    Signal::Hang { role } => Some(*role),
                    _ => None,
                })
                .collect();

            let mut done = false;
            for signal in signals {
                match signal {
                    Signal::Stuck {
                        bug,
                        assistant_can_fix,
                    } => {
                        let details = json!({ "subtask": subtask });
                        self.stall(subtask, bug, details, assistant_can_fix).await?;
                    }
                    Signal::Dispute { primary, assistant } => {
                        self.dispute(subtask, &primary, &assistant).await?;
                    }
                    Signal::Fatigue => {
                        done |= self.rotate(task, subtask).await?;
                    }
                    Signal::Hang { .. } => {}
                }
            }

            if !done {
                self.work(task, subtask).await?;
            }
            completed.push(subtask.clone());
            self.roles
                .acting(RoleKind::Primary)
                .say(COORDINATOR, format!("Completed subtask: {}", subtask))?;
        }

        self.transition(
            CoordinatorEvent::Complete,
            RoleId::PRIMARY,
            "all subtasks completed",
        )?;
        Ok(())
    }

    /// The primary performs `subtask`, stalling on every backend failure.
    ///
    /// The primary gets `max_escalations + 1` attempts per subtask, so a
    /// backend that only ever fails for the primary still ends the run.
    async fn work(&mut self, task: &Task, subtask: &str) -> Step<()> {
        let prompt = format!("Task: {}\nSubtask: {}", task.description, subtask);
        let mut attempts = 0;
        loop {
            if attempts > self.config.max_escalations {
                return Err(self.fail(format!(
                    "primary could not complete '{}' after {} attempts",
                    subtask, attempts
                )));
            }
            attempts += 1;

            let primary = self.roles.acting(RoleKind::Primary).clone();
            primary.set_activity(Activity::Busy, Some(subtask))?;

            match self.call(RoleKind::Primary, &prompt).await? {
                Ok(generation) => {
                    let primary = self.roles.acting(RoleKind::Primary);
                    primary.say(&generation.provider, generation.text)?;
                    primary.set_activity(Activity::Idle, None)?;
                    return Ok(());
                }
                Err(e) => {
                    let details = json!({ "subtask": subtask, "error": e.to_string() });
                    self.stall(
                        subtask,
                        Some(format!("backend failure on '{}': {}", subtask, e)),
                        details,
                        true,
                    )
                    .await?;
                }
            }
        }
    }

    /// Calls the acting handle for `kind`, handing the role to its monitor
    /// when the call fails or its status goes stale and a monitor is
    /// available.
    async fn call(
        &mut self,
        kind: RoleKind,
        prompt: &str,
    ) -> Step<std::result::Result<Generation, InferenceError>> {
        let handle = self.roles.acting(kind).clone();
        let watched = self.roles.can_take_over(kind);
        let result = if self.hangs.remove(&kind) {
            handle.log(LogLevel::Warning, "no response from backend")?;
            Err(InferenceError::Timeout {
                provider: handle.backend_name(),
                secs: self.config.backend_timeout.as_secs(),
            })
        } else if watched {
            match tokio::time::timeout(self.config.monitor_timeout, handle.ask(prompt)).await {
                Ok(result) => result,
                Err(_) => {
                    handle.log(LogLevel::Warning, "no status update during backend call")?;
                    let reason = self.stale_reason();
                    return self.hand_over(kind, &reason, prompt).await;
                }
            }
        } else {
            handle.ask(prompt).await
        };

        let err = match result {
            Ok(generation) => return Ok(Ok(generation)),
            Err(e) => e,
        };
        handle.log(LogLevel::Error, format!("backend call failed: {}", err))?;

        if !watched {
            return Ok(Err(err));
        }
        self.hand_over(kind, &format!("{} unresponsive: {}", kind, err), prompt)
            .await
    }

    /// Takes over `kind` and retries `prompt` on the monitor.
    async fn hand_over(
        &mut self,
        kind: RoleKind,
        reason: &str,
        prompt: &str,
    ) -> Step<std::result::Result<Generation, InferenceError>> {
        self.take_over(kind, reason)?;

        let monitor = self.roles.acting(kind).clone();
        let retried = monitor.ask(prompt).await;
        if let Err(e) = &retried {
            monitor.log(LogLevel::Error, format!("backend call failed: {}", e))?;
        }
        Ok(retried)
    }

    fn stale_reason(&self) -> String {
        format!(
            "no status update within {}s",
            self.config.monitor_timeout.as_secs_f64()
        )
    }

    /// Hands `kind` to its monitor for the rest of the run.
    fn take_over(&mut self, kind: RoleKind, reason: &str) -> Step<()> {
        if !self.roles.promote(kind) {
            return Ok(());
        }
        let monitor = self.roles.acting(kind).clone();
        warn!(team_id = %self.team.id, role = %kind, reason, "Monitor takeover");

        monitor.decide(None, format!("monitor takeover of {}", kind), reason)?;
        monitor.set_activity(Activity::Substituting, None)?;
        self.roles
            .main(kind)
            .set_activity(Activity::Standby, None)?;
        monitor.log(LogLevel::Warning, format!("took over {}: {}", kind, reason))?;
        Ok(())
    }

    /// Takes over any busy main role whose status went stale.
    fn supervise(&mut self) -> Step<()> {
        if !self.roles.is_dual() {
            return Ok(());
        }
        let now = Utc::now();
        for kind in RoleKind::ALL {
            if self.roles.is_promoted(kind) {
                continue;
            }
            let Some(status) = self.state.status(RoleId::main(kind))? else {
                continue;
            };
            if status.activity != Activity::Busy {
                continue;
            }
            let stale = (now - status.updated_at)
                .to_std()
                .map(|age| age > self.config.monitor_timeout)
                .unwrap_or(false);
            if stale {
                let reason = self.stale_reason();
                self.take_over(kind, &reason)?;
            }
        }
        Ok(())
    }

    /// Records the stall and escalates until someone unblocks the primary.
    async fn stall(
        &mut self,
        subtask: &str,
        bug: Option<String>,
        details: serde_json::Value,
        assistant_can_fix: bool,
    ) -> Step<()> {
        let primary = self.roles.acting(RoleKind::Primary).clone();
        if let Some(description) = bug {
            primary.report_bug(description, details)?;
        }
        primary.log(LogLevel::Warning, format!("stuck on {}", subtask))?;
        self.transition(
            CoordinatorEvent::Stall,
            primary.role(),
            &format!("stuck on {}", subtask),
        )?;

        let mut escalations = 0;
        loop {
            if escalations >= self.config.max_escalations {
                let reason = format!(
                    "stuck on '{}' after {} escalation attempts",
                    subtask, escalations
                );
                return Err(self.fail(reason));
            }
            escalations += 1;

            let resolved = if escalations == 1 {
                self.assist(subtask, assistant_can_fix).await?
            } else {
                self.cure(subtask).await?
            };
            if resolved {
                self.transition(
                    CoordinatorEvent::Recover,
                    primary.role(),
                    &format!("unblocked on {}", subtask),
                )?;
                return Ok(());
            }
        }
    }

    /// First escalation: the assistant fixes the latest unresolved bug.
    async fn assist(&mut self, subtask: &str, can_fix: bool) -> Step<bool> {
        let assistant = self.roles.acting(RoleKind::Assistant).clone();
        assistant.set_activity(Activity::Busy, Some(subtask))?;
        let logs = assistant.read_logs(self.config.log_window)?;

        let Some((index, bug)) = self.state.latest_unresolved_bug()? else {
            assistant.say(COORDINATOR, "no bug on record, escalating to arbitrator")?;
            assistant.set_activity(Activity::Idle, None)?;
            return Ok(false);
        };
        if !can_fix {
            assistant.say(
                COORDINATOR,
                format!("cannot fix bug #{}, escalating to arbitrator", index),
            )?;
            assistant.set_activity(Activity::Idle, None)?;
            return Ok(false);
        }

        let prompt = format!(
            "Bug #{} on '{}': {}\nRecent activity lines: {}\nPropose a fix.",
            index,
            subtask,
            bug.description,
            logs.len()
        );
        let fixed = match self.call(RoleKind::Assistant, &prompt).await? {
            Ok(generation) => {
                self.roles
                    .acting(RoleKind::Assistant)
                    .solve(index, attributed(&generation))?;
                true
            }
            Err(e) => {
                debug!(error = %e, "Assistant could not propose a fix");
                false
            }
        };
        self.roles
            .acting(RoleKind::Assistant)
            .set_activity(Activity::Idle, None)?;
        Ok(fixed)
    }

    /// Later escalations: the arbitrator diagnoses the workspace and issues
    /// a cure decision.
    async fn cure(&mut self, subtask: &str) -> Step<bool> {
        let arbitrator = self.roles.acting(RoleKind::Arbitrator).clone();
        arbitrator.set_activity(Activity::Busy, Some(subtask))?;
        let logs = arbitrator.read_logs(self.config.log_window)?;
        let health = self.state.diagnose()?;
        let bug = self.state.latest_unresolved_bug()?;

        let prompt = format!(
            "Team stuck on '{}'. Health: {} ({} errors, {} warnings). Open bug: {}. Recent activity lines: {}.\nPrescribe a cure.",
            subtask,
            health.health,
            health.errors,
            health.warnings,
            bug.as_ref().map(|(_, b)| b.description.as_str()).unwrap_or("none"),
            logs.len()
        );
        let cured = match self.call(RoleKind::Arbitrator, &prompt).await? {
            Ok(generation) => {
                let arbitrator = self.roles.acting(RoleKind::Arbitrator).clone();
                let cure = attributed(&generation);
                arbitrator.decide(Some(subtask), format!("cure: unblock {}", subtask), cure.as_str())?;
                if let Some((index, _)) = bug {
                    arbitrator.solve(index, format!("cure: {}", cure))?;
                }
                true
            }
            Err(e) => {
                debug!(error = %e, "Arbitrator could not prescribe a cure");
                false
            }
        };
        self.roles
            .acting(RoleKind::Arbitrator)
            .set_activity(Activity::Idle, None)?;
        Ok(cured)
    }

    async fn dispute(&mut self, subtask: &str, primary: &str, assistant: &str) -> Step<()> {
        if primary.trim().is_empty() || assistant.trim().is_empty() {
            self.transition(
                CoordinatorEvent::Dispute,
                RoleId::ARBITRATOR,
                &format!("dispute on {}", subtask),
            )?;
            return Err(self.fail(format!("malformed dispute on '{}': empty position", subtask)));
        }

        self.roles
            .acting(RoleKind::Primary)
            .decide(Some(subtask), primary, "primary position")?;
        self.roles
            .acting(RoleKind::Assistant)
            .decide(Some(subtask), assistant, "assistant position")?;

        let Some((primary, assistant)) = self.open_dispute(subtask)? else {
            debug!(subtask, "Positions agree, no dispute");
            return Ok(());
        };

        self.transition(
            CoordinatorEvent::Dispute,
            RoleId::ARBITRATOR,
            &format!("dispute on {}", subtask),
        )?;

        let prompt = format!(
            "Dispute on '{}'.\nprimary: {}\nassistant: {}\nIssue a binding ruling.",
            subtask, primary, assistant
        );
        match self.call(RoleKind::Arbitrator, &prompt).await? {
            Ok(generation) => {
                self.roles.acting(RoleKind::Arbitrator).rule(
                    Some(subtask),
                    format!(
                        "proceed with '{}' and keep '{}' as a safeguard",
                        primary, assistant
                    ),
                    attributed(&generation),
                )?;
            }
            Err(e) => {
                return Err(self.fail(format!(
                    "arbitrator unavailable during dispute on '{}': {}",
                    subtask, e
                )));
            }
        }

        self.transition(
            CoordinatorEvent::Settle,
            RoleId::ARBITRATOR,
            &format!("ruling on {}", subtask),
        )?;
        Ok(())
    }

    /// Latest conflicting positions on `subtask` since the last ruling.
    fn open_dispute(&self, subtask: &str) -> Step<Option<(String, String)>> {
        let decisions = self.state.decisions()?;
        let relevant: Vec<_> = decisions
            .iter()
            .filter(|d| d.subtask.as_deref() == Some(subtask))
            .collect();
        let since = relevant
            .iter()
            .rposition(|d| d.binding)
            .map(|i| i + 1)
            .unwrap_or(0);

        let latest = |kind: RoleKind| {
            relevant[since..]
                .iter()
                .rev()
                .find(|d| d.role.kind == kind)
                .map(|d| d.decision.clone())
        };
        Ok(match (latest(RoleKind::Primary), latest(RoleKind::Assistant)) {
            (Some(p), Some(a)) if p != a => Some((p, a)),
            _ => None,
        })
    }

    /// The assistant substitutes for a fatigued primary on one subtask.
    /// Returns whether the substitute finished the subtask.
    async fn rotate(&mut self, task: &Task, subtask: &str) -> Step<bool> {
        let primary = self.roles.acting(RoleKind::Primary).clone();
        let assistant = self.roles.acting(RoleKind::Assistant).clone();

        self.transition(
            CoordinatorEvent::Fatigue,
            primary.role(),
            &format!("primary rests during {}", subtask),
        )?;
        primary.set_activity(Activity::Resting, Some(subtask))?;
        assistant.set_activity(Activity::Substituting, Some(subtask))?;
        assistant.decide(
            None,
            format!("substitute for primary on {}", subtask),
            "primary fatigued",
        )?;

        let prompt = format!("Task: {}\nSubtask: {}", task.description, subtask);
        let done = match self.call(RoleKind::Assistant, &prompt).await? {
            Ok(generation) => {
                self.roles
                    .acting(RoleKind::Assistant)
                    .say(&generation.provider, generation.text)?;
                true
            }
            Err(e) => {
                debug!(error = %e, "Substitute could not finish the subtask");
                false
            }
        };

        self.transition(
            CoordinatorEvent::Return,
            primary.role(),
            &format!("primary resumes after {}", subtask),
        )?;
        self.roles
            .acting(RoleKind::Assistant)
            .set_activity(Activity::Idle, None)?;
        primary.set_activity(Activity::Idle, None)?;
        primary.say(COORDINATOR, "primary resumed, assistant steps back")?;
        Ok(done)
    }

    fn transition(&mut self, event: CoordinatorEvent, role: RoleId, note: &str) -> Step<()> {
        self.check_cancel()?;
        let from = self.machine.state();
        let to = self.machine.transition(event)?;
        self.state
            .add_conversation(role, COORDINATOR, format!("{} -> {} ({})", from, to, note))?;
        info!(team_id = %self.team.id, from = %from, to = %to, "{}", note);
        Ok(())
    }

    fn check_cancel(&mut self) -> Step<()> {
        if !self.cancel.load(Ordering::SeqCst) {
            return Ok(());
        }
        if self.machine.can_transition(CoordinatorEvent::Cancel) {
            let from = self.machine.state();
            let to = self.machine.transition(CoordinatorEvent::Cancel)?;
            self.state.add_conversation(
                RoleId::PRIMARY,
                COORDINATOR,
                format!("{} -> {} (cancellation requested)", from, to),
            )?;
            info!(team_id = %self.team.id, from = %from, "Run cancelled");
        }
        Err(Stop::Cancelled)
    }

    fn fail(&mut self, reason: String) -> Stop {
        self.record_failure(&reason);
        Stop::Failed(reason)
    }

    /// Moves to `Failed` and records why.
    fn record_failure(&mut self, reason: &str) {
        if self.machine.can_transition(CoordinatorEvent::Fail) {
            let from = self.machine.state();
            if self.machine.transition(CoordinatorEvent::Fail).is_ok() {
                if let Err(e) = self.state.add_conversation(
                    RoleId::PRIMARY,
                    COORDINATOR,
                    format!("{} -> {} ({})", from, CoordinatorState::Failed, reason),
                ) {
                    warn!(error = %e, "Could not record failure transition");
                }
            }
        }
        if let Err(e) = self.state.log(COORDINATOR, LogLevel::Error, reason) {
            warn!(error = %e, "Could not log failure");
        }
        error!(team_id = %self.team.id, reason, "Run failed");
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("team", &self.team.id)
            .field("workspace", &self.team.workspace)
            .field("state", &self.machine.state())
            .field("backends", &self.backends)
            .finish()
    }
}

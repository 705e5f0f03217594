//! Role handles.
//!
//! Every role acts on shared memory through a [`RoleHandle`]. The handle
//! carries the role's capabilities and refuses what they do not allow, so
//! the primary cannot read the activity log and only the primary writes
//! user context.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::warn;
use triad_inference::{Generation, GenerationBackend, InferenceError};
use triad_memory::{MemoryError, SharedState};
use triad_models::{
    Activity, ActivityLine, Capabilities, LogLevel, RoleId, RoleKind, RoleStatus,
};

use crate::error::{OrchestratorError, Result};

/// One role bound to a workspace and a backend.
#[derive(Clone)]
pub struct RoleHandle {
    role: RoleId,
    capabilities: Capabilities,
    state: Arc<SharedState>,
    backend: Arc<dyn GenerationBackend>,
    timeout: Duration,
}

impl RoleHandle {
    pub fn new(
        role: RoleId,
        state: Arc<SharedState>,
        backend: Arc<dyn GenerationBackend>,
        timeout: Duration,
    ) -> Self {
        Self {
            role,
            capabilities: role.capabilities(),
            state,
            backend,
            timeout,
        }
    }

    pub fn role(&self) -> RoleId {
        self.role
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// Grants a monitor the capabilities of the role it takes over.
    pub fn promote(&mut self) {
        self.capabilities = self.role.kind.capabilities();
    }

    pub fn backend_name(&self) -> String {
        self.backend.name()
    }

    /// Calls the backend, bounded by the role's timeout.
    ///
    /// A timeout is reported as [`InferenceError::Timeout`].
    pub async fn ask(&self, prompt: &str) -> std::result::Result<Generation, InferenceError> {
        let system = format!("You are the {} of a three-role team.", self.role.kind);
        match tokio::time::timeout(self.timeout, self.backend.generate(prompt, Some(&system))).await
        {
            Ok(result) => result,
            Err(_) => {
                warn!(role = %self.role, provider = %self.backend.name(), "Backend call timed out");
                Err(InferenceError::Timeout {
                    provider: self.backend.name(),
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }

    /// Writes user context.
    ///
    /// # Errors
    /// [`MemoryError::ContextWriteDenied`] for roles without context
    /// ownership. This is treated as state corruption.
    pub fn write_context(&self, key: &str, content: impl Into<String>) -> Result<()> {
        if !self.capabilities.can_write_context {
            return Err(MemoryError::ContextWriteDenied {
                role: self.role.label(),
            }
            .into());
        }
        self.state.put_context(key, content)?;
        Ok(())
    }

    /// Reads the last `lines` activity log lines.
    pub fn read_logs(&self, lines: usize) -> Result<Vec<ActivityLine>> {
        if !self.capabilities.can_read_logs {
            return Err(OrchestratorError::AccessDenied {
                role: self.role.label(),
                action: "read logs",
            });
        }
        Ok(self.state.read_logs(lines)?)
    }

    pub fn say(&self, speaker: &str, message: impl Into<String>) -> Result<u64> {
        Ok(self.state.add_conversation(self.role, speaker, message)?)
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) -> Result<()> {
        Ok(self.state.log(&self.role.label(), level, message)?)
    }

    pub fn decide(
        &self,
        subtask: Option<&str>,
        decision: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Result<usize> {
        Ok(self.state.add_decision(self.role, subtask, decision, rationale)?)
    }

    /// Appends a binding decision.
    pub fn rule(
        &self,
        subtask: Option<&str>,
        decision: impl Into<String>,
        rationale: impl Into<String>,
    ) -> Result<usize> {
        if !self.capabilities.can_arbitrate {
            return Err(OrchestratorError::AccessDenied {
                role: self.role.label(),
                action: "arbitrate",
            });
        }
        Ok(self
            .state
            .add_binding_decision(self.role, subtask, decision, rationale)?)
    }

    pub fn report_bug(&self, description: impl Into<String>, details: Value) -> Result<usize> {
        Ok(self.state.add_bug(self.role, description, details)?)
    }

    pub fn solve(&self, bug_index: usize, solution: impl Into<String>) -> Result<usize> {
        Ok(self.state.add_solution(self.role, bug_index, solution)?)
    }

    pub fn set_activity(&self, activity: Activity, current: Option<&str>) -> Result<()> {
        self.state.set_status(RoleStatus::new(
            self.role,
            activity,
            current.map(str::to_string),
        ))?;
        Ok(())
    }
}

impl std::fmt::Debug for RoleHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoleHandle")
            .field("role", &self.role)
            .field("capabilities", &self.capabilities)
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// The roles of one team plus, in dual-layer mode, their monitors.
///
/// [`TeamRoles::acting`] returns whichever handle currently acts for a
/// role kind: the main role, or its monitor after a takeover.
#[derive(Debug, Clone)]
pub(crate) struct TeamRoles {
    main: [RoleHandle; 3],
    monitors: Option<[RoleHandle; 3]>,
    promoted: HashSet<RoleKind>,
}

fn slot(kind: RoleKind) -> usize {
    match kind {
        RoleKind::Primary => 0,
        RoleKind::Assistant => 1,
        RoleKind::Arbitrator => 2,
    }
}

impl TeamRoles {
    pub(crate) fn new(
        state: &Arc<SharedState>,
        main_backend: &Arc<dyn GenerationBackend>,
        monitor_backend: Option<&Arc<dyn GenerationBackend>>,
        timeout: Duration,
    ) -> Self {
        let build = |layer: fn(RoleKind) -> RoleId, backend: &Arc<dyn GenerationBackend>| {
            RoleKind::ALL.map(|kind| {
                RoleHandle::new(layer(kind), Arc::clone(state), Arc::clone(backend), timeout)
            })
        };
        Self {
            main: build(RoleId::main, main_backend),
            monitors: monitor_backend.map(|backend| build(RoleId::monitor, backend)),
            promoted: HashSet::new(),
        }
    }

    pub(crate) fn is_dual(&self) -> bool {
        self.monitors.is_some()
    }

    pub(crate) fn main(&self, kind: RoleKind) -> &RoleHandle {
        &self.main[slot(kind)]
    }

    pub(crate) fn acting(&self, kind: RoleKind) -> &RoleHandle {
        match &self.monitors {
            Some(monitors) if self.promoted.contains(&kind) => &monitors[slot(kind)],
            _ => &self.main[slot(kind)],
        }
    }

    pub(crate) fn is_promoted(&self, kind: RoleKind) -> bool {
        self.promoted.contains(&kind)
    }

    pub(crate) fn can_take_over(&self, kind: RoleKind) -> bool {
        self.monitors.is_some() && !self.promoted.contains(&kind)
    }

    /// Hands `kind` to its monitor. Returns `false` without monitors.
    pub(crate) fn promote(&mut self, kind: RoleKind) -> bool {
        match &mut self.monitors {
            Some(monitors) => {
                monitors[slot(kind)].promote();
                self.promoted.insert(kind);
                true
            }
            None => false,
        }
    }

    pub(crate) fn promoted(&self) -> Vec<RoleKind> {
        RoleKind::ALL
            .into_iter()
            .filter(|kind| self.promoted.contains(kind))
            .collect()
    }

    pub(crate) fn monitors(&self) -> impl Iterator<Item = &RoleHandle> {
        self.monitors.iter().flatten()
    }

    pub(crate) fn mains(&self) -> impl Iterator<Item = &RoleHandle> {
        self.main.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triad_inference::MockBackend;
    use triad_models::{WorkspaceId, USER_INPUT};

    fn handle(role: RoleId, backend: MockBackend) -> RoleHandle {
        let state = Arc::new(SharedState::new(WorkspaceId::new("roles")));
        RoleHandle::new(role, state, Arc::new(backend), Duration::from_millis(50))
    }

    #[test]
    fn test_only_primary_writes_context() {
        let primary = handle(RoleId::PRIMARY, MockBackend::echo("m"));
        primary.write_context(USER_INPUT, "hello").unwrap();

        let assistant = RoleHandle::new(
            RoleId::ASSISTANT,
            primary.state.clone(),
            Arc::new(MockBackend::echo("m")),
            Duration::from_secs(1),
        );
        let err = assistant.write_context(USER_INPUT, "sneaky").unwrap_err();
        assert!(matches!(
            err,
            OrchestratorError::Memory(MemoryError::ContextWriteDenied { .. })
        ));
        assert_eq!(primary.state.context().unwrap()[USER_INPUT].len(), 1);
    }

    #[test]
    fn test_primary_cannot_read_logs() {
        let primary = handle(RoleId::PRIMARY, MockBackend::echo("m"));
        assert!(matches!(
            primary.read_logs(10),
            Err(OrchestratorError::AccessDenied { .. })
        ));

        let assistant = handle(RoleId::ASSISTANT, MockBackend::echo("m"));
        assistant.log(LogLevel::Info, "looking").unwrap();
        assert_eq!(assistant.read_logs(10).unwrap().len(), 1);
    }

    #[test]
    fn test_only_arbitrator_rules() {
        let assistant = handle(RoleId::ASSISTANT, MockBackend::echo("m"));
        assert!(assistant.rule(None, "x", "y").is_err());

        let arbitrator = handle(RoleId::ARBITRATOR, MockBackend::echo("m"));
        arbitrator.rule(Some("s"), "go", "because").unwrap();
        assert!(arbitrator.state.decisions().unwrap()[0].binding);
    }

    #[test]
    fn test_promoted_monitor_gains_role_capabilities() {
        let mut monitor = handle(RoleId::monitor(RoleKind::Primary), MockBackend::echo("m"));
        assert!(monitor.write_context(USER_INPUT, "no").is_err());
        monitor.promote();
        monitor.write_context(USER_INPUT, "yes").unwrap();
    }

    #[tokio::test]
    async fn test_ask_times_out() {
        let slow = handle(
            RoleId::PRIMARY,
            MockBackend::slow("slow", Duration::from_secs(5)),
        );
        let err = slow.ask("hi").await.unwrap_err();
        assert!(matches!(err, InferenceError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_ask_returns_provider_label() {
        let primary = handle(RoleId::PRIMARY, MockBackend::echo("local"));
        let generation = primary.ask("ping").await.unwrap();
        assert_eq!(generation.text, "ping");
        assert_eq!(generation.provider, "local");
    }

    #[test]
    fn test_team_roles_takeover() {
        let state = Arc::new(SharedState::new(WorkspaceId::new("team")));
        let main: Arc<dyn GenerationBackend> = Arc::new(MockBackend::echo("main"));
        let monitor: Arc<dyn GenerationBackend> = Arc::new(MockBackend::echo("shadow"));
        let mut roles = TeamRoles::new(&state, &main, Some(&monitor), Duration::from_secs(1));

        assert_eq!(roles.acting(RoleKind::Primary).role(), RoleId::PRIMARY);
        assert!(roles.can_take_over(RoleKind::Primary));

        assert!(roles.promote(RoleKind::Primary));
        let acting = roles.acting(RoleKind::Primary);
        assert_eq!(acting.role(), RoleId::monitor(RoleKind::Primary));
        assert_eq!(acting.backend_name(), "shadow");
        assert!(acting.capabilities().can_write_context);
        assert!(!roles.can_take_over(RoleKind::Primary));
        assert_eq!(roles.promoted(), vec![RoleKind::Primary]);
    }

    #[test]
    fn test_single_layer_has_no_monitors() {
        let state = Arc::new(SharedState::new(WorkspaceId::new("team")));
        let main: Arc<dyn GenerationBackend> = Arc::new(MockBackend::echo("main"));
        let mut roles = TeamRoles::new(&state, &main, None, Duration::from_secs(1));

        assert!(!roles.is_dual());
        assert!(!roles.promote(RoleKind::Arbitrator));
        assert_eq!(roles.acting(RoleKind::Arbitrator).role(), RoleId::ARBITRATOR);
        assert_eq!(roles.monitors().count(), 0);
    }
}

//! Coordinator configuration.

use std::time::Duration;

use triad_core::Settings;
use triad_spawner::SpawnerConfig;

/// Configuration for a [`Coordinator`](crate::Coordinator).
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Timeout of one backend call. Exceeding it stalls the role.
    pub backend_timeout: Duration,
    /// Age after which a busy role's status counts as stale (dual-layer).
    pub monitor_timeout: Duration,
    /// Escalation attempts per stall before the task fails.
    pub max_escalations: u32,
    /// Activity log lines a role reads when diagnosing.
    pub log_window: usize,
    /// Run monitors next to every role.
    pub dual_layer: bool,
    /// Run alone instead of failing when the spawn cap is hit.
    pub degrade_on_spawn_limit: bool,
    /// Tear spawned teams down once they finish.
    pub teardown_on_completion: bool,
    pub spawner: SpawnerConfig,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            backend_timeout: Duration::from_secs(60),
            monitor_timeout: Duration::from_secs(300),
            max_escalations: 2,
            log_window: 100,
            dual_layer: false,
            degrade_on_spawn_limit: false,
            teardown_on_completion: true,
            spawner: SpawnerConfig::default(),
        }
    }
}

impl CoordinatorConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Config from resolved [`Settings`].
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            backend_timeout: settings.backend_timeout,
            monitor_timeout: settings.monitor_timeout,
            max_escalations: settings.max_escalations,
            log_window: settings.log_window,
            spawner: SpawnerConfig::new().with_max_teams(settings.max_teams),
            ..Self::default()
        }
    }

    pub fn with_backend_timeout(mut self, timeout: Duration) -> Self {
        self.backend_timeout = timeout;
        self
    }

    pub fn with_monitor_timeout(mut self, timeout: Duration) -> Self {
        self.monitor_timeout = timeout;
        self
    }

    pub fn with_max_escalations(mut self, max: u32) -> Self {
        self.max_escalations = max;
        self
    }

    /// Enables six-role mode. Spawned teams inherit it.
    pub fn with_dual_layer(mut self, dual_layer: bool) -> Self {
        self.dual_layer = dual_layer;
        self.spawner = self.spawner.with_dual_layer(dual_layer);
        self
    }

    pub fn with_degraded_mode(mut self, degrade: bool) -> Self {
        self.degrade_on_spawn_limit = degrade;
        self
    }

    pub fn with_teardown_on_completion(mut self, teardown: bool) -> Self {
        self.teardown_on_completion = teardown;
        self
    }

    /// Sets the spawn cap.
    pub fn with_max_teams(mut self, max: usize) -> Self {
        self.spawner = self.spawner.with_max_teams(max);
        self
    }

    /// Lets spawned teams spawn teams of their own, within the same cap.
    pub fn with_recursion(mut self, allow: bool) -> Self {
        self.spawner = self.spawner.with_recursion(allow);
        self
    }
}

//! Spawner configuration.

/// Configuration for a [`TeamSpawner`](crate::TeamSpawner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnerConfig {
    /// Maximum concurrently active spawned teams.
    pub max_teams: usize,
    /// Whether spawned teams may spawn teams of their own.
    pub allow_recursive: bool,
    /// Whether spawned teams run with monitors.
    pub dual_layer: bool,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            max_teams: 10,
            allow_recursive: false,
            dual_layer: false,
        }
    }
}

impl SpawnerConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum number of active teams.
    pub fn with_max_teams(mut self, max: usize) -> Self {
        self.max_teams = max;
        self
    }

    pub fn with_recursion(mut self, allow: bool) -> Self {
        self.allow_recursive = allow;
        self
    }

    pub fn with_dual_layer(mut self, dual_layer: bool) -> Self {
        self.dual_layer = dual_layer;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SpawnerConfig::default();
        assert_eq!(config.max_teams, 10);
        assert!(!config.allow_recursive);
        assert!(!config.dual_layer);
    }

    #[test]
    fn test_config_builder() {
        let config = SpawnerConfig::new()
            .with_max_teams(3)
            .with_recursion(true)
            .with_dual_layer(true);
        assert_eq!(config.max_teams, 3);
        assert!(config.allow_recursive);
        assert!(config.dual_layer);
    }
}

//! Complexity-driven team spawning.
//!
//! A task's complexity score decides how many extra teams work on it:
//!
//! | score | extra teams |
//! |-------|-------------|
//! | 0-3   | 0           |
//! | 4-7   | 1           |
//! | 8-12  | 2           |
//! | 13+   | 3           |
//!
//! [`TeamSpawner`] creates those teams, each with its own workspace and a
//! round-robin slice of the subtasks, and keeps them in a registry bounded
//! by [`SpawnerConfig::max_teams`].

pub mod config;
pub mod error;
pub mod partition;
pub mod score;
pub mod spawner;

pub use config::SpawnerConfig;
pub use error::{Result, SpawnError};
pub use partition::partition;
pub use score::{assess, breakdown, score, teams_for_score, ComplexityBreakdown};
pub use spawner::{SpawnedTeam, TeamSpawner};

//! Runtime tunables.

use std::time::Duration;

use tracing::debug;

use crate::error::{ConfigError, Result};

pub const MAX_TEAMS_ENV: &str = "TRIAD_MAX_TEAMS";
pub const BACKEND_TIMEOUT_ENV: &str = "TRIAD_BACKEND_TIMEOUT_SECS";
pub const MONITOR_TIMEOUT_ENV: &str = "TRIAD_MONITOR_TIMEOUT_SECS";
pub const MAX_ESCALATIONS_ENV: &str = "TRIAD_MAX_ESCALATIONS";
pub const LOG_WINDOW_ENV: &str = "TRIAD_LOG_WINDOW";

/// Settings for spawning and coordination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Maximum number of concurrently active spawned teams.
    pub max_teams: usize,
    /// Timeout for a single backend call.
    pub backend_timeout: Duration,
    /// How long a role may go without a status update before its monitor
    /// takes over (dual-layer mode).
    pub monitor_timeout: Duration,
    /// Escalation attempts allowed while stuck before failing.
    pub max_escalations: u32,
    /// Activity log lines returned by a default log read.
    pub log_window: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_teams: 10,
            backend_timeout: Duration::from_secs(60),
            monitor_timeout: Duration::from_secs(300),
            max_escalations: 2,
            log_window: 100,
        }
    }
}

impl Settings {
    /// Builds settings from `TRIAD_*` environment variables, falling back to
    /// defaults for unset ones.
    ///
    /// # Errors
    /// [`ConfigError::InvalidValue`] if a set variable does not parse.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Builds settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let settings = Self {
            max_teams: parse_var(&lookup, MAX_TEAMS_ENV)?.unwrap_or(defaults.max_teams),
            backend_timeout: parse_var(&lookup, BACKEND_TIMEOUT_ENV)?
                .map(Duration::from_secs)
                .unwrap_or(defaults.backend_timeout),
            monitor_timeout: parse_var(&lookup, MONITOR_TIMEOUT_ENV)?
                .map(Duration::from_secs)
                .unwrap_or(defaults.monitor_timeout),
            max_escalations: parse_var(&lookup, MAX_ESCALATIONS_ENV)?
                .unwrap_or(defaults.max_escalations),
            log_window: parse_var(&lookup, LOG_WINDOW_ENV)?.unwrap_or(defaults.log_window),
        };
        debug!(?settings, "Resolved settings");
        Ok(settings)
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                var,
                value,
                reason: e.to_string(),
            }),
    }
}

//! Shared configuration for Triad.
//!
//! Provides functions to locate Triad's state directory and the files it
//! holds.
//!
//! # Storage Structure
//!
//! ```text
//! ~/.triad/
//! ├── .env.local    # Secrets and TRIAD_* overrides
//! ├── config/       # inference.json
//! ├── logs/         # Application logs
//! └── workspaces/   # One directory per workspace snapshot
//! ```
//!
//! # Environment Variables
//!
//! - `TRIAD_STATE_DIR`: Override the base state directory
//! - `TRIAD_CONFIG_DIR`: Override the config directory

use std::path::PathBuf;
use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::error::{ConfigError, Result};

/// Environment variable for custom state directory.
pub const STATE_DIR_ENV: &str = "TRIAD_STATE_DIR";

/// Environment variable for custom config directory.
pub const CONFIG_DIR_ENV: &str = "TRIAD_CONFIG_DIR";

const DEFAULT_STATE_DIR: &str = ".triad";

const CONFIG_SUBDIR: &str = "config";
const LOGS_SUBDIR: &str = "logs";
const WORKSPACES_SUBDIR: &str = "workspaces";

static STATE_DIR_CACHE: OnceLock<PathBuf> = OnceLock::new();

/// Get the Triad state directory.
///
/// The state directory is determined by:
/// 1. `TRIAD_STATE_DIR` environment variable if set
/// 2. `~/.triad` if home directory is available
/// 3. `.triad` in current directory as fallback
pub fn state_dir() -> PathBuf {
    STATE_DIR_CACHE
        .get_or_init(|| {
            std::env::var(STATE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    dirs::home_dir()
                        .map(|h| h.join(DEFAULT_STATE_DIR))
                        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATE_DIR))
                })
        })
        .clone()
}

/// Get the config directory.
///
/// Defaults to `~/.triad/config/` or `TRIAD_CONFIG_DIR` env var.
pub fn config_dir() -> PathBuf {
    std::env::var(CONFIG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|_| state_dir().join(CONFIG_SUBDIR))
}

pub fn logs_dir() -> PathBuf {
    state_dir().join(LOGS_SUBDIR)
}

/// Directory holding workspace snapshots.
///
/// A `WorkspaceStore` rooted at [`state_dir`] writes here.
pub fn workspaces_dir() -> PathBuf {
    state_dir().join(WORKSPACES_SUBDIR)
}

/// Get the inference backend config path.
pub fn inference_config_file() -> PathBuf {
    config_dir().join("inference.json")
}

/// Get the .env.local file path.
pub fn env_file() -> PathBuf {
    state_dir().join(".env.local")
}

/// Load `.env.local` from the state directory into the process environment.
///
/// A missing file is not an error. Variables already set are not overridden.
/// Returns `true` if a file was loaded.
pub fn load_env() -> Result<bool> {
    let path = env_file();
    if !path.exists() {
        debug!(path = %path.display(), "No .env.local found");
        return Ok(false);
    }

    dotenvy::from_path(&path).map_err(|e| {
        warn!(path = %path.display(), error = %e, "Failed to load .env.local");
        ConfigError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        }
    })?;
    debug!(path = %path.display(), "Loaded .env.local");
    Ok(true)
}

/// Ensure the state directory and its subdirectories exist.
///
/// # Errors
/// Returns an error if any directory cannot be created.
pub fn ensure_state_dirs() -> std::io::Result<()> {
    std::fs::create_dir_all(config_dir())?;
    std::fs::create_dir_all(logs_dir())?;
    std::fs::create_dir_all(workspaces_dir())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment variables can't be isolated across parallel tests, so
    // these check path construction by name only.

    #[test]
    fn test_state_dir_is_stable() {
        assert_eq!(state_dir(), state_dir());
    }

    #[test]
    fn test_workspaces_dir_name() {
        assert!(workspaces_dir().ends_with("workspaces"));
    }

    #[test]
    fn test_inference_config_file_name() {
        assert!(inference_config_file().ends_with("inference.json"));
    }

    #[test]
    fn test_env_file_name() {
        let file = env_file();
        assert!(file.ends_with(".env.local"));
        assert_eq!(file.parent(), Some(state_dir().as_path()));
    }

    #[test]
    fn test_logs_dir_name() {
        assert!(logs_dir().ends_with("logs"));
    }
}

//! Triad Core - configuration shared by every Triad interface.
//!
//! - **config**: state directory layout and `.env.local` loading
//! - **settings**: tunables read from `TRIAD_*` environment variables

pub mod config;
pub mod error;
pub mod settings;

pub use config::{
    config_dir, ensure_state_dirs, env_file, inference_config_file, load_env, logs_dir,
    state_dir, workspaces_dir,
};
pub use error::{ConfigError, Result};
pub use settings::Settings;

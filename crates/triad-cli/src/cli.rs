//! Command-line interface definition using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Build version string with git hash and build date.
fn version_string() -> &'static str {
    const VERSION: &str = env!("CARGO_PKG_VERSION");
    const GIT_HASH: &str = env!("GIT_HASH");
    const BUILD_DATE: &str = env!("BUILD_DATE");

    // Format: "0.3.0 (abc1234, 2026-01-29)"
    static VERSION_STRING: std::sync::OnceLock<String> = std::sync::OnceLock::new();
    VERSION_STRING.get_or_init(|| format!("{} ({}, {})", VERSION, GIT_HASH, BUILD_DATE))
}

/// Triad - three-role agent teams with dynamic spawning
#[derive(Parser, Debug)]
#[command(name = "triad")]
#[command(author, version = version_string(), about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to state directory
    #[arg(short, long, env = "TRIAD_STATE_DIR", global = true)]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute a task described by a JSON file
    Run {
        /// Path to the task JSON
        #[arg(required = true)]
        task: PathBuf,

        /// Scripted per-subtask events (stuck, dispute, fatigue, hang)
        #[arg(long)]
        scenario: Option<PathBuf>,

        /// Workspace id (random if omitted)
        #[arg(short, long)]
        workspace: Option<String>,

        /// Use the offline echo backend instead of configured providers
        #[arg(long)]
        mock: bool,

        /// Shadow every role with a monitor
        #[arg(long)]
        dual_layer: bool,

        /// Run as a single team when the spawn cap is reached
        #[arg(long)]
        degraded: bool,

        /// Output format (table, json, brief)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show the complexity score of a task
    Score {
        /// Path to the task JSON
        #[arg(required = true)]
        task: PathBuf,
    },

    /// Run the built-in demonstration tasks against a mock backend
    Demo {
        /// Shadow every role with a monitor
        #[arg(long)]
        dual_layer: bool,
    },

    /// Show the recorded state of a workspace
    Status {
        /// Workspace id (lists workspaces if omitted)
        workspace: Option<String>,

        /// Show recent conversation and activity lines
        #[arg(short, long)]
        detailed: bool,
    },

    /// List teams spawned from a workspace
    Teams {
        /// Workspace id
        #[arg(required = true)]
        workspace: String,

        /// Output format (table, json, brief)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Show configured inference providers and their health
    Providers,
}

/// Output format for listing commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Brief,
}

impl Cli {
    /// Returns the state directory path, using default if not specified.
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(triad_core::state_dir)
    }

    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}

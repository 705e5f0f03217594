//! Triad CLI entry point.

use clap::Parser;
use tracing::warn;
use tracing_subscriber::{fmt, EnvFilter};

use triad_cli::cli::Cli;
use triad_cli::commands;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));
    fmt().with_env_filter(filter).with_target(false).init();

    // Provider keys (VLLM_API_KEY etc.) may live in <state>/.env.local
    if let Err(e) = triad_core::load_env() {
        warn!(error = %e, "Ignoring unreadable .env.local");
    }

    let state_dir = cli.state_dir();

    if let Err(e) = commands::execute(cli.command, &state_dir).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

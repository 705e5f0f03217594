//! Command handlers for CLI subcommands.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use triad_core::Settings;
use triad_inference::{create_inference_layer, GenerationBackend, InferenceConfig, MockBackend};
use triad_memory::{SharedMemory, SharedState};
use triad_models::{ExecutionResult, Task, WorkspaceId};
use triad_orchestrator::{Backends, Coordinator, CoordinatorConfig, Scenario};
use triad_persistence::WorkspaceStore;
use triad_spawner::{breakdown, teams_for_score};

use crate::cli::{Commands, OutputFormat};
use crate::demo;

/// Result type for command operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Options for `triad run`.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub scenario: Option<std::path::PathBuf>,
    pub workspace: Option<String>,
    pub mock: bool,
    pub dual_layer: bool,
    pub degraded: bool,
}

/// Execute a CLI command.
pub async fn execute(command: Commands, state_dir: &Path) -> Result<()> {
    let store = WorkspaceStore::new(state_dir);

    match command {
        Commands::Run {
            task,
            scenario,
            workspace,
            mock,
            dual_layer,
            degraded,
            format,
        } => {
            let options = RunOptions {
                scenario,
                workspace,
                mock,
                dual_layer,
                degraded,
            };
            let result = cmd_run(&store, state_dir, &task, options).await?;
            print_result(&result, format)?;
            if !result.is_completed() {
                return Err(format!(
                    "task {}: {}",
                    result.status,
                    result.reason.as_deref().unwrap_or("no reason recorded")
                )
                .into());
            }
            Ok(())
        }
        Commands::Score { task } => cmd_score(&task),
        Commands::Demo { dual_layer } => demo::run(dual_layer).await,
        Commands::Status {
            workspace,
            detailed,
        } => cmd_status(&store, workspace.as_deref(), detailed),
        Commands::Teams { workspace, format } => cmd_teams(&store, &workspace, format),
        Commands::Providers => cmd_providers(state_dir).await,
    }
}

fn load_task(path: &Path) -> Result<Task> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("Cannot read task file {}: {}", path.display(), e))?;
    Ok(Task::from_json(&json)?)
}

fn inference_config(state_dir: &Path) -> Result<InferenceConfig> {
    let path = state_dir.join("config").join("inference.json");
    Ok(InferenceConfig::load_or_default(&path)?)
}

/// Runs a task file and returns the result. The workspace is flushed to
/// `store` when the run ends.
pub async fn cmd_run(
    store: &WorkspaceStore,
    state_dir: &Path,
    task_path: &Path,
    options: RunOptions,
) -> Result<ExecutionResult> {
    let task = load_task(task_path)?;
    let scenario = options
        .scenario
        .as_deref()
        .map(Scenario::load)
        .transpose()?;

    let settings = Settings::from_env()?;
    let config = CoordinatorConfig::from_settings(&settings)
        .with_dual_layer(options.dual_layer)
        .with_degraded_mode(options.degraded);

    let backend: Arc<dyn GenerationBackend> = if options.mock {
        Arc::new(MockBackend::echo("mock"))
    } else {
        Arc::new(create_inference_layer(&inference_config(state_dir)?)?)
    };
    let backends = if options.dual_layer {
        Backends::dual(Arc::clone(&backend), backend)
    } else {
        Backends::single(backend)
    };

    let workspace = options
        .workspace
        .map(WorkspaceId::new)
        .unwrap_or_else(WorkspaceId::random);
    let memory = Arc::new(SharedMemory::with_store(store.clone()));
    let mut coordinator = Coordinator::new(workspace.clone(), memory, backends, config)?;
    if let Some(scenario) = scenario {
        coordinator = coordinator.with_scenario(scenario);
    }

    info!(workspace = %workspace, task = %task.description, "Running task");
    Ok(coordinator.execute_task(task).await?)
}

fn print_result(result: &ExecutionResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            println!("Workspace:  {}", result.workspace);
            println!("Status:     {}", result.status);
            if let Some(reason) = &result.reason {
                println!("Reason:     {}", reason);
            }
            println!(
                "Complexity: {} ({} extra teams)",
                result.complexity,
                result.spawned_teams.len()
            );
            println!("Completed:  {} subtask(s)", result.completed_subtasks.len());
            for subtask in &result.completed_subtasks {
                println!("  - {}", subtask);
            }

            if !result.spawned.is_empty() {
                println!();
                println!("{:<38}  {:<10}  ASSIGNMENT", "TEAM", "STATUS");
                println!("{}", "-".repeat(80));
                for team in &result.spawned {
                    println!(
                        "{:<38}  {:<10}  {}",
                        team.team_id,
                        team.status.to_string(),
                        truncate(&team.assignment.join(", "), 28)
                    );
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?);
        }
        OutputFormat::Brief => {
            println!(
                "{}\t{}\t{}\t{}",
                result.status,
                result.workspace,
                result.complexity,
                result.spawned_teams.len()
            );
        }
    }
    Ok(())
}

fn cmd_score(task_path: &Path) -> Result<()> {
    let task = load_task(task_path)?;
    let parts = breakdown(&task);
    let total = parts.total();

    println!("Task: {}", task.description);
    println!(
        "  Subtasks      {:>6}  (+{})",
        task.subtasks.len(),
        parts.subtasks
    );
    println!(
        "  Duration      {:>5}h  (+{})",
        task.estimated_hours, parts.duration
    );
    println!(
        "  Dependencies  {:>6}  (+{})",
        task.dependencies.len(),
        parts.dependencies
    );
    println!(
        "  Difficulty    {:>6}  (+{})",
        task.difficulty.as_str(),
        parts.difficulty
    );
    println!("  Score         {:>6}", total);
    println!("  Extra teams   {:>6}", teams_for_score(total));
    Ok(())
}

fn cmd_status(store: &WorkspaceStore, workspace: Option<&str>, detailed: bool) -> Result<()> {
    let Some(id) = workspace else {
        let ids = store.list()?;
        if ids.is_empty() {
            println!("No workspaces found.");
            return Ok(());
        }
        for id in &ids {
            println!("{}", id);
        }
        println!("\n{} workspace(s)", ids.len());
        return Ok(());
    };

    let state = load_workspace(store, id)?;
    let snapshot = state.snapshot()?;
    let health = state.diagnose()?;

    println!("Workspace: {}", snapshot.workspace_id);
    println!("  Created:  {}", snapshot.created_at);
    println!("  Health:   {} ({} errors, {} warnings)", health.health, health.errors, health.warnings);
    println!("  Roles:");
    for status in snapshot.statuses.values() {
        println!(
            "    {:<20} {:<13} {}",
            status.role.label(),
            status.activity.to_string(),
            status.current.as_deref().unwrap_or("-")
        );
    }

    let open_bugs = snapshot.bugs.iter().filter(|b| !b.resolved).count();
    println!("  Conversation: {} entries", snapshot.conversation.len());
    println!("  Decisions:    {}", snapshot.decisions.len());
    println!("  Bugs:         {} ({} open)", snapshot.bugs.len(), open_bugs);
    println!("  Solutions:    {}", snapshot.solutions.len());
    println!("  Spawned:      {}", snapshot.spawned.len());

    if detailed {
        println!("\n  Recent conversation:");
        for entry in state.recent_conversation(10)? {
            println!("    [{}] {}: {}", entry.role, entry.speaker, truncate(&entry.message, 60));
        }
        println!("\n  Recent activity:");
        for line in state.read_logs(10)? {
            println!("    {}", line);
        }
    }
    Ok(())
}

fn cmd_teams(store: &WorkspaceStore, workspace: &str, format: OutputFormat) -> Result<()> {
    let state = load_workspace(store, workspace)?;
    let records = state.spawned_records()?;

    match format {
        OutputFormat::Table => {
            if records.is_empty() {
                println!("No teams spawned from {}.", workspace);
                return Ok(());
            }
            println!("{:<38}  {:<10}  {:<10}  TASK", "TEAM", "STATUS", "ROLE");
            println!("{}", "-".repeat(80));
            for record in &records {
                println!(
                    "{:<38}  {:<10}  {:<10}  {}",
                    record.team_id,
                    record.status,
                    record.parent_role.to_string(),
                    truncate(&record.task, 20)
                );
            }
            println!("\n{} team(s)", records.len());
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        OutputFormat::Brief => {
            for record in &records {
                println!("{}\t{}", record.team_id, record.status);
            }
        }
    }
    Ok(())
}

async fn cmd_providers(state_dir: &Path) -> Result<()> {
    let config = inference_config(state_dir)?;
    let layer = create_inference_layer(&config)?;
    let status = layer.status().await;

    println!("Inference providers:");
    let rows = std::iter::once(("primary", &status.primary))
        .chain(status.backups.iter().map(|s| ("backup", s)));
    for (slot, provider) in rows {
        println!(
            "  {:<8} {:<32} {:<12} failures: {}",
            slot,
            provider.name,
            if provider.available { "available" } else { "unavailable" },
            provider.failures
        );
    }
    Ok(())
}

fn load_workspace(store: &WorkspaceStore, id: &str) -> Result<SharedState> {
    let id = WorkspaceId::new(id);
    if !store.exists(&id) {
        return Err(format!("Workspace not found: {}", id).into());
    }
    Ok(SharedState::from_snapshot(store.load(&id)?))
}

/// Truncates a string to the given length, adding "..." if truncated.
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

//! Built-in demonstration runs.
//!
//! Each case runs offline against an echo backend in its own in-memory
//! workspace, so `triad demo` needs no providers and writes nothing.

use std::sync::Arc;

use triad_inference::MockBackend;
use triad_memory::SharedMemory;
use triad_models::{Difficulty, ExecutionResult, Task, WorkspaceId};
use triad_orchestrator::{Backends, Coordinator, CoordinatorConfig, Scenario, Signal};
use triad_spawner::{score, teams_for_score};

use crate::commands::Result;

/// One demonstration task and the events scripted for it.
pub struct DemoCase {
    pub name: &'static str,
    pub task: Task,
    pub scenario: Scenario,
}

/// The demonstration tasks: a simple fix, a stall, a dispute, a rotation
/// and a task complex enough to spawn teams.
pub fn cases() -> Vec<DemoCase> {
    vec![
        DemoCase {
            name: "simple",
            task: Task::new("Fix typo in README")
                .with_subtasks(["Find typo", "Fix typo"])
                .with_hours(0.5)
                .with_difficulty(Difficulty::Low),
            scenario: Scenario::new(),
        },
        DemoCase {
            name: "stuck",
            task: Task::new("Debug flaky login test")
                .with_subtasks(["Reproduce failure", "Fix race"])
                .with_hours(3.0)
                .with_difficulty(Difficulty::Medium),
            scenario: Scenario::new().on(
                "Fix race",
                Signal::Stuck {
                    bug: Some("session token reused across requests".to_string()),
                    assistant_can_fix: true,
                },
            ),
        },
        DemoCase {
            name: "dispute",
            task: Task::new("Choose storage engine")
                .with_subtasks(["Pick database", "Write migration"])
                .with_hours(2.0)
                .with_difficulty(Difficulty::Medium),
            scenario: Scenario::new().on(
                "Pick database",
                Signal::Dispute {
                    primary: "PostgreSQL with JSONB columns".to_string(),
                    assistant: "MongoDB for flexible documents".to_string(),
                },
            ),
        },
        DemoCase {
            name: "rotation",
            task: Task::new("Refactor billing module")
                .with_subtasks(["Extract invoices", "Extract payments"])
                .with_hours(4.0)
                .with_difficulty(Difficulty::Low),
            scenario: Scenario::new().on("Extract payments", Signal::Fatigue),
        },
        DemoCase {
            name: "complex",
            task: Task::new("Build e-commerce platform")
                .with_subtasks([
                    "Catalog",
                    "Cart",
                    "Checkout",
                    "Payments",
                    "Accounts",
                    "Admin panel",
                ])
                .with_hours(24.0)
                .with_dependencies(["payment gateway", "inventory api", "auth"])
                .with_difficulty(Difficulty::High),
            scenario: Scenario::new(),
        },
    ]
}

/// Runs one case in a fresh in-memory workspace.
pub async fn run_case(case: DemoCase, dual_layer: bool) -> Result<ExecutionResult> {
    let backends = if dual_layer {
        Backends::dual(
            Arc::new(MockBackend::echo("mock")),
            Arc::new(MockBackend::echo("mock-monitor")),
        )
    } else {
        Backends::single(Arc::new(MockBackend::echo("mock")))
    };

    let mut coordinator = Coordinator::new(
        WorkspaceId::new(format!("demo-{}", case.name)),
        Arc::new(SharedMemory::new()),
        backends,
        CoordinatorConfig::default().with_dual_layer(dual_layer),
    )?
    .with_scenario(case.scenario);

    let result = coordinator.execute_task(case.task).await?;

    let state = coordinator.shared_state();
    let decisions = state.decisions()?;
    let binding = decisions.iter().filter(|d| d.binding).count();
    println!(
        "{:<10} {:<10} score {:>2}  teams {}  decisions {} ({} binding)  bugs {}  solutions {}",
        case.name,
        result.status.to_string(),
        result.complexity,
        result.spawned_teams.len(),
        decisions.len(),
        binding,
        state.bugs()?.len(),
        state.solutions()?.len()
    );
    Ok(result)
}

/// Runs every case, then prints the complexity table.
pub async fn run(dual_layer: bool) -> Result<()> {
    println!("Demonstration runs{}:", if dual_layer { " (dual-layer)" } else { "" });
    println!("{}", "-".repeat(80));

    let cases = cases();
    let samples: Vec<Task> = cases.iter().map(|c| c.task.clone()).collect();
    for case in cases {
        run_case(case, dual_layer).await?;
    }

    println!();
    print_complexity_table(&samples);
    Ok(())
}

fn print_complexity_table(tasks: &[Task]) {
    println!(
        "{:<28} {:>8} {:>6} {:>5} {:<10} {:>5} {:>5}",
        "TASK", "SUBTASKS", "HOURS", "DEPS", "DIFFICULTY", "SCORE", "TEAMS"
    );
    println!("{}", "-".repeat(80));
    for task in tasks {
        let total = score(task);
        println!(
            "{:<28} {:>8} {:>6} {:>5} {:<10} {:>5} {:>5}",
            task.description,
            task.subtasks.len(),
            task.estimated_hours,
            task.dependencies.len(),
            task.difficulty.as_str(),
            total,
            teams_for_score(total)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triad_models::ExecutionStatus;

    #[tokio::test]
    async fn test_every_case_completes() {
        for case in cases() {
            let name = case.name;
            let result = run_case(case, false).await.unwrap();
            assert_eq!(result.status, ExecutionStatus::Completed, "case {}", name);
        }
    }

    #[tokio::test]
    async fn test_complex_case_spawns_three_teams() {
        let case = cases().into_iter().find(|c| c.name == "complex").unwrap();
        let result = run_case(case, true).await.unwrap();
        assert_eq!(result.complexity, 14);
        assert_eq!(result.spawned_teams.len(), 3);
    }

    #[test]
    fn test_only_complex_case_spawns() {
        let spawning: Vec<_> = cases()
            .iter()
            .filter(|c| teams_for_score(score(&c.task)) > 0)
            .map(|c| c.name)
            .collect();
        assert_eq!(spawning, vec!["complex"]);
    }
}

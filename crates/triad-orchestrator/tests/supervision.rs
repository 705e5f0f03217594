//! Dual-layer supervision, status reporting and persistence.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use triad_inference::{GenerationBackend, MockBackend};
use triad_memory::SharedMemory;
use triad_models::{Activity, ExecutionStatus, RoleId, RoleKind, Task, WorkspaceId};
use triad_orchestrator::{Backends, Coordinator, CoordinatorConfig, Scenario, Signal};
use triad_persistence::WorkspaceStore;

fn two_step_task() -> Task {
    Task::new("Ship release notes").with_subtasks(["Draft", "Publish"])
}

fn dual(main: MockBackend, monitor: MockBackend, config: CoordinatorConfig) -> Coordinator {
    Coordinator::new(
        WorkspaceId::new("dual"),
        Arc::new(SharedMemory::new()),
        Backends::dual(Arc::new(main), Arc::new(monitor)),
        config.with_dual_layer(true),
    )
    .unwrap()
}

#[tokio::test]
async fn test_monitor_takes_over_hung_primary() {
    let scenario = Scenario::new().on(
        "Draft",
        Signal::Hang {
            role: RoleKind::Primary,
        },
    );
    let mut coordinator = dual(
        MockBackend::echo("main"),
        MockBackend::echo("shadow"),
        CoordinatorConfig::default(),
    )
    .with_scenario(scenario);

    let result = coordinator.execute_task(two_step_task()).await.unwrap();
    assert!(result.is_completed());

    let status = coordinator.system_status().unwrap();
    assert!(status.dual_layer);
    assert_eq!(status.promoted, vec![RoleKind::Primary]);

    let state = coordinator.shared_state();
    let takeover = state
        .decisions()
        .unwrap()
        .into_iter()
        .find(|d| d.decision == "monitor takeover of primary")
        .unwrap();
    assert_eq!(takeover.role, RoleId::monitor(RoleKind::Primary));

    let main = state.status(RoleId::PRIMARY).unwrap().unwrap();
    assert_eq!(main.activity, Activity::Standby);
    assert!(state
        .conversation()
        .unwrap()
        .iter()
        .any(|entry| entry.role == RoleId::monitor(RoleKind::Primary) && entry.speaker == "shadow"));
}

#[tokio::test]
async fn test_monitor_takes_over_on_backend_timeout() {
    let monitor = Arc::new(MockBackend::echo("shadow"));
    let mut coordinator = Coordinator::new(
        WorkspaceId::new("timeout"),
        Arc::new(SharedMemory::new()),
        Backends::dual(
            Arc::new(MockBackend::slow("main", Duration::from_secs(5))),
            Arc::clone(&monitor) as Arc<dyn GenerationBackend>,
        ),
        CoordinatorConfig::default()
            .with_dual_layer(true)
            .with_backend_timeout(Duration::from_millis(50)),
    )
    .unwrap();

    let result = coordinator.execute_task(two_step_task()).await.unwrap();

    assert!(result.is_completed());
    assert_eq!(result.completed_subtasks.len(), 2);
    assert_eq!(monitor.calls(), 2);
    assert!(coordinator.shared_state().bugs().unwrap().is_empty());
}

#[tokio::test]
async fn test_stale_status_triggers_takeover() {
    let mut coordinator = dual(
        MockBackend::slow("main", Duration::from_millis(80)),
        MockBackend::echo("shadow"),
        CoordinatorConfig::default().with_monitor_timeout(Duration::from_millis(10)),
    );

    let result = coordinator.execute_task(two_step_task()).await.unwrap();
    assert!(result.is_completed());

    let status = coordinator.system_status().unwrap();
    assert_eq!(status.promoted, vec![RoleKind::Primary]);
    let takeover = coordinator
        .shared_state()
        .decisions()
        .unwrap()
        .into_iter()
        .find(|d| d.decision == "monitor takeover of primary")
        .unwrap();
    assert!(takeover.rationale.starts_with("no status update"));
}

#[tokio::test]
async fn test_single_layer_hung_arbitrator_fails_dispute() {
    let scenario = Scenario::new()
        .on(
            "Draft",
            Signal::Hang {
                role: RoleKind::Arbitrator,
            },
        )
        .on(
            "Draft",
            Signal::Dispute {
                primary: "short notes".to_string(),
                assistant: "full changelog".to_string(),
            },
        );
    let mut coordinator = Coordinator::new(
        WorkspaceId::new("single"),
        Arc::new(SharedMemory::new()),
        Backends::single(Arc::new(MockBackend::echo("main"))),
        CoordinatorConfig::default(),
    )
    .unwrap()
    .with_scenario(scenario);

    let result = coordinator.execute_task(two_step_task()).await.unwrap();

    assert_eq!(result.status, ExecutionStatus::Failed);
    assert!(result
        .reason
        .unwrap()
        .starts_with("arbitrator unavailable during dispute on 'Draft'"));
}

#[tokio::test]
async fn test_system_status_reports_roles_and_health() {
    let mut coordinator = dual(
        MockBackend::echo("main"),
        MockBackend::echo("shadow"),
        CoordinatorConfig::default(),
    );
    coordinator.execute_task(two_step_task()).await.unwrap();

    let status = coordinator.system_status().unwrap();
    assert_eq!(status.roles.len(), 6);
    assert!(status.promoted.is_empty());
    assert!(status.active_teams.is_empty());

    let json = status.to_json().unwrap();
    assert!(json.contains("\"state\": \"completed\""));
    assert!(json.contains("\"health\""));
}

#[tokio::test]
async fn test_run_is_flushed_to_store() {
    let dir = TempDir::new().unwrap();
    let store = WorkspaceStore::new(dir.path());
    let workspace = WorkspaceId::new("durable");

    {
        let memory = Arc::new(SharedMemory::with_store(store.clone()));
        let mut coordinator = Coordinator::new(
            workspace.clone(),
            memory,
            Backends::single(Arc::new(MockBackend::echo("main"))),
            CoordinatorConfig::default(),
        )
        .unwrap();
        let task = two_step_task().with_user_input("keep it short");
        assert!(coordinator.execute_task(task).await.unwrap().is_completed());
    }

    assert!(store.exists(&workspace));
    let snapshot = store.load(&workspace).unwrap();
    assert!(snapshot
        .conversation
        .iter()
        .any(|entry| entry.message == "Completed subtask: Publish"));
    assert!(store.activity_log_path(&workspace).exists());

    // A fresh registry picks the workspace back up from disk.
    let reloaded = SharedMemory::with_store(store);
    let state = reloaded.workspace(&workspace).unwrap();
    assert_eq!(
        state.context().unwrap()["user_input"][0].content,
        "keep it short"
    );
}

use addin_probe::platforms::memory::{Activation, Effect, MemoryEngine, MemoryNode};
use addin_probe::simulation::{keys, simulated_session, MAIN_WINDOW_TITLE};
use addin_probe::{
    AccessibilityEngine, Capability, ControlKind, Orchestrator, ProbeConfig, RunState, RunStatus,
    Scenario, Timings, WindowApplication,
};
use std::sync::Arc;
use std::time::Duration;

const PACING: Duration = Duration::from_millis(100);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn fast_config() -> ProbeConfig {
    init_tracing();
    ProbeConfig {
        timings: Timings::default().scaled_down(20),
        scenario: Scenario {
            process_name: "addin-probe-test-no-such-process".to_string(),
            ..Scenario::default()
        },
    }
}

fn orchestrate(engine: &MemoryEngine, title: &str, config: ProbeConfig) -> Orchestrator {
    let shared: Arc<dyn AccessibilityEngine> = Arc::new(engine.clone());
    let app = WindowApplication::new(shared.clone(), title, config.timings.poll_interval);
    Orchestrator::new(shared, Arc::new(app), config)
}

#[test]
fn test_simulated_session_reaches_done() {
    let config = fast_config();
    let engine = MemoryEngine::new(simulated_session(&config.scenario, PACING));
    let mut orchestrator = orchestrate(&engine, MAIN_WINDOW_TITLE, config);

    let report = orchestrator.run();

    assert_eq!(report.status, RunStatus::Passed, "{report:#?}");
    assert_eq!(report.final_state, RunState::Done);
    assert_eq!(report.exit_code(), 0);
    let visited: Vec<RunState> = report.steps.iter().map(|s| s.state).collect();
    assert_eq!(
        visited,
        vec![
            RunState::AwaitingMainWindow,
            RunState::DismissingStartupPopup,
            RunState::AwaitingProjectOpen,
            RunState::AwaitingPluginButton,
            RunState::PluginInvoked,
            RunState::AwaitingActionButtons,
            RunState::AwaitingResultDialog,
        ]
    );

    assert_eq!(engine.activations_of(keys::POPUP_CLOSE), vec![Activation::Invoke]);
    assert_eq!(
        engine.activations_of(keys::SEARCH),
        vec![Activation::SetValue("Project1".to_string())]
    );
    assert_eq!(engine.activations_of(keys::PLUGIN_BUTTON), vec![Activation::Invoke]);
    assert_eq!(engine.activations_of("Execute"), vec![Activation::Invoke]);
    assert!(engine.activations_of("Insert Equipment").is_empty());
    assert!(engine.exists(keys::DIALOG));
    // Teardown closed the main window.
    assert!(!engine.exists(keys::MAIN));

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "passed");
    assert_eq!(json["final_state"], "Done");
}

#[test]
fn test_disabled_plugin_button_fails_the_run() {
    let config = fast_config();
    let engine = MemoryEngine::new(
        MemoryNode::desktop().child(
            MemoryNode::new(ControlKind::Window)
                .named("Autodesk Revit 2026 - [Project1 - 3D View]")
                .bounds(0.0, 0.0, 1920.0, 1040.0)
                .children([
                    MemoryNode::new(ControlKind::DataItem)
                        .named("Project1")
                        .bounds(40.0, 160.0, 300.0, 120.0),
                    MemoryNode::new(ControlKind::Button)
                        .named("ElectricalLoadPlugin")
                        .bounds(1700.0, 45.0, 60.0, 50.0)
                        .with(Capability::Invoke)
                        .disabled(),
                ]),
        ),
    );
    let mut orchestrator = orchestrate(&engine, "Autodesk Revit", config);

    let report = orchestrator.run();

    assert_eq!(report.status, RunStatus::Failed);
    assert_eq!(report.final_state, RunState::Failed);
    assert_eq!(report.exit_code(), 1);
    let cause = report.failure.unwrap();
    assert_eq!(cause.state, RunState::AwaitingPluginButton);
    assert!(cause.message.contains("disabled"), "{}", cause.message);
    assert!(engine.activations_of("ElectricalLoadPlugin").is_empty());
    // Teardown runs on the failure path too.
    assert!(!engine.exists("Autodesk Revit 2026 - [Project1 - 3D View]"));
}

#[test]
fn test_absent_startup_popup_is_recorded_and_the_run_continues() {
    let config = fast_config();
    let engine = MemoryEngine::new(simulated_session(&config.scenario, PACING));
    engine.apply(Effect::Remove(keys::POPUP.to_string()));
    let mut orchestrator = orchestrate(&engine, MAIN_WINDOW_TITLE, config);

    let report = orchestrator.run();

    assert_eq!(report.status, RunStatus::Passed, "{report:#?}");
    let popup_step = &report.steps[1];
    assert_eq!(popup_step.state, RunState::DismissingStartupPopup);
    assert!(popup_step.detail.contains("not dismissed"), "{}", popup_step.detail);
    assert!(engine.activations_of(keys::POPUP_CLOSE).is_empty());
}

#[test]
fn test_second_attempt_uses_the_re_rendered_recent_entry() {
    let config = fast_config();
    let opened = format!("{MAIN_WINDOW_TITLE} - [Project1 - 3D View]");
    let engine = MemoryEngine::new(
        MemoryNode::desktop().child(
            MemoryNode::new(ControlKind::Window)
                .key(keys::MAIN)
                .named(format!("{MAIN_WINDOW_TITLE} - [Home]"))
                .bounds(0.0, 0.0, 1920.0, 1040.0)
                .children([
                    // The first double click only re-renders the list.
                    MemoryNode::new(ControlKind::DataItem)
                        .key("stale-row")
                        .named("Project1")
                        .bounds(40.0, 160.0, 300.0, 120.0)
                        .on_activate(Effect::Remove("stale-row".to_string()))
                        .on_activate(Effect::Reveal("fresh-row".to_string())),
                    MemoryNode::new(ControlKind::DataItem)
                        .key("fresh-row")
                        .named("Project1")
                        .bounds(40.0, 160.0, 300.0, 120.0)
                        .hidden()
                        .on_activate(Effect::Rename(keys::MAIN.to_string(), opened)),
                ]),
        ),
    );
    let mut orchestrator = orchestrate(&engine, MAIN_WINDOW_TITLE, config);

    let report = orchestrator.run();

    let project_step = report
        .steps
        .iter()
        .find(|s| s.state == RunState::AwaitingProjectOpen)
        .unwrap_or_else(|| panic!("project never opened: {report:#?}"));
    assert!(project_step.detail.contains("second attempt"), "{}", project_step.detail);
    assert_eq!(engine.activations_of("stale-row"), vec![Activation::DoubleClick]);
    assert_eq!(engine.activations_of("fresh-row"), vec![Activation::DoubleClick]);
    // Nothing else in this tree; the run stops at the ribbon.
    assert_eq!(report.failure.unwrap().state, RunState::AwaitingPluginButton);
}

#[test]
fn test_missing_result_dialog_fails_at_the_last_step() {
    let config = fast_config();
    let engine = MemoryEngine::new(simulated_session(&config.scenario, PACING));
    let mut config = config;
    config.scenario.dialog_title = "Some Other Dialog".to_string();
    let dialog_timeout = config.timings.dialog_timeout;
    let mut orchestrator = orchestrate(&engine, MAIN_WINDOW_TITLE, config);

    let report = orchestrator.run();

    let cause = report.failure.clone().unwrap();
    assert_eq!(cause.state, RunState::AwaitingResultDialog);
    assert_eq!(cause.timeout_ms, Some(dialog_timeout.as_millis() as u64));
    assert!(cause.elapsed_ms >= dialog_timeout.as_millis() as u64);
    assert!(cause.query.unwrap().contains("Some Other Dialog"));
    assert_eq!(report.steps.len(), 6);
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn test_missing_main_window_is_a_setup_failure() {
    let mut config = fast_config();
    config.timings.startup_timeout = Duration::from_millis(100);
    let engine = MemoryEngine::new(MemoryNode::desktop());
    let mut orchestrator = orchestrate(&engine, MAIN_WINDOW_TITLE, config);

    let report = orchestrator.run();

    assert!(report.steps.is_empty());
    assert_eq!(report.failure.unwrap().state, RunState::AwaitingMainWindow);
    assert_eq!(orchestrator.state(), RunState::Failed);
}

#[test]
fn test_project_tab_counts_as_open_under_untitled_window() {
    let config = fast_config();
    let engine = MemoryEngine::new(
        MemoryNode::desktop().child(
            MemoryNode::new(ControlKind::Window).named("Untitled").child(
                MemoryNode::new(ControlKind::TabItem)
                    .named("Project1 - 3D View")
                    .appear_after(PACING),
            ),
        ),
    );
    let orchestrator = orchestrate(&engine, "Untitled", config);

    assert!(!orchestrator.wait_until_project_open("Project1", Duration::ZERO));
    assert!(orchestrator.wait_until_project_open("Project1", Duration::from_secs(1)));
    assert!(!orchestrator.wait_until_project_open("Project2", Duration::from_millis(50)));
}

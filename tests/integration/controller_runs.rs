//! Integration tests for background runs driven through progress events.

use std::path::PathBuf;
use std::time::Duration;

use fleet::config::FleetConfig;
use fleet::controller::{Action, Controller, Fleet, Outcome, ProgressEvent, RunHandle};
use fleet::device::mock::MockSource;
use fleet::device::{EnabledState, RawDevice, Registry};
use fleet::error::FleetError;
use fleet::plan::{Plan, Step};
use fleet::sequencer::mock::RecordingScripts;
use fleet::toolchain::mock::ScriptedShell;
use fleet::toolchain::{Session, SessionOptions, SessionState};

use crate::common::init_test_logging;

fn controller(mock: &MockSource, shell: &ScriptedShell, scripts: &RecordingScripts) -> Controller {
    let mut registry = Registry::new(Box::new(mock.clone()), &FleetConfig::default());
    registry.refresh().unwrap();
    let session = Session::with_installation(
        Some(PathBuf::from("vivado")),
        Box::new(shell.launcher()),
        SessionOptions {
            retry_delay: Duration::ZERO,
            ..SessionOptions::default()
        },
    );
    Controller::new(Fleet::new(registry, session, Box::new(scripts.clone())))
}

/// Everything a front-end would see, with pauses acknowledged at once.
#[derive(Debug, Default)]
struct Seen {
    total: Option<usize>,
    steps: Vec<(usize, String)>,
    waits: Vec<String>,
}

fn watch(handle: &RunHandle) -> Seen {
    let mut seen = Seen::default();
    for event in handle.events() {
        match event {
            ProgressEvent::Started { total } => seen.total = Some(total),
            ProgressEvent::Step { current, title, .. } => seen.steps.push((current, title)),
            ProgressEvent::Wait { message, ack } => {
                seen.waits.push(message);
                ack.send(()).unwrap();
            }
        }
    }
    seen
}

#[test]
fn program_all_run_reports_every_step() {
    init_test_logging();
    let mock = MockSource::with_boards(&[true, false]);
    let shell = ScriptedShell::new();
    let scripts = RecordingScripts::new();
    let mut controller = controller(&mock, &shell, &scripts);
    let plan: Plan = [
        Step::RunScript(PathBuf::from("pre.sh")),
        Step::Pause,
        Step::ProgramImage(PathBuf::from("top.bit")),
    ]
    .into_iter()
    .collect();

    let handle = controller.start(Action::ProgramAll, &plan).unwrap();
    let seen = watch(&handle);
    let report = controller.finish(handle).unwrap();

    assert!(report.is_success());
    assert_eq!(seen.total, Some(Action::ProgramAll.total_steps(2, 2, &plan)));
    assert_eq!(report.steps, seen.steps.len());
    assert_eq!(report.steps, seen.total.unwrap());
    let counters: Vec<usize> = seen.steps.iter().map(|(current, _)| *current).collect();
    assert_eq!(counters, (1..=report.steps).collect::<Vec<_>>());
    assert_eq!(seen.waits.len(), 2);
    assert_eq!(scripts.runs().len(), 2);
    assert_eq!(shell.count_sent("program_hw_devices"), 2);

    let fleet = controller.fleet().unwrap();
    assert_eq!(fleet.session.state(), SessionState::Ready);
    assert_eq!(fleet.registry.is_enabled(1).unwrap(), EnabledState::Disabled);
}

#[test]
fn cancel_mid_run_keeps_fleet_usable() {
    init_test_logging();
    let mock = MockSource::with_boards(&[true, true, true]);
    let shell = ScriptedShell::new();
    let scripts = RecordingScripts::new();
    let mut controller = controller(&mock, &shell, &scripts);
    let plan: Plan = [Step::Pause, Step::RunScript(PathBuf::from("flash.sh"))]
        .into_iter()
        .collect();

    let handle = controller.start(Action::ProgramAll, &plan).unwrap();
    for event in handle.events() {
        if let ProgressEvent::Wait { .. } = event {
            // Leave the pause unanswered; the worker notices the cancel
            handle.cancel();
        }
    }
    let report = controller.finish(handle).unwrap();

    assert_eq!(report.outcome, Outcome::Cancelled);
    assert!(scripts.runs().is_empty());
    // Only board 1 is left enabled: isolation ran, restore did not
    let states: Vec<EnabledState> = controller
        .fleet()
        .unwrap()
        .registry
        .devices()
        .iter()
        .map(|d| d.enabled)
        .collect();
    assert_eq!(
        states,
        [EnabledState::Enabled, EnabledState::Disabled, EnabledState::Disabled]
    );

    // The next run starts normally and puts everything back on
    let handle = controller.start(Action::EnableAll, &Plan::new()).unwrap();
    watch(&handle);
    assert!(controller.finish(handle).unwrap().is_success());
    assert!(controller.fleet().unwrap().registry.all_enabled());
}

#[test]
fn refresh_run_picks_up_new_boards() {
    init_test_logging();
    let mock = MockSource::with_boards(&[true]);
    let shell = ScriptedShell::new();
    let scripts = RecordingScripts::new();
    let mut controller = controller(&mock, &shell, &scripts);

    assert!(matches!(
        controller.start(Action::Toggle(1), &Plan::new()),
        Err(FleetError::InvalidDeviceIndex { index: 1, count: 1 })
    ));

    mock.set_devices(vec![
        RawDevice::new("BOARD-1", "USB Serial Converter A", "Started"),
        RawDevice::new("BOARD-2", "USB Serial Converter A", "Disabled"),
    ]);
    let handle = controller.start(Action::Refresh, &Plan::new()).unwrap();
    let seen = watch(&handle);
    assert_eq!(seen.steps, [(1, "Refreshing boards".to_string())]);
    controller.finish(handle).unwrap();

    let handle = controller.start(Action::Toggle(1), &Plan::new()).unwrap();
    let seen = watch(&handle);
    assert_eq!(seen.steps, [(1, "Enabling board 2".to_string())]);
    assert!(controller.finish(handle).unwrap().is_success());
    assert_eq!(mock.status("BOARD-2").as_deref(), Some("Started"));
}

#[test]
fn failed_script_restores_and_reports() {
    init_test_logging();
    let mock = MockSource::with_boards(&[false, true]);
    let shell = ScriptedShell::new();
    let mut registry = Registry::new(Box::new(mock.clone()), &FleetConfig::default());
    registry.refresh().unwrap();
    let session = Session::with_installation(None, Box::new(shell.launcher()), SessionOptions::default());
    let mut controller = Controller::new(Fleet::new(
        registry,
        session,
        Box::new(RecordingScripts::failing()),
    ));
    let plan: Plan = [Step::RunScript(PathBuf::from("missing.sh"))].into_iter().collect();

    let handle = controller.start(Action::Program(0), &plan).unwrap();
    watch(&handle);
    let report = controller.finish(handle).unwrap();

    assert!(matches!(report.outcome, Outcome::Failed(ref msg) if msg.contains("missing.sh")));
    let registry = &controller.fleet().unwrap().registry;
    assert_eq!(registry.is_enabled(0).unwrap(), EnabledState::Disabled);
    assert_eq!(registry.is_enabled(1).unwrap(), EnabledState::Enabled);
    assert_eq!(shell.launches(), 0);
}

#[test]
fn unknown_board_does_not_leave_bar_short() {
    init_test_logging();
    let mock = MockSource::new(vec![
        RawDevice::new("BOARD-1", "USB Serial Converter A", "Started"),
        RawDevice::new("BOARD-2", "USB Serial Converter A", "Problem"),
        RawDevice::new("BOARD-3", "USB Serial Converter A", "Disabled"),
    ]);
    let shell = ScriptedShell::new();
    let scripts = RecordingScripts::new();
    let mut controller = controller(&mock, &shell, &scripts);
    let plan: Plan = [Step::RunScript(PathBuf::from("pre.sh"))].into_iter().collect();

    let handle = controller.start(Action::ProgramAll, &plan).unwrap();
    let seen = watch(&handle);
    let report = controller.finish(handle).unwrap();

    assert!(report.is_success());
    assert_eq!(seen.total, Some(Action::ProgramAll.total_steps(3, 2, &plan)));
    assert_eq!(seen.total, Some(report.steps));
    // Last isolation disabled board 2 and nothing puts it back
    let registry = &controller.fleet().unwrap().registry;
    assert_eq!(registry.is_enabled(1).unwrap(), EnabledState::Disabled);
    assert_eq!(registry.is_enabled(2).unwrap(), EnabledState::Disabled);
}

//! Integration tests for registry, sequencer and toolchain session together.
//!
//! Uses [`MockSource`] in place of the device manager and [`ScriptedShell`]
//! in place of Vivado, so whole programming runs can be checked against
//! the exact device commands and Tcl lines they produce.

use std::path::PathBuf;
use std::time::Duration;

use fleet::config::FleetConfig;
use fleet::device::mock::{CommandFailure, MockSource};
use fleet::device::{DeviceAction, EnabledState, Registry};
use fleet::error::FleetError;
use fleet::plan::{Plan, PlanLayout, Step};
use fleet::sequencer::mock::{RecordingProgress, RecordingScripts};
use fleet::sequencer::{steps, RestorePolicy, Sequencer};
use fleet::toolchain::mock::ScriptedShell;
use fleet::toolchain::{Session, SessionOptions, SessionState, READY_MARKER};

struct Rig {
    mock: MockSource,
    shell: ScriptedShell,
    registry: Registry,
    session: Session,
    scripts: RecordingScripts,
}

impl Rig {
    fn new(enabled: &[bool]) -> Self {
        Self::with_shell(enabled, ScriptedShell::new())
    }

    fn with_shell(enabled: &[bool], shell: ScriptedShell) -> Self {
        let mock = MockSource::with_boards(enabled);
        let mut registry = Registry::new(Box::new(mock.clone()), &FleetConfig::default());
        registry.refresh().unwrap();
        let session = Session::with_installation(
            Some(PathBuf::from("/opt/Xilinx/Vivado/2023.2/bin/vivado")),
            Box::new(shell.launcher()),
            SessionOptions {
                program_retries: 3,
                retry_delay: Duration::ZERO,
                close_timeout: Duration::ZERO,
                ..SessionOptions::default()
            },
        );
        Self {
            mock,
            shell,
            registry,
            session,
            scripts: RecordingScripts::new(),
        }
    }

    fn sequencer<'a>(&'a mut self, progress: &'a mut RecordingProgress) -> Sequencer<'a> {
        Sequencer::new(
            &mut self.registry,
            &mut self.session,
            &mut self.scripts,
            progress,
        )
    }

    fn states(&self) -> Vec<EnabledState> {
        self.registry.devices().iter().map(|d| d.enabled).collect()
    }
}

fn full_plan() -> Plan {
    Plan::from_layout(PlanLayout {
        pre_script: Some(PathBuf::from("reset.sh")),
        bitstream: Some(PathBuf::from("build/top.bit")),
        post_script: Some(PathBuf::from("selftest.sh")),
        ..PlanLayout::default()
    })
}

#[test]
fn program_all_isolates_each_board_in_turn() {
    let mut rig = Rig::new(&[true, false, true]);
    let mut progress = RecordingProgress::new();
    let plan = full_plan();

    rig.sequencer(&mut progress).program_all(&plan).unwrap();

    // Every board enabled alone once, then the original states come back
    assert_eq!(
        rig.states(),
        [EnabledState::Enabled, EnabledState::Disabled, EnabledState::Enabled]
    );
    assert_eq!(rig.mock.status("BOARD-2").as_deref(), Some("Disabled"));
    assert_eq!(rig.mock.command_count(DeviceAction::Enable, "BOARD-2"), 1);
    assert_eq!(progress.steps().len(), steps::program_all(3, 3, &plan));

    // One Vivado launch serves all three boards
    assert_eq!(rig.shell.launches(), 1);
    assert_eq!(rig.shell.count_sent("program_hw_devices"), 3);
    assert_eq!(
        rig.scripts.runs(),
        ["reset.sh", "selftest.sh", "reset.sh", "selftest.sh", "reset.sh", "selftest.sh"]
            .map(PathBuf::from)
    );
}

#[test]
fn session_bootstrap_precedes_programming() {
    let mut rig = Rig::new(&[true]);
    let mut progress = RecordingProgress::new();
    let plan: Plan = [Step::ProgramImage(PathBuf::from("C:/bits/my top.bit"))]
        .into_iter()
        .collect();

    rig.sequencer(&mut progress).program(0, &plan).unwrap();

    let sent = rig.shell.sent();
    assert!(sent[0].starts_with("/opt/Xilinx/Vivado/2023.2/bin/vivado -mode tcl"));
    assert!(sent.iter().any(|l| l == "connect_hw_server -url TCP:localhost:3121"));
    let ready = sent
        .iter()
        .position(|l| l.contains(READY_MARKER))
        .unwrap();
    let file = sent
        .iter()
        .position(|l| l == "set_property PROGRAM.FILE \"C:/bits/my top.bit\" $hw_device")
        .unwrap();
    assert!(ready < file);
    assert_eq!(rig.session.state(), SessionState::Ready);
}

#[test]
fn failed_programming_is_not_fatal() {
    let shell = ScriptedShell::new().with_program_results(&["LOW", "LOW", "LOW", "HIGH"]);
    let mut rig = Rig::with_shell(&[true, true], shell);
    let mut progress = RecordingProgress::new();
    let plan: Plan = [
        Step::ProgramImage(PathBuf::from("top.bit")),
        Step::RunScript(PathBuf::from("after.sh")),
    ]
    .into_iter()
    .collect();

    rig.sequencer(&mut progress).program_all(&plan).unwrap();

    // Board 1 exhausts its 3 attempts, board 2 succeeds on the first
    assert_eq!(rig.shell.count_sent("program_hw_devices"), 4);
    assert_eq!(rig.scripts.runs().len(), 2);
    assert_eq!(rig.states(), [EnabledState::Enabled, EnabledState::Enabled]);
}

#[test]
fn session_is_reused_across_runs_and_closed_once() {
    let mut rig = Rig::new(&[true, true]);
    let plan: Plan = [Step::ProgramImage(PathBuf::from("top.bit"))].into_iter().collect();

    for board in 0..2 {
        let mut progress = RecordingProgress::new();
        rig.sequencer(&mut progress).program(board, &plan).unwrap();
        let inits = progress
            .steps()
            .iter()
            .filter(|s| *s == "Initializing Vivado")
            .count();
        assert_eq!(inits, 1, "every run reports the init step");
    }
    assert_eq!(rig.shell.launches(), 1);

    rig.session.close();
    assert!(rig.shell.exited());
    assert_eq!(rig.shell.sent().last().map(String::as_str), Some("exit"));

    let mut progress = RecordingProgress::new();
    let err = rig.sequencer(&mut progress).program(0, &plan).unwrap_err();
    assert!(matches!(err, FleetError::SessionClosed));
}

#[test]
fn broken_session_restores_boards() {
    let shell = ScriptedShell::new().with_broken_input();
    let mut rig = Rig::with_shell(&[false, true], shell);
    let mut progress = RecordingProgress::new();
    let plan: Plan = [Step::ProgramImage(PathBuf::from("top.bit"))].into_iter().collect();

    let err = rig.sequencer(&mut progress).program(0, &plan).unwrap_err();
    assert!(matches!(err, FleetError::SessionIo(_)));
    assert_eq!(rig.states(), [EnabledState::Disabled, EnabledState::Enabled]);
}

#[test]
fn failure_without_restore_leaves_isolation() {
    let mut rig = Rig::new(&[false, true]);
    rig.scripts = RecordingScripts::failing();
    let mut progress = RecordingProgress::new();
    let plan: Plan = [Step::RunScript(PathBuf::from("missing.sh"))].into_iter().collect();

    let err = Sequencer::new(
        &mut rig.registry,
        &mut rig.session,
        &mut rig.scripts,
        &mut progress,
    )
    .with_policy(RestorePolicy {
        restore_on_failure: false,
    })
    .program(0, &plan)
    .unwrap_err();

    assert!(matches!(err, FleetError::Script { .. }));
    assert_eq!(rig.states(), [EnabledState::Enabled, EnabledState::Disabled]);
    assert_eq!(rig.shell.launches(), 0);
}

#[test]
fn flaky_device_commands_are_retried_during_isolation() {
    let mut rig = Rig::new(&[true, true]);
    rig.mock.fail_commands("BOARD-2", CommandFailure::Times(2));
    let mut progress = RecordingProgress::new();

    rig.sequencer(&mut progress).enable_only(0).unwrap();

    assert_eq!(rig.mock.command_count(DeviceAction::Disable, "BOARD-2"), 3);
    assert_eq!(rig.mock.status("BOARD-2").as_deref(), Some("Disabled"));
    assert_eq!(rig.states(), [EnabledState::Enabled, EnabledState::Disabled]);
}

#[test]
fn pause_is_reported_per_board() {
    let mut rig = Rig::new(&[true, true]);
    let mut progress = RecordingProgress::new();
    let plan: Plan = [Step::Pause].into_iter().collect();

    rig.sequencer(&mut progress).program_all(&plan).unwrap();

    assert_eq!(
        progress.waits(),
        [
            "Board 1 is paused. Continue when ready.",
            "Board 2 is paused. Continue when ready.",
        ]
    );
    assert_eq!(rig.shell.launches(), 0);
}

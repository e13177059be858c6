//! Asynchronous entry points.
//!
//! A [`Controller`] owns the [`Fleet`] between runs. Starting an action
//! moves the fleet into a worker thread; progress flows back over a
//! channel and the fleet is handed back by [`RunHandle::join`]. While a
//! run is in flight the controller has no fleet, so a second start fails
//! with [`FleetError::Busy`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::device::Registry;
use crate::error::{FleetError, Result};
use crate::plan::Plan;
use crate::sequencer::{steps, Progress, RestorePolicy, ScriptRunner, Sequencer};
use crate::toolchain::Session;

/// How often a paused run re-checks for cancellation.
const WAIT_POLL: Duration = Duration::from_millis(100);

/// Operator action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "board", rename_all = "snake_case")]
pub enum Action {
    Refresh,
    EnableAll,
    DisableAll,
    ProgramAll,
    Toggle(usize),
    EnableOnly(usize),
    Program(usize),
}

/// Event keys without a board index.
const SIMPLE_ACTIONS: &[(&str, Action)] = &[
    ("refresh", Action::Refresh),
    ("enable_all", Action::EnableAll),
    ("disable_all", Action::DisableAll),
    ("program_all", Action::ProgramAll),
];

/// Event key prefixes followed by `_<index>`.
const INDEXED_ACTIONS: &[(&str, fn(usize) -> Action)] = &[
    ("toggle", Action::Toggle),
    ("enable_only", Action::EnableOnly),
    ("program", Action::Program),
];

impl Action {
    /// Map an event key such as `"enable_all"` or `"toggle_3"` to an action.
    ///
    /// Indices in keys are 0-based.
    #[must_use]
    pub fn parse(key: &str) -> Option<Self> {
        if let Some((_, action)) = SIMPLE_ACTIONS.iter().find(|(k, _)| *k == key) {
            return Some(*action);
        }
        let (prefix, index) = key.rsplit_once('_')?;
        let index = index.parse().ok()?;
        INDEXED_ACTIONS
            .iter()
            .find(|(k, _)| *k == prefix)
            .map(|(_, build)| build(index))
    }

    /// Board the action targets, if any.
    #[must_use]
    pub const fn board(&self) -> Option<usize> {
        match self {
            Self::Toggle(i) | Self::EnableOnly(i) | Self::Program(i) => Some(*i),
            Self::Refresh | Self::EnableAll | Self::DisableAll | Self::ProgramAll => None,
        }
    }

    /// Whether the action runs a plan.
    #[must_use]
    pub const fn uses_plan(&self) -> bool {
        matches!(self, Self::Program(_) | Self::ProgramAll)
    }

    /// Planned number of progress steps.
    ///
    /// `restorable` counts the boards whose state is known, the ones a
    /// program run puts back afterwards.
    #[must_use]
    pub fn total_steps(&self, boards: usize, restorable: usize, plan: &Plan) -> usize {
        match self {
            Self::Refresh => 1,
            Self::EnableAll => steps::enable_all(boards),
            Self::DisableAll => steps::disable_all(boards),
            Self::Toggle(_) => steps::toggle(),
            Self::EnableOnly(_) => steps::enable_only(boards),
            Self::Program(_) => steps::program(boards, restorable, plan),
            Self::ProgramAll => steps::program_all(boards, restorable, plan),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Refresh => f.write_str("refresh"),
            Self::EnableAll => f.write_str("enable all"),
            Self::DisableAll => f.write_str("disable all"),
            Self::ProgramAll => f.write_str("program all"),
            Self::Toggle(i) => write!(f, "toggle board {}", i + 1),
            Self::EnableOnly(i) => write!(f, "enable only board {}", i + 1),
            Self::Program(i) => write!(f, "program board {}", i + 1),
        }
    }
}

/// Everything a run needs, owned by exactly one thread at a time.
pub struct Fleet {
    pub registry: Registry,
    pub session: Session,
    pub scripts: Box<dyn ScriptRunner>,
    pub policy: RestorePolicy,
}

impl Fleet {
    #[must_use]
    pub fn new(registry: Registry, session: Session, scripts: Box<dyn ScriptRunner>) -> Self {
        Self {
            registry,
            session,
            scripts,
            policy: RestorePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RestorePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run one action to completion on the current thread.
    pub fn execute(&mut self, action: Action, plan: &Plan, progress: &mut dyn Progress) -> Result<()> {
        if action == Action::Refresh {
            progress.step("Refreshing boards")?;
            return self.registry.refresh();
        }

        let mut sequencer = Sequencer::new(
            &mut self.registry,
            &mut self.session,
            self.scripts.as_mut(),
            progress,
        )
        .with_policy(self.policy);
        match action {
            Action::EnableAll => sequencer.enable_all(),
            Action::DisableAll => sequencer.disable_all(),
            Action::Toggle(i) => sequencer.toggle(i),
            Action::EnableOnly(i) => sequencer.enable_only(i),
            Action::Program(i) => sequencer.program(i, plan),
            Action::ProgramAll => sequencer.program_all(plan),
            Action::Refresh => Ok(()),
        }
    }
}

impl fmt::Debug for Fleet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fleet")
            .field("boards", &self.registry.len())
            .field("session", &self.session)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Handle for cancelling a running action.
///
/// Cancellation takes effect at the next step report or while paused.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Progress notification from a worker.
#[derive(Debug)]
pub enum ProgressEvent {
    Started {
        total: usize,
    },
    Step {
        current: usize,
        total: usize,
        title: String,
    },
    /// The run is paused until `ack` receives a message.
    Wait {
        message: String,
        ack: Sender<()>,
    },
}

/// [`Progress`] over a channel, checking a [`CancelHandle`].
#[derive(Debug)]
pub struct ChannelProgress {
    events: Sender<ProgressEvent>,
    cancel: CancelHandle,
    current: usize,
    total: usize,
}

impl ChannelProgress {
    #[must_use]
    pub fn new(events: Sender<ProgressEvent>, cancel: CancelHandle, total: usize) -> Self {
        Self {
            events,
            cancel,
            current: 0,
            total,
        }
    }

    /// Steps reported so far.
    #[must_use]
    pub const fn current(&self) -> usize {
        self.current
    }

    fn send(&self, event: ProgressEvent) {
        if self.events.send(event).is_err() {
            debug!("Progress receiver gone");
        }
    }
}

impl Progress for ChannelProgress {
    fn step(&mut self, title: &str) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(FleetError::Cancelled);
        }
        self.current += 1;
        self.total = self.total.max(self.current);
        info!(step = self.current, total = self.total, "{title}");
        self.send(ProgressEvent::Step {
            current: self.current,
            total: self.total,
            title: title.to_string(),
        });
        Ok(())
    }

    fn wait(&mut self, message: &str) -> Result<()> {
        let (ack, acked) = mpsc::channel();
        info!("{message}");
        self.send(ProgressEvent::Wait {
            message: message.to_string(),
            ack,
        });
        loop {
            if self.cancel.is_cancelled() {
                return Err(FleetError::Cancelled);
            }
            match acked.recv_timeout(WAIT_POLL) {
                Ok(()) => return Ok(()),
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    if self.cancel.is_cancelled() {
                        return Err(FleetError::Cancelled);
                    }
                    warn!("Pause dropped without acknowledgement, continuing");
                    return Ok(());
                }
            }
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum Outcome {
    Completed,
    Cancelled,
    Failed(String),
}

/// Summary of a finished run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub action: Action,
    pub outcome: Outcome,
    pub steps: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Completed
    }

    #[must_use]
    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at - self.started_at
    }
}

/// A run in flight.
#[derive(Debug)]
pub struct RunHandle {
    action: Action,
    cancel: CancelHandle,
    events: Receiver<ProgressEvent>,
    worker: JoinHandle<(Fleet, RunReport)>,
}

impl RunHandle {
    #[must_use]
    pub const fn action(&self) -> Action {
        self.action
    }

    /// Request cancellation at the next step boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Progress events; the channel closes when the run ends.
    #[must_use]
    pub const fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    /// Wait for the worker and take the fleet back.
    pub fn join(self) -> Result<(Fleet, RunReport)> {
        self.worker
            .join()
            .map_err(|_| FleetError::Other(format!("worker for '{}' panicked", self.action)))
    }
}

/// Owner of the fleet between runs.
#[derive(Debug)]
pub struct Controller {
    fleet: Option<Fleet>,
}

impl Controller {
    #[must_use]
    pub const fn new(fleet: Fleet) -> Self {
        Self { fleet: Some(fleet) }
    }

    /// Whether a run currently holds the fleet.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.fleet.is_none()
    }

    /// The fleet, unless a run holds it.
    #[must_use]
    pub const fn fleet(&self) -> Option<&Fleet> {
        self.fleet.as_ref()
    }

    pub fn fleet_mut(&mut self) -> Option<&mut Fleet> {
        self.fleet.as_mut()
    }

    /// Give up the fleet, e.g. to close the session at exit.
    #[must_use]
    pub fn into_fleet(self) -> Option<Fleet> {
        self.fleet
    }

    /// Start `action` on a worker thread and return immediately.
    ///
    /// Board indices are validated up front. Without a toolchain
    /// installation, bitstream steps are dropped from the plan.
    pub fn start(&mut self, action: Action, plan: &Plan) -> Result<RunHandle> {
        let fleet = self.fleet.as_ref().ok_or(FleetError::Busy)?;
        if let Some(index) = action.board() {
            fleet.registry.device(index)?;
        }
        let plan = if action.uses_plan() && !fleet.session.is_available() {
            plan.without_images()
        } else {
            plan.clone()
        };
        let total = action.total_steps(
            fleet.registry.len(),
            fleet.registry.snapshot().len(),
            &plan,
        );

        let mut fleet = self.fleet.take().ok_or(FleetError::Busy)?;
        let cancel = CancelHandle::default();
        let (events_tx, events) = mpsc::channel();
        let mut progress = ChannelProgress::new(events_tx.clone(), cancel.clone(), total);

        info!(%action, total, "Starting run");
        let worker = thread::Builder::new()
            .name("fleet-run".to_string())
            .spawn(move || {
                let started_at = Utc::now();
                let _ = events_tx.send(ProgressEvent::Started { total });
                drop(events_tx);

                let outcome = match fleet.execute(action, &plan, &mut progress) {
                    Ok(()) => Outcome::Completed,
                    Err(FleetError::Cancelled) => Outcome::Cancelled,
                    Err(err) => {
                        warn!(%action, error = %err, "Run failed");
                        Outcome::Failed(err.to_string())
                    }
                };
                let report = RunReport {
                    action,
                    outcome,
                    steps: progress.current(),
                    started_at,
                    finished_at: Utc::now(),
                };
                info!(%action, outcome = ?report.outcome, steps = report.steps, "Run finished");
                (fleet, report)
            })?;

        Ok(RunHandle {
            action,
            cancel,
            events,
            worker,
        })
    }

    /// Join a run and take the fleet back.
    pub fn finish(&mut self, handle: RunHandle) -> Result<RunReport> {
        let (fleet, report) = handle.join()?;
        self.fleet = Some(fleet);
        Ok(report)
    }
}

//! Programming sequencer.
//!
//! Combines registry state changes with toolchain programming. While a
//! board is programmed it is the only enabled board; the states captured
//! before the run are restored afterwards.
//!
//! Every operation reports each discrete step through [`Progress`]. A step
//! report is the only cancellation point: once the controlling side asks
//! to stop, the next report returns [`FleetError::Cancelled`] and the run
//! unwinds, leaving boards as they are.

pub mod mock;
mod script;

pub use script::{ProcessScriptRunner, ScriptRunner};

use tracing::{error, info, instrument, warn};

use crate::device::{EnabledState, Registry};
use crate::error::{FleetError, Result};
use crate::plan::{Plan, Step};
use crate::state::Snapshot;
use crate::toolchain::Session;

/// Progress and control channel towards the operator.
pub trait Progress {
    /// Report the next step. Returns `Err(FleetError::Cancelled)` once the
    /// operator has asked to stop.
    fn step(&mut self, title: &str) -> Result<()>;

    /// Ask the operator to continue and block until acknowledged.
    fn wait(&mut self, message: &str) -> Result<()>;
}

/// What to do with the captured board states when a run body fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestorePolicy {
    /// Restore after a non-cancellation failure. Cancellation never restores.
    pub restore_on_failure: bool,
}

impl Default for RestorePolicy {
    fn default() -> Self {
        Self {
            restore_on_failure: true,
        }
    }
}

/// Total progress steps of each operation, used to size progress bars.
pub mod steps {
    use crate::plan::Plan;

    fn init(plan: &Plan) -> usize {
        usize::from(plan.has_image())
    }

    #[must_use]
    pub const fn enable_all(boards: usize) -> usize {
        boards
    }

    #[must_use]
    pub const fn disable_all(boards: usize) -> usize {
        boards
    }

    #[must_use]
    pub const fn toggle() -> usize {
        1
    }

    #[must_use]
    pub const fn enable_only(boards: usize) -> usize {
        boards
    }

    /// Enable target, disable the others, toolchain init, plan steps, restore.
    ///
    /// `restorable` is the number of boards with a known state before the
    /// run; only those get a restore step.
    #[must_use]
    pub fn program(boards: usize, restorable: usize, plan: &Plan) -> usize {
        boards + init(plan) + plan.len() + restorable
    }

    /// Per-board isolation and plan for every board, one init, one restore.
    #[must_use]
    pub fn program_all(boards: usize, restorable: usize, plan: &Plan) -> usize {
        boards * (boards + plan.len()) + init(plan) + restorable
    }
}

/// Drives one operation over borrowed registry and session.
pub struct Sequencer<'a> {
    registry: &'a mut Registry,
    session: &'a mut Session,
    scripts: &'a mut dyn ScriptRunner,
    progress: &'a mut dyn Progress,
    policy: RestorePolicy,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        registry: &'a mut Registry,
        session: &'a mut Session,
        scripts: &'a mut dyn ScriptRunner,
        progress: &'a mut dyn Progress,
    ) -> Self {
        Self {
            registry,
            session,
            scripts,
            progress,
            policy: RestorePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RestorePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn enable_all(&mut self) -> Result<()> {
        for i in 0..self.registry.len() {
            self.progress.step(&format!("Enabling board {}", i + 1))?;
            self.registry.enable(i)?;
        }
        Ok(())
    }

    pub fn disable_all(&mut self) -> Result<()> {
        for i in 0..self.registry.len() {
            self.progress.step(&format!("Disabling board {}", i + 1))?;
            self.registry.disable(i)?;
        }
        Ok(())
    }

    pub fn toggle(&mut self, index: usize) -> Result<()> {
        let title = match self.registry.is_enabled(index)? {
            EnabledState::Enabled => format!("Disabling board {}", index + 1),
            EnabledState::Disabled => format!("Enabling board {}", index + 1),
            EnabledState::Unknown => format!("Board {} state unknown, leaving it", index + 1),
        };
        self.progress.step(&title)?;
        self.registry.toggle(index, None)
    }

    /// Enable one board and disable every other.
    pub fn enable_only(&mut self, index: usize) -> Result<()> {
        self.registry.device(index)?;
        self.isolate(index)
    }

    /// Program a single board with the plan, then restore prior states.
    #[instrument(skip(self, plan), fields(board = index + 1, steps = plan.len()))]
    pub fn program(&mut self, index: usize, plan: &Plan) -> Result<()> {
        self.registry.device(index)?;
        let snapshot = self.registry.snapshot();

        let body = self.isolate(index).and_then(|()| {
            if plan.has_image() {
                self.init_toolchain()?;
            }
            self.run_plan(index, plan)
        });
        self.finish(body, &snapshot)
    }

    /// Program every board in turn with one shared session and snapshot.
    #[instrument(skip(self, plan), fields(boards = self.registry.len(), steps = plan.len()))]
    pub fn program_all(&mut self, plan: &Plan) -> Result<()> {
        let snapshot = self.registry.snapshot();

        let body = (0..self.registry.len()).try_for_each(|i| {
            self.isolate(i)?;
            if i == 0 && plan.has_image() {
                self.init_toolchain()?;
            }
            self.run_plan(i, plan)
        });
        self.finish(body, &snapshot)
    }

    fn isolate(&mut self, index: usize) -> Result<()> {
        self.progress.step(&format!("Enabling board {}", index + 1))?;
        self.registry.enable(index)?;
        for j in (0..self.registry.len()).filter(|&j| j != index) {
            self.progress.step(&format!("Disabling board {}", j + 1))?;
            self.registry.disable(j)?;
        }
        Ok(())
    }

    fn init_toolchain(&mut self) -> Result<()> {
        self.progress.step("Initializing Vivado")?;
        self.session.prepare(true)
    }

    fn run_plan(&mut self, index: usize, plan: &Plan) -> Result<()> {
        let board = index + 1;
        for (k, step) in plan.steps().iter().enumerate() {
            self.progress.step(&format!(
                "Programming board {board}: {} ({}/{})",
                step.label(),
                k + 1,
                plan.len()
            ))?;
            match step {
                Step::Pause => {
                    self.progress
                        .wait(&format!("Board {board} is paused. Continue when ready."))?;
                }
                Step::RunScript(path) => self.scripts.run(path)?,
                Step::ProgramImage(path) => {
                    if !self.session.program(path)? {
                        warn!(board, image = %path.display(), "Board not programmed, continuing");
                    }
                }
            }
        }
        Ok(())
    }

    /// Restore after the run body according to its outcome and the policy.
    fn finish(&mut self, body: Result<()>, snapshot: &Snapshot) -> Result<()> {
        match body {
            Ok(()) => {
                for entry in snapshot.entries() {
                    let verb = if entry.was_enabled { "enabled" } else { "disabled" };
                    self.progress
                        .step(&format!("Restoring {verb} board {}", entry.index + 1))?;
                    self.registry.toggle(entry.index, Some(entry.was_enabled))?;
                }
                info!("Run complete");
                Ok(())
            }
            Err(FleetError::Cancelled) => {
                info!("Run cancelled, boards left as they are");
                Err(FleetError::Cancelled)
            }
            Err(err) => {
                if self.policy.restore_on_failure {
                    warn!(error = %err, "Run failed, restoring board states");
                    if let Err(restore_err) = self.registry.restore(snapshot) {
                        error!(error = %restore_err, "Restore after failure failed");
                    }
                } else {
                    warn!(error = %err, "Run failed, boards left as they are");
                }
                Err(err)
            }
        }
    }
}

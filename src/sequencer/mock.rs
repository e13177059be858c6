//! Recording collaborators for sequencer tests.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{Progress, ScriptRunner};
use crate::error::{FleetError, Result};

/// Progress sink that records titles and can cancel at a given call.
#[derive(Debug, Default)]
pub struct RecordingProgress {
    steps: Vec<String>,
    waits: Vec<String>,
    cancel_at: Option<usize>,
}

impl RecordingProgress {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Report cancellation on the `call`-th step report (1-based) and after.
    #[must_use]
    pub fn cancel_at(call: usize) -> Self {
        Self {
            cancel_at: Some(call),
            ..Self::default()
        }
    }

    /// Titles of accepted steps.
    #[must_use]
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// Messages of operator waits.
    #[must_use]
    pub fn waits(&self) -> &[String] {
        &self.waits
    }
}

impl Progress for RecordingProgress {
    fn step(&mut self, title: &str) -> Result<()> {
        if self.cancel_at.is_some_and(|at| self.steps.len() + 1 >= at) {
            return Err(FleetError::Cancelled);
        }
        self.steps.push(title.to_string());
        Ok(())
    }

    fn wait(&mut self, message: &str) -> Result<()> {
        self.waits.push(message.to_string());
        Ok(())
    }
}

/// Script runner recording paths instead of executing them.
#[derive(Debug, Clone, Default)]
pub struct RecordingScripts {
    runs: Arc<Mutex<Vec<PathBuf>>>,
    fail_to_start: bool,
}

impl RecordingScripts {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner whose scripts can never be started.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_to_start: true,
            ..Self::default()
        }
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PathBuf>> {
        self.runs.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    #[must_use]
    pub fn runs(&self) -> Vec<PathBuf> {
        self.lock().clone()
    }
}

impl ScriptRunner for RecordingScripts {
    fn run(&mut self, path: &Path) -> Result<()> {
        if self.fail_to_start {
            return Err(FleetError::Script {
                path: path.display().to_string(),
                reason: "not found".to_string(),
            });
        }
        self.lock().push(path.to_path_buf());
        Ok(())
    }
}

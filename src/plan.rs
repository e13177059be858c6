//! Program plans: the ordered steps run against each board.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::FleetError;

/// One step of a program plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum Step {
    /// Ask the operator to continue.
    Pause,
    /// Run an external script and wait for it to exit.
    RunScript(PathBuf),
    /// Program a bitstream through the toolchain session.
    ProgramImage(PathBuf),
}

impl Step {
    /// Short label for progress titles.
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Pause => "pause".to_string(),
            Self::RunScript(path) => format!("script {}", file_name(path)),
            Self::ProgramImage(path) => format!("bitstream {}", file_name(path)),
        }
    }

    #[must_use]
    pub const fn is_image(&self) -> bool {
        matches!(self, Self::ProgramImage(_))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pause => f.write_str("pause"),
            Self::RunScript(path) => write!(f, "script={}", path.display()),
            Self::ProgramImage(path) => write!(f, "image={}", path.display()),
        }
    }
}

impl FromStr for Step {
    type Err = FleetError;

    /// Parse `pause`, `script=PATH` or `image=PATH`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("pause") {
            return Ok(Self::Pause);
        }
        let (kind, path) = s.split_once('=').ok_or_else(|| {
            FleetError::Other(format!(
                "Invalid step '{s}': expected pause, script=PATH or image=PATH"
            ))
        })?;
        if path.trim().is_empty() {
            return Err(FleetError::Other(format!("Invalid step '{s}': empty path")));
        }
        let path = PathBuf::from(path.trim());
        match kind.trim().to_lowercase().as_str() {
            "script" => Ok(Self::RunScript(path)),
            "image" | "bitstream" => Ok(Self::ProgramImage(path)),
            other => Err(FleetError::Other(format!("Unknown step kind '{other}'"))),
        }
    }
}

/// The fixed programming form: optional pauses around pre-script,
/// bitstream and post-script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanLayout {
    pub pause_before_pre_script: bool,
    pub pre_script: Option<PathBuf>,
    pub pause_before_program: bool,
    pub bitstream: Option<PathBuf>,
    pub pause_after_program: bool,
    pub post_script: Option<PathBuf>,
    pub pause_after_post_script: bool,
}

/// Ordered, editable list of steps.
///
/// Editing happens before a run; the sequencer only borrows the plan
/// immutably.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    steps: Vec<Step>,
}

impl Plan {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the plan of the fixed programming form.
    #[must_use]
    pub fn from_layout(layout: PlanLayout) -> Self {
        let mut plan = Self::new();
        if layout.pause_before_pre_script {
            plan.push(Step::Pause);
        }
        if let Some(path) = layout.pre_script {
            plan.push(Step::RunScript(path));
        }
        if layout.pause_before_program {
            plan.push(Step::Pause);
        }
        if let Some(path) = layout.bitstream {
            plan.push(Step::ProgramImage(path));
        }
        if layout.pause_after_program {
            plan.push(Step::Pause);
        }
        if let Some(path) = layout.post_script {
            plan.push(Step::RunScript(path));
        }
        if layout.pause_after_post_script {
            plan.push(Step::Pause);
        }
        plan
    }

    /// Append a step.
    pub fn push(&mut self, step: Step) {
        debug!(%step, "Adding plan step");
        self.steps.push(step);
    }

    /// Move a step one position earlier. Returns false at the top or out of range.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.steps.len() {
            return false;
        }
        self.steps.swap(index - 1, index);
        true
    }

    /// Move a step one position later. Returns false at the bottom or out of range.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.steps.len() {
            return false;
        }
        self.steps.swap(index, index + 1);
        true
    }

    /// Remove and return a step.
    pub fn remove(&mut self, index: usize) -> Option<Step> {
        (index < self.steps.len()).then(|| self.steps.remove(index))
    }

    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Whether any step needs the toolchain.
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.steps.iter().any(Step::is_image)
    }

    /// Copy of the plan with bitstream steps dropped, for when no
    /// toolchain is installed.
    #[must_use]
    pub fn without_images(&self) -> Self {
        let steps: Vec<Step> = self.steps.iter().filter(|s| !s.is_image()).cloned().collect();
        if steps.len() != self.steps.len() {
            warn!(
                dropped = self.steps.len() - steps.len(),
                "Toolchain unavailable, dropping bitstream steps"
            );
        }
        Self { steps }
    }
}

impl FromIterator<Step> for Plan {
    fn from_iter<I: IntoIterator<Item = Step>>(iter: I) -> Self {
        Self {
            steps: iter.into_iter().collect(),
        }
    }
}

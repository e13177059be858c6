//! Output mode abstraction for robot and human output.

use std::path::Path;

use serde::Serialize;

use crate::cli::Cli;
use crate::config::FleetConfig;
use crate::controller::RunReport;
use crate::device::{Device, EnabledState};
use crate::error::FleetError;
use crate::theme::FleetTheme;

pub mod human;
pub mod progress;
pub mod robot;

pub use human::HumanOutput;
pub use progress::{CONTINUE_PROMPT, RenderMode, render_run};
pub use robot::RobotOutput;

/// One row of a board listing, numbered the way the CLI addresses boards.
#[derive(Debug, Clone, Serialize)]
pub struct BoardEntry {
    /// 1-based board number.
    pub board: usize,
    pub name: String,
    pub id: String,
    pub status: String,
    pub state: EnabledState,
}

impl BoardEntry {
    /// Number a board set.
    #[must_use]
    pub fn from_devices(devices: &[Device]) -> Vec<Self> {
        devices
            .iter()
            .enumerate()
            .map(|(i, d)| Self {
                board: i + 1,
                name: d.display_name.clone(),
                id: d.id.clone(),
                status: d.status.clone(),
                state: d.enabled,
            })
            .collect()
    }
}

/// Toolchain discovery result.
#[derive(Debug, Clone, Serialize)]
pub struct ToolchainInfo {
    pub pattern: String,
    pub installation: Option<String>,
    pub available: bool,
    pub hw_server_url: String,
}

/// Build metadata for `fleet version`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    pub git_sha: &'static str,
    pub git_dirty: &'static str,
    pub build_timestamp: &'static str,
    pub rustc: &'static str,
    pub target: &'static str,
}

/// JSON formatting options for robot mode.
#[derive(Debug, Clone, Copy)]
pub enum RobotFormat {
    /// Pretty-printed JSON (default for --robot).
    Json,
    /// Single-line JSON (--format=json-compact).
    JsonCompact,
}

/// Determines how command output is rendered.
#[derive(Debug)]
pub enum OutputMode {
    /// JSON output for agents and scripting.
    Robot(RobotFormat),
    /// Styled terminal output for human users.
    Human(FleetTheme),
}

impl OutputMode {
    /// Create OutputMode from CLI arguments.
    #[must_use]
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.use_json() {
            let format = if cli.use_compact_json() {
                RobotFormat::JsonCompact
            } else {
                RobotFormat::Json
            };
            Self::Robot(format)
        } else {
            if cli.no_color {
                console::set_colors_enabled(false);
                console::set_colors_enabled_stderr(false);
            }
            Self::Human(FleetTheme::default())
        }
    }

    /// Returns true if output should be JSON.
    #[must_use]
    pub const fn is_robot(&self) -> bool {
        matches!(self, Self::Robot(_))
    }

    /// Convert into the appropriate Output implementation.
    #[must_use]
    pub fn into_output(self) -> Box<dyn Output> {
        match self {
            Self::Robot(format) => Box::new(RobotOutput::new(format)),
            Self::Human(theme) => Box::new(HumanOutput::new(theme)),
        }
    }
}

/// Trait for all output operations.
///
/// Commands call these methods without knowing the output mode.
pub trait Output {
    // Basic messages
    fn success(&self, message: &str);
    fn error(&self, error: &FleetError);
    fn warning(&self, message: &str);
    fn info(&self, message: &str);

    // Boards
    fn board_list(&self, devices: &[Device], long: bool);

    // Runs
    fn run_report(&self, report: &RunReport);

    // Toolchain and configuration
    fn toolchain_info(&self, info: &ToolchainInfo);
    fn config_info(&self, config: &FleetConfig, path: Option<&Path>);
    fn config_path(&self, path: Option<&Path>);

    // Metadata
    fn version_info(&self, info: &VersionInfo);
}

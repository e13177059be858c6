//! External script execution for `RunScript` steps.

use std::path::Path;
use std::process::Command;

use tracing::{info, warn};

use crate::error::{FleetError, Result};
use crate::toolchain::detach_from_console_group;

/// Runs operator scripts to completion.
pub trait ScriptRunner: Send {
    /// Run the script at `path` and wait for it to exit.
    ///
    /// A non-zero exit is logged, not an error; failing to start is.
    fn run(&mut self, path: &Path) -> Result<()>;
}

/// Runs scripts as child processes, inheriting stdio.
///
/// Scripts run in their own process group so a Ctrl-C aimed at the run
/// lets the current script finish.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessScriptRunner;

impl ScriptRunner for ProcessScriptRunner {
    fn run(&mut self, path: &Path) -> Result<()> {
        info!(script = %path.display(), "Running script");
        let status = detach_from_console_group(&mut Command::new(path))
            .status()
            .map_err(|e| FleetError::Script {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
        if status.success() {
            info!(script = %path.display(), "Script finished");
        } else {
            warn!(script = %path.display(), %status, "Script exited with failure");
        }
        Ok(())
    }
}

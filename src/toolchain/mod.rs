//! Vivado hardware-manager session driven through an interactive shell.
//!
//! One long-lived shell hosts Vivado in Tcl mode. Commands are written as
//! lines; progress is detected by scanning output lines for markers.
//!
//! # State machine
//!
//! ```text
//! NotStarted --prepare--> Launching --ready marker--> Ready
//!      \______________________\___________________________\--close--> Closed
//! ```
//!
//! `Closed` is terminal.

mod discover;
pub mod mock;
mod process;

pub use discover::discover_installation;
pub use process::{ChildShell, ProcessLauncher, ShellLauncher, ShellProcess};
pub(crate) use process::detach_from_console_group;

use std::fmt;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::ToolchainConfig;
use crate::error::{FleetError, Result};

/// Text printed once the bootstrap sequence has run.
pub const READY_MARKER: &str = "vivado is now ready";
/// Prefix of the line reporting the outcome of a program attempt.
pub const STARTUP_STATUS_MARKER: &str = "End of startup status";
/// Startup status meaning the device came up configured.
pub const SUCCESS_MARKER: &str = "HIGH";
/// Command programming the selected hardware device.
pub const PROGRAM_COMMAND: &str = "program_hw_devices";

const EXIT_COMMAND: &str = "exit";

/// Lifecycle state of a [`Session`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    Launching,
    Ready,
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::NotStarted => "not started",
            Self::Launching => "launching",
            Self::Ready => "ready",
            Self::Closed => "closed",
        })
    }
}

/// Tunables for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub hw_server_url: String,
    pub program_retries: u32,
    pub retry_delay: Duration,
    pub close_timeout: Duration,
}

impl From<&ToolchainConfig> for SessionOptions {
    fn from(config: &ToolchainConfig) -> Self {
        Self {
            hw_server_url: config.hw_server_url.clone(),
            program_retries: config.program_retries,
            retry_delay: config.retry_delay(),
            close_timeout: config.close_timeout(),
        }
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&ToolchainConfig::default())
    }
}

/// Tcl commands bringing the hardware manager up on the first target.
#[must_use]
pub fn bootstrap_commands(hw_server_url: &str) -> Vec<String> {
    vec![
        "load_features labtools".to_string(),
        "if { [catch {open_hw_manager} error] } { open_hw }".to_string(),
        format!("connect_hw_server -url {hw_server_url}"),
        "set targu [get_hw_targets *]".to_string(),
        "current_hw_target $targu".to_string(),
        "open_hw_target".to_string(),
        "set hw_device [lindex [get_hw_devices] 1]".to_string(),
        "current_hw_device $hw_device".to_string(),
        format!("puts \"{READY_MARKER}\""),
    ]
}

/// Shell line starting Vivado in Tcl mode.
fn launch_command(installation: &Path) -> String {
    let launcher = installation.display().to_string();
    let launcher = if launcher.contains(char::is_whitespace) {
        format!("\"{launcher}\"")
    } else {
        launcher
    };
    format!("{launcher} -mode tcl -nolog -nojournal -verbose")
}

/// Long-lived Vivado session.
pub struct Session {
    installation: Option<PathBuf>,
    launcher: Box<dyn ShellLauncher>,
    process: Option<Box<dyn ShellProcess>>,
    state: SessionState,
    options: SessionOptions,
}

impl Session {
    /// Create a session, discovering the installation from the config glob.
    #[must_use]
    pub fn new(config: &ToolchainConfig) -> Self {
        Self::with_installation(
            discover_installation(&config.path_pattern),
            Box::new(ProcessLauncher::new(config.shell.clone())),
            SessionOptions::from(config),
        )
    }

    /// Create a session with an explicit installation and launcher.
    #[must_use]
    pub fn with_installation(
        installation: Option<PathBuf>,
        launcher: Box<dyn ShellLauncher>,
        options: SessionOptions,
    ) -> Self {
        match &installation {
            Some(path) => info!(installation = %path.display(), "Toolchain found"),
            None => info!("No toolchain installation found, programming disabled"),
        }
        Self {
            installation,
            launcher,
            process: None,
            state: SessionState::NotStarted,
            options,
        }
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Whether a toolchain installation was found.
    #[must_use]
    pub const fn is_available(&self) -> bool {
        self.installation.is_some()
    }

    #[must_use]
    pub fn installation(&self) -> Option<&Path> {
        self.installation.as_deref()
    }

    /// Launch and bootstrap the session.
    ///
    /// No-op when already ready or when no installation is available. With
    /// `wait_ready` false the commands are sent but the ready marker is
    /// consumed by the next waiting call.
    #[instrument(skip(self), fields(state = %self.state))]
    pub fn prepare(&mut self, wait_ready: bool) -> Result<()> {
        match self.state {
            SessionState::Ready => return Ok(()),
            SessionState::Closed => return Err(FleetError::SessionClosed),
            SessionState::NotStarted | SessionState::Launching => {}
        }
        let Some(installation) = self.installation.clone() else {
            debug!("Toolchain unavailable, nothing to prepare");
            return Ok(());
        };

        if self.state == SessionState::NotStarted {
            info!(installation = %installation.display(), "Launching toolchain");
            let process = self
                .launcher
                .launch()
                .map_err(|e| FleetError::SessionIo(format!("failed to launch shell: {e}")))?;
            self.process = Some(process);
            self.state = SessionState::Launching;

            self.run_command(&launch_command(&installation))?;
            for command in bootstrap_commands(&self.options.hw_server_url) {
                self.run_command(&command)?;
            }
        }

        if wait_ready {
            info!("Waiting for toolchain to become ready");
            self.wait_for_marker(READY_MARKER)?;
            self.state = SessionState::Ready;
            info!("Toolchain ready");
        }
        Ok(())
    }

    /// Start the session in the background without waiting; errors are logged.
    pub fn preload(&mut self) {
        info!("Preloading toolchain");
        if let Err(err) = self.prepare(false) {
            warn!(error = %err, "Toolchain preload failed");
        }
    }

    /// Write one command line to the session.
    pub fn run_command(&mut self, text: &str) -> Result<()> {
        let process = self
            .process
            .as_mut()
            .ok_or_else(|| FleetError::SessionIo("toolchain not launched".to_string()))?;
        debug!(command = %text, "Running toolchain command");
        process
            .send_line(text)
            .map_err(|e| FleetError::SessionIo(format!("write failed: {e}")))
    }

    /// Block until an output line contains `marker` and return that line.
    ///
    /// There is no timeout; only the operator interrupting the process ends
    /// a wait for a marker that never comes.
    pub fn wait_for_marker(&mut self, marker: &str) -> Result<String> {
        let process = self
            .process
            .as_mut()
            .ok_or_else(|| FleetError::SessionIo("toolchain not launched".to_string()))?;
        debug!(%marker, "Waiting for marker");
        loop {
            match process.read_line() {
                Ok(Some(line)) => {
                    trace!("   > {line}");
                    if line.contains(marker) {
                        return Ok(line);
                    }
                }
                Ok(None) => {
                    return Err(FleetError::SessionIo(format!(
                        "toolchain output ended before '{marker}'"
                    )));
                }
                Err(e) => return Err(FleetError::SessionIo(format!("read failed: {e}"))),
            }
        }
    }

    /// Program the current hardware device with a bitstream.
    ///
    /// Returns `Ok(true)` once a startup status reports `HIGH`, `Ok(false)`
    /// when every attempt failed or the toolchain is unavailable.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub fn program(&mut self, path: &Path) -> Result<bool> {
        if !self.is_available() {
            warn!("Toolchain unavailable, skipping bitstream");
            return Ok(false);
        }
        let file = path.display().to_string();
        if file.contains('"') {
            return Err(FleetError::InvalidImagePath { path: file });
        }

        self.prepare(true)?;
        self.run_command(&format!("set_property PROGRAM.FILE \"{file}\" $hw_device"))?;

        let attempts = self.options.program_retries;
        for attempt in 1..=attempts {
            self.run_command(&format!("{PROGRAM_COMMAND} $hw_device"))?;
            let status = self.wait_for_marker(STARTUP_STATUS_MARKER)?;
            if status.contains(SUCCESS_MARKER) {
                info!(attempt, "Device programmed");
                return Ok(true);
            }
            warn!(attempt, attempts, %status, "Programming did not reach startup");
            if attempt < attempts {
                thread::sleep(self.options.retry_delay);
            }
        }

        error!(attempts, "Unable to program the device");
        Ok(false)
    }

    /// Shut the session down: `exit` first, kill on timeout. Never fails.
    pub fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        self.state = SessionState::Closed;
        let Some(mut process) = self.process.take() else {
            return;
        };

        info!("Closing toolchain");
        match process.exit(EXIT_COMMAND, self.options.close_timeout) {
            Ok(true) => debug!("Toolchain exited"),
            Ok(false) => {
                warn!("Toolchain did not exit in time, killing it");
                if let Err(err) = process.kill() {
                    warn!(error = %err, "Failed to kill toolchain");
                }
            }
            Err(err) => {
                warn!(error = %err, "Exit failed, killing toolchain");
                if let Err(err) = process.kill() {
                    warn!(error = %err, "Failed to kill toolchain");
                }
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("installation", &self.installation)
            .field("state", &self.state)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

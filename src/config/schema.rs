//! Configuration schema for the fleet tool.
//!
//! Every field has a default, so an empty file (or no file at all) yields
//! the stock setup: FTDI "USB Serial Converter A" boards managed through
//! `pnputil` and programmed with the newest Vivado under `C:/Xilinx`.
//!
//! # Example TOML
//!
//! ```toml
//! device_description = "USB Serial Converter A"
//! restore_on_failure = true
//!
//! [retries]
//! enable = 10
//! disable = 10
//!
//! [toolchain]
//! path_pattern = "C:/Xilinx/Vivado*/*/bin/vivado.bat"
//! program_retries = 10
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{FleetError, Result};

/// Placeholder substituted with the device instance id in command templates.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Device class description a listed device must match exactly.
    pub device_description: String,
    /// Command that lists connected USB devices.
    pub list_command: String,
    /// Command template that enables a device (`{id}` is replaced).
    pub enable_command: String,
    /// Command template that disables a device (`{id}` is replaced).
    pub disable_command: String,
    /// Status strings meaning "enabled" (one per OS locale).
    pub status_enabled: Vec<String>,
    /// Status strings meaning "disabled" (one per OS locale).
    pub status_disabled: Vec<String>,
    /// Retry bounds for enable/disable commands.
    pub retries: RetryConfig,
    /// Vivado toolchain settings.
    pub toolchain: ToolchainConfig,
    /// Interval between automatic refreshes in watch mode.
    pub refresh_interval_ms: u64,
    /// Restore the captured board states when a programming run fails.
    pub restore_on_failure: bool,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            device_description: "USB Serial Converter A".to_string(),
            list_command: "pnputil /enum-devices /class USB /connected".to_string(),
            enable_command: format!("pnputil /enable-device {ID_PLACEHOLDER}"),
            disable_command: format!("pnputil /disable-device {ID_PLACEHOLDER}"),
            status_enabled: vec![
                "Started".to_string(),
                "Iniciado".to_string(),
                "Enabled".to_string(),
            ],
            status_disabled: vec!["Disabled".to_string(), "Deshabilitado".to_string()],
            retries: RetryConfig::default(),
            toolchain: ToolchainConfig::default(),
            refresh_interval_ms: 2000,
            restore_on_failure: true,
        }
    }
}

impl FleetConfig {
    /// Validate the configuration.
    ///
    /// Checks that:
    /// - Commands are non-empty and templates contain `{id}`
    /// - Retry counts are at least 1
    /// - The toolchain shell is set
    pub fn validate(&self) -> Result<()> {
        trace!("Validating fleet config");

        if self.list_command.trim().is_empty() {
            return Err(FleetError::ConfigInvalid(
                "list_command must not be empty".to_string(),
            ));
        }
        for (name, template) in [
            ("enable_command", &self.enable_command),
            ("disable_command", &self.disable_command),
        ] {
            if !template.contains(ID_PLACEHOLDER) {
                return Err(FleetError::ConfigInvalid(format!(
                    "{name} must contain the {ID_PLACEHOLDER} placeholder"
                )));
            }
        }
        if self.retries.enable == 0 || self.retries.disable == 0 {
            return Err(FleetError::ConfigInvalid(
                "retries.enable and retries.disable must be at least 1".to_string(),
            ));
        }
        if self.toolchain.program_retries == 0 {
            return Err(FleetError::ConfigInvalid(
                "toolchain.program_retries must be at least 1".to_string(),
            ));
        }
        if self.toolchain.shell.trim().is_empty() {
            return Err(FleetError::ConfigInvalid(
                "toolchain.shell must not be empty".to_string(),
            ));
        }

        debug!(description = %self.device_description, "Config validated");
        Ok(())
    }

    /// Refresh interval for watch mode.
    #[must_use]
    pub const fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

/// Retry bounds for device-manager commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub enable: u32,
    pub disable: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enable: 10,
            disable: 10,
        }
    }
}

/// Vivado hardware-manager session settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Glob locating the Vivado launcher; the highest sorted match wins.
    pub path_pattern: String,
    /// Start the session in the background as soon as the tool starts.
    pub preload: bool,
    /// Interactive shell hosting the toolchain.
    pub shell: String,
    /// Hardware server the session connects to.
    pub hw_server_url: String,
    /// Program attempts per bitstream.
    pub program_retries: u32,
    /// Delay between program attempts.
    pub retry_delay_ms: u64,
    /// Grace period for `exit` before the shell is killed.
    pub close_timeout_ms: u64,
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            path_pattern: "C:/Xilinx/Vivado*/*/bin/vivado.bat".to_string(),
            preload: false,
            shell: default_shell().to_string(),
            hw_server_url: "TCP:localhost:3121".to_string(),
            program_retries: 10,
            retry_delay_ms: 1000,
            close_timeout_ms: 2000,
        }
    }
}

impl ToolchainConfig {
    #[must_use]
    pub const fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    #[must_use]
    pub const fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

const fn default_shell() -> &'static str {
    if cfg!(windows) { "cmd.exe" } else { "sh" }
}

//! Robot mode JSON output implementation.

use std::path::Path;

use serde::Serialize;
use tracing::{debug, error, instrument, trace};

use crate::config::FleetConfig;
use crate::controller::RunReport;
use crate::device::Device;
use crate::error::FleetError;

use super::{BoardEntry, Output, RobotFormat, ToolchainInfo, VersionInfo};

/// JSON output implementation for agents and scripting.
///
/// Results go to stdout, errors to stderr.
pub struct RobotOutput {
    format: RobotFormat,
}

impl RobotOutput {
    #[instrument]
    pub fn new(format: RobotFormat) -> Self {
        debug!(?format, "Creating RobotOutput");
        Self { format }
    }

    fn render<T: Serialize + ?Sized>(&self, data: &T) -> Option<String> {
        let json = match self.format {
            RobotFormat::Json => serde_json::to_string_pretty(data),
            RobotFormat::JsonCompact => serde_json::to_string(data),
        };
        match json {
            Ok(json) => {
                trace!(json_len = json.len(), "JSON serialized");
                Some(json)
            }
            Err(err) => {
                error!(error = %err, "JSON serialization failed");
                None
            }
        }
    }

    /// Output any serializable data as JSON to stdout.
    fn output_json<T: Serialize + ?Sized>(&self, data: &T) {
        if let Some(json) = self.render(data) {
            println!("{json}");
        }
    }

    /// Output JSON to stderr.
    fn output_json_stderr<T: Serialize>(&self, data: &T) {
        if let Some(json) = self.render(data) {
            eprintln!("{json}");
        }
    }
}

/// JSON shape of an error.
pub fn error_json(error: &FleetError) -> serde_json::Value {
    serde_json::json!({
        "error": true,
        "message": error.to_string(),
        "suggestion": error.suggestion(),
        "recoverable": error.is_user_recoverable(),
    })
}

impl Output for RobotOutput {
    #[instrument(skip(self))]
    fn success(&self, message: &str) {
        debug!(message, "Robot: success");
        self.output_json(&serde_json::json!({
            "success": true,
            "message": message
        }));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &FleetError) {
        debug!(error = %error, "Robot: error");
        self.output_json_stderr(&error_json(error));
    }

    #[instrument(skip(self))]
    fn warning(&self, message: &str) {
        debug!(message, "Robot: warning");
        self.output_json_stderr(&serde_json::json!({
            "warning": true,
            "message": message
        }));
    }

    #[instrument(skip(self))]
    fn info(&self, message: &str) {
        debug!(message, "Robot: info");
        self.output_json_stderr(&serde_json::json!({
            "info": true,
            "message": message
        }));
    }

    #[instrument(skip(self, devices), fields(count = devices.len()))]
    fn board_list(&self, devices: &[Device], _long: bool) {
        debug!("Robot: board_list");
        self.output_json(&BoardEntry::from_devices(devices));
    }

    #[instrument(skip(self, report), fields(action = %report.action))]
    fn run_report(&self, report: &RunReport) {
        debug!("Robot: run_report");
        self.output_json(report);
    }

    #[instrument(skip(self, info))]
    fn toolchain_info(&self, info: &ToolchainInfo) {
        debug!(available = info.available, "Robot: toolchain_info");
        self.output_json(info);
    }

    #[instrument(skip(self, config))]
    fn config_info(&self, config: &FleetConfig, path: Option<&Path>) {
        debug!(?path, "Robot: config_info");
        self.output_json(&serde_json::json!({
            "path": path.map(|p| p.display().to_string()),
            "config": config,
        }));
    }

    #[instrument(skip(self))]
    fn config_path(&self, path: Option<&Path>) {
        debug!(?path, "Robot: config_path");
        self.output_json(&serde_json::json!({
            "path": path.map(|p| p.display().to_string()),
            "exists": path.is_some_and(Path::exists),
        }));
    }

    #[instrument(skip(self, info))]
    fn version_info(&self, info: &VersionInfo) {
        debug!(version = info.version, "Robot: version_info");
        self.output_json(info);
    }
}

//! Human-friendly output implementation using console styling.

use std::path::Path;

use console::Term;
use tracing::{debug, instrument, trace};

use crate::config::FleetConfig;
use crate::controller::{Outcome, RunReport};
use crate::device::Device;
use crate::error::FleetError;
use crate::theme::FleetTheme;

use super::{Output, ToolchainInfo, VersionInfo};

/// Styled terminal output implementation for human users.
pub struct HumanOutput {
    out: Term,
    err: Term,
    theme: FleetTheme,
}

impl HumanOutput {
    #[instrument(skip(theme))]
    pub fn new(theme: FleetTheme) -> Self {
        debug!("Creating HumanOutput");
        Self {
            out: Term::stdout(),
            err: Term::stderr(),
            theme,
        }
    }

    fn line(&self, text: &str) {
        if let Err(err) = self.out.write_line(text) {
            trace!(error = %err, "stdout write failed");
        }
    }

    fn err_line(&self, text: &str) {
        if let Err(err) = self.err.write_line(text) {
            trace!(error = %err, "stderr write failed");
        }
    }

    fn field(&self, name: &str, value: &str) {
        self.line(&format!(
            "  {}{}",
            self.theme.label.apply_to(format!("{name:<12}")),
            self.theme.value.apply_to(value)
        ));
    }
}

impl Output for HumanOutput {
    #[instrument(skip(self))]
    fn success(&self, message: &str) {
        debug!(message, "Outputting success");
        self.line(&format!("{}{message}", self.theme.success.apply_to("[OK] ")));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &FleetError) {
        debug!(
            error = %error,
            recoverable = error.is_user_recoverable(),
            "Outputting error"
        );
        self.err_line(&format!(
            "{}{}",
            self.theme.error.apply_to("[ERR] "),
            console::style(error).bold()
        ));
        if let Some(suggestion) = error.suggestion() {
            trace!(suggestion, "Adding suggestion");
            self.err_line(&format!(
                "  {} {}",
                self.theme.label.apply_to("Suggestion:"),
                self.theme.muted.apply_to(suggestion)
            ));
        }
    }

    #[instrument(skip(self))]
    fn warning(&self, message: &str) {
        debug!(message, "Outputting warning");
        self.err_line(&format!("{}{message}", self.theme.warning.apply_to("[WARN] ")));
    }

    #[instrument(skip(self))]
    fn info(&self, message: &str) {
        debug!(message, "Outputting info");
        self.line(&format!("{}{message}", self.theme.accent.apply_to("[INFO] ")));
    }

    #[instrument(skip(self, devices), fields(count = devices.len()))]
    fn board_list(&self, devices: &[Device], long: bool) {
        debug!("Outputting board list");
        if devices.is_empty() {
            trace!("No boards - showing warning");
            self.warning("No boards found");
            return;
        }

        self.line(&self.theme.header.apply_to("Boards:").to_string());
        let width = devices
            .iter()
            .map(|d| d.display_name.chars().count())
            .max()
            .unwrap_or(0);
        for (i, device) in devices.iter().enumerate() {
            trace!(index = i, id = %device.id, "Listing board");
            let state = self.theme.state(device.enabled).apply_to(format!("{:<8}", device.enabled));
            let mut row = format!(
                "  {} {:<width$}  {state}",
                self.theme.board_number.apply_to(format!("{:>2}.", i + 1)),
                device.display_name,
            );
            if long {
                row.push_str(&format!(
                    "  {} {}",
                    self.theme.device_id.apply_to(&device.id),
                    self.theme.muted.apply_to(format!("({})", device.status))
                ));
            }
            self.line(&row);
        }
    }

    #[instrument(skip(self, report), fields(action = %report.action))]
    fn run_report(&self, report: &RunReport) {
        debug!(outcome = ?report.outcome, "Outputting run report");
        let elapsed = report.elapsed().num_milliseconds() as f64 / 1000.0;
        match &report.outcome {
            Outcome::Completed => self.success(&format!(
                "{} finished: {} steps in {elapsed:.1}s",
                capitalize(&report.action.to_string()),
                report.steps
            )),
            Outcome::Cancelled => self.warning(&format!(
                "{} cancelled after {} steps",
                capitalize(&report.action.to_string()),
                report.steps
            )),
            Outcome::Failed(message) => self.err_line(&format!(
                "{}{} failed after {} steps: {message}",
                self.theme.error.apply_to("[ERR] "),
                capitalize(&report.action.to_string()),
                report.steps
            )),
        }
    }

    #[instrument(skip(self, info))]
    fn toolchain_info(&self, info: &ToolchainInfo) {
        debug!(available = info.available, "Outputting toolchain info");
        self.line(&self.theme.header.apply_to("Vivado").to_string());
        self.field("Pattern", &info.pattern);
        match &info.installation {
            Some(path) => self.field("Launcher", path),
            None => self.line(&format!(
                "  {}{}",
                self.theme.label.apply_to(format!("{:<12}", "Launcher")),
                self.theme.warning.apply_to("not found (bitstream steps are skipped)")
            )),
        }
        self.field("HW server", &info.hw_server_url);
    }

    #[instrument(skip(self, config))]
    fn config_info(&self, config: &FleetConfig, path: Option<&Path>) {
        debug!(?path, "Outputting config");
        let source = path.map_or_else(|| "built-in defaults".to_string(), |p| p.display().to_string());
        self.line(&format!(
            "{} {}",
            self.theme.header.apply_to("Configuration"),
            self.theme.muted.apply_to(format!("({source})"))
        ));
        match toml::to_string_pretty(config) {
            Ok(text) => {
                for row in text.lines() {
                    self.line(&format!("  {row}"));
                }
            }
            Err(err) => self.warning(&format!("Cannot render configuration: {err}")),
        }
    }

    #[instrument(skip(self))]
    fn config_path(&self, path: Option<&Path>) {
        match path {
            Some(path) if path.exists() => self.line(&path.display().to_string()),
            Some(path) => self.line(&format!(
                "{} {}",
                path.display(),
                self.theme.muted.apply_to("(not created)")
            )),
            None => self.warning("No configuration directory on this platform"),
        }
    }

    #[instrument(skip(self, info))]
    fn version_info(&self, info: &VersionInfo) {
        debug!(version = info.version, "Outputting version info");
        self.line(&self.theme.header.apply_to("fleet").to_string());
        self.field("Version", info.version);
        let sha = if info.git_dirty == "true" {
            format!("{} (dirty)", info.git_sha)
        } else {
            info.git_sha.to_string()
        };
        self.field("Git SHA", &sha);
        self.field("Built", info.build_timestamp);
        self.field("Rust", info.rustc);
        self.field("Target", info.target);
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

//! Device source backed by the OS device manager command line.
//!
//! Listing output is the `pnputil /enum-devices` record format: a header
//! block, then one block per device separated by blank lines, each holding
//! exactly six `Key: Value` lines in a fixed order.

use std::process::Command;

use tracing::{debug, trace, warn};

use super::DeviceSource;
use super::info::{DeviceAction, RawDevice};
use crate::config::{FleetConfig, ID_PLACEHOLDER};
use crate::error::{FleetError, Result};
use crate::toolchain::detach_from_console_group;

/// Number of `Key: Value` lines in one device record.
pub const RECORD_FIELDS: usize = 6;

const FIELD_ID: usize = 0;
const FIELD_DESCRIPTION: usize = 1;
const FIELD_STATUS: usize = 5;

/// Device source that shells out to the configured commands.
#[derive(Debug, Clone)]
pub struct CommandSource {
    list_command: String,
    enable_command: String,
    disable_command: String,
}

impl CommandSource {
    #[must_use]
    pub fn new(config: &FleetConfig) -> Self {
        Self {
            list_command: config.list_command.clone(),
            enable_command: config.enable_command.clone(),
            disable_command: config.disable_command.clone(),
        }
    }
}

impl DeviceSource for CommandSource {
    fn list_devices(&mut self) -> Result<Vec<RawDevice>> {
        let (program, args) = split_command(&self.list_command, None)
            .ok_or_else(|| FleetError::Enumeration {
                reason: "empty listing command".to_string(),
            })?;
        debug!(command = %self.list_command, "Listing devices");

        let output = Command::new(&program)
            .args(&args)
            .output()
            .map_err(|e| FleetError::Enumeration {
                reason: format!("failed to run '{program}': {e}"),
            })?;
        if !output.status.success() {
            return Err(FleetError::Enumeration {
                reason: format!("'{program}' exited with {}", output.status),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout);
        parse_listing(&text)
    }

    fn run_device_command(&mut self, action: DeviceAction, id: &str) -> Result<()> {
        let template = match action {
            DeviceAction::Enable => &self.enable_command,
            DeviceAction::Disable => &self.disable_command,
        };
        let command_error = |reason: String| FleetError::DeviceCommand {
            action: action.as_str().to_string(),
            id: id.to_string(),
            reason,
        };
        let (program, args) = split_command(template, Some(id))
            .ok_or_else(|| command_error("empty command template".to_string()))?;
        trace!(%program, ?args, "Running device command");

        // An interrupted retry loop still finishes the command in flight
        let status = detach_from_console_group(&mut Command::new(&program))
            .args(&args)
            .status()
            .map_err(|e| command_error(e.to_string()))?;
        if status.success() {
            Ok(())
        } else {
            Err(command_error(format!("exited with {status}")))
        }
    }
}

/// Split a command template into program and arguments, substituting `{id}`.
///
/// The id is substituted per token, so ids containing spaces stay one argument.
fn split_command(template: &str, id: Option<&str>) -> Option<(String, Vec<String>)> {
    let mut tokens = template.split_whitespace().map(|token| match id {
        Some(id) => token.replace(ID_PLACEHOLDER, id),
        None => token.to_string(),
    });
    let program = tokens.next()?;
    Some((program, tokens.collect()))
}

/// Parse the device listing into raw records.
///
/// Blocks without any `:` (tool banner, trailing noise) are skipped. Every
/// other block must have exactly [`RECORD_FIELDS`] lines of `Key: Value`;
/// anything else is an enumeration error rather than a silent misparse.
pub fn parse_listing(output: &str) -> Result<Vec<RawDevice>> {
    let normalized = output.replace("\r\n", "\n");
    let mut devices = Vec::new();

    for (block_index, block) in normalized.split("\n\n").enumerate() {
        let lines: Vec<&str> = block
            .lines()
            .map(str::trim_end)
            .filter(|line| !line.trim().is_empty())
            .collect();
        if lines.is_empty() || !lines.iter().any(|line| line.contains(':')) {
            trace!(block_index, "Skipping non-record block");
            continue;
        }

        if lines.len() != RECORD_FIELDS {
            warn!(block_index, fields = lines.len(), "Malformed device record");
            return Err(FleetError::Enumeration {
                reason: format!(
                    "record {block_index} has {} fields, expected {RECORD_FIELDS}",
                    lines.len()
                ),
            });
        }

        let values = lines
            .iter()
            .map(|line| {
                line.split_once(':')
                    .map(|(_, value)| value.trim())
                    .ok_or_else(|| FleetError::Enumeration {
                        reason: format!("record {block_index}: line without ':' ({line})"),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        devices.push(RawDevice::new(
            values[FIELD_ID],
            values[FIELD_DESCRIPTION],
            values[FIELD_STATUS],
        ));
    }

    debug!(count = devices.len(), "Parsed device listing");
    Ok(devices)
}

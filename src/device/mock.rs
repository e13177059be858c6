//! Mock device source for testing without a device manager.
//!
//! Records every external call and supports failure injection. Clones
//! share state, so a test can keep one handle while the registry owns
//! another.
//!
//! # Example
//!
//! ```rust,ignore
//! use fleet::device::mock::{MockSource, Operation};
//! use fleet::device::Registry;
//!
//! let mock = MockSource::with_boards(&[true, false]);
//! let mut registry = Registry::new(Box::new(mock.clone()), &config);
//! registry.refresh()?;
//! registry.enable(1);
//!
//! mock.assert_operations(&[
//!     Operation::List,
//!     Operation::Command { action: DeviceAction::Enable, id: "BOARD-1".into() },
//! ]);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, trace};

use super::DeviceSource;
use super::info::{DeviceAction, RawDevice};
use crate::error::{FleetError, Result};

/// Description used for mock boards; matches the default config.
pub const MOCK_DESCRIPTION: &str = "USB Serial Converter A";

/// Recorded operation for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    List,
    Command { action: DeviceAction, id: String },
}

/// How often a device command fails before succeeding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandFailure {
    /// Fail the next `n` invocations.
    Times(u32),
    Always,
}

#[derive(Debug, Default)]
struct MockState {
    devices: Vec<RawDevice>,
    operation_log: Vec<Operation>,
    list_error: Option<String>,
    failures: HashMap<String, CommandFailure>,
}

/// Mock device source.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    state: Arc<Mutex<MockState>>,
}

impl MockSource {
    /// Create a mock listing the given records.
    #[must_use]
    pub fn new(devices: Vec<RawDevice>) -> Self {
        debug!(count = devices.len(), "Creating mock device source");
        let source = Self::default();
        source.lock().devices = devices;
        source
    }

    /// Create boards `BOARD-1..=BOARD-n` with the given enabled flags.
    #[must_use]
    pub fn with_boards(enabled: &[bool]) -> Self {
        let devices = enabled
            .iter()
            .enumerate()
            .map(|(i, &on)| {
                RawDevice::new(
                    format!("BOARD-{}", i + 1),
                    MOCK_DESCRIPTION,
                    if on { "Started" } else { "Disabled" },
                )
            })
            .collect();
        Self::new(devices)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    // === Configuration ===

    /// Replace the listed records.
    pub fn set_devices(&self, devices: Vec<RawDevice>) {
        self.lock().devices = devices;
    }

    /// Make the next listings fail until cleared.
    pub fn fail_listing(&self, reason: &str) {
        self.lock().list_error = Some(reason.to_string());
    }

    pub fn clear_listing_failure(&self) {
        self.lock().list_error = None;
    }

    /// Inject command failures for one device id.
    pub fn fail_commands(&self, id: &str, failure: CommandFailure) {
        self.lock().failures.insert(id.to_string(), failure);
    }

    // === Inspection ===

    /// Get all recorded operations.
    #[must_use]
    pub fn operations(&self) -> Vec<Operation> {
        self.lock().operation_log.clone()
    }

    /// Clear the operation log.
    pub fn clear_operations(&self) {
        self.lock().operation_log.clear();
    }

    /// Recorded device commands only, as `(action, id)`.
    #[must_use]
    pub fn commands(&self) -> Vec<(DeviceAction, String)> {
        self.lock()
            .operation_log
            .iter()
            .filter_map(|op| match op {
                Operation::Command { action, id } => Some((*action, id.clone())),
                Operation::List => None,
            })
            .collect()
    }

    /// Number of commands issued for a device.
    #[must_use]
    pub fn command_count(&self, action: DeviceAction, id: &str) -> usize {
        self.commands()
            .iter()
            .filter(|(a, i)| *a == action && i == id)
            .count()
    }

    /// Current raw status of a device.
    #[must_use]
    pub fn status(&self, id: &str) -> Option<String> {
        self.lock()
            .devices
            .iter()
            .find(|d| d.id == id)
            .map(|d| d.status.clone())
    }

    // === Assertions ===

    /// Assert the exact operation sequence.
    ///
    /// # Panics
    ///
    /// Panics if the recorded operations differ.
    pub fn assert_operations(&self, expected: &[Operation]) {
        let actual = self.operations();
        assert_eq!(actual, expected, "Operation log mismatch");
    }

    /// Assert that no device command was issued.
    ///
    /// # Panics
    ///
    /// Panics if any command was recorded.
    pub fn assert_no_commands(&self) {
        let commands = self.commands();
        assert!(commands.is_empty(), "Expected no commands, got {commands:?}");
    }
}

impl DeviceSource for MockSource {
    fn list_devices(&mut self) -> Result<Vec<RawDevice>> {
        let mut state = self.lock();
        state.operation_log.push(Operation::List);
        if let Some(reason) = &state.list_error {
            return Err(FleetError::Enumeration {
                reason: reason.clone(),
            });
        }
        trace!(count = state.devices.len(), "Mock listing");
        Ok(state.devices.clone())
    }

    fn run_device_command(&mut self, action: DeviceAction, id: &str) -> Result<()> {
        let mut state = self.lock();
        state.operation_log.push(Operation::Command {
            action,
            id: id.to_string(),
        });

        let fail = match state.failures.get_mut(id) {
            Some(CommandFailure::Always) => true,
            Some(CommandFailure::Times(0)) | None => false,
            Some(CommandFailure::Times(n)) => {
                *n -= 1;
                true
            }
        };
        if fail {
            return Err(FleetError::DeviceCommand {
                action: action.as_str().to_string(),
                id: id.to_string(),
                reason: "injected failure".to_string(),
            });
        }

        if let Some(device) = state.devices.iter_mut().find(|d| d.id == id) {
            device.status = match action {
                DeviceAction::Enable => "Started",
                DeviceAction::Disable => "Disabled",
            }
            .to_string();
        }
        Ok(())
    }
}

//! Registry of managed boards.
//!
//! Boards are addressed by index into the current set. The set is rebuilt
//! wholesale on every refresh, so an index is only meaningful until the
//! next [`Registry::refresh`].
//!
//! Enable and disable act on boards in an unknown state too, so isolation
//! can still silence them. Such boards are left out of snapshots and stay
//! in whatever state the run put them in.

use tracing::{debug, error, info, instrument, trace, warn};

use super::DeviceSource;
use super::info::{Device, DeviceAction, EnabledState, display_names};
use crate::config::{FleetConfig, RetryConfig};
use crate::error::{FleetError, Result};
use crate::state::Snapshot;

/// Boxed device source owned by the registry.
pub type BoxedSource = Box<dyn DeviceSource + Send>;

/// Owner of the current board set and its cached enabled states.
pub struct Registry {
    source: BoxedSource,
    devices: Vec<Device>,
    description: String,
    status_enabled: Vec<String>,
    status_disabled: Vec<String>,
    retries: RetryConfig,
}

impl Registry {
    /// Create an empty registry; call [`refresh`](Self::refresh) to populate it.
    #[must_use]
    pub fn new(source: BoxedSource, config: &FleetConfig) -> Self {
        Self {
            source,
            devices: Vec::new(),
            description: config.device_description.clone(),
            status_enabled: config.status_enabled.clone(),
            status_disabled: config.status_disabled.clone(),
            retries: config.retries,
        }
    }

    /// Re-enumerate devices and replace the board set.
    ///
    /// On failure the previous set is kept.
    #[instrument(skip(self), fields(description = %self.description))]
    pub fn refresh(&mut self) -> Result<()> {
        let listed = self.source.list_devices()?;
        let total = listed.len();

        let matching: Vec<_> = listed
            .into_iter()
            .filter(|raw| raw.description == self.description)
            .collect();
        let ids: Vec<&str> = matching.iter().map(|raw| raw.id.as_str()).collect();
        let names = display_names(&ids);

        let devices: Vec<Device> = matching
            .iter()
            .zip(names)
            .map(|(raw, display_name)| Device {
                id: raw.id.clone(),
                description: raw.description.clone(),
                status: raw.status.clone(),
                enabled: EnabledState::from_status(
                    &raw.status,
                    &self.status_enabled,
                    &self.status_disabled,
                ),
                display_name,
            })
            .collect();

        debug!(listed = total, boards = devices.len(), "Board set refreshed");
        for device in &devices {
            trace!(id = %device.id, name = %device.display_name, state = %device.enabled, "Board");
        }
        self.devices = devices;
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// All boards in enumeration order.
    #[must_use]
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    /// Board at `index`.
    pub fn device(&self, index: usize) -> Result<&Device> {
        self.devices
            .get(index)
            .ok_or(FleetError::InvalidDeviceIndex {
                index,
                count: self.devices.len(),
            })
    }

    pub fn id(&self, index: usize) -> Result<&str> {
        Ok(&self.device(index)?.id)
    }

    pub fn display_name(&self, index: usize) -> Result<&str> {
        Ok(&self.device(index)?.display_name)
    }

    pub fn is_enabled(&self, index: usize) -> Result<EnabledState> {
        Ok(self.device(index)?.enabled)
    }

    /// True unless some board is known to be disabled.
    #[must_use]
    pub fn all_enabled(&self) -> bool {
        self.devices
            .iter()
            .all(|d| d.enabled != EnabledState::Disabled)
    }

    /// True unless some board is known to be enabled.
    #[must_use]
    pub fn all_disabled(&self) -> bool {
        self.devices
            .iter()
            .all(|d| d.enabled != EnabledState::Enabled)
    }

    pub fn enable(&mut self, index: usize) -> Result<()> {
        self.apply(index, DeviceAction::Enable)
    }

    pub fn disable(&mut self, index: usize) -> Result<()> {
        self.apply(index, DeviceAction::Disable)
    }

    /// Flip a board, or set it to `state` when given.
    ///
    /// Boards in an unknown state are left alone.
    pub fn toggle(&mut self, index: usize, state: Option<bool>) -> Result<()> {
        let Some(current) = self.is_enabled(index)?.as_bool() else {
            debug!(index, "Board state unknown, not toggling");
            return Ok(());
        };
        if state.unwrap_or(!current) {
            self.enable(index)
        } else {
            self.disable(index)
        }
    }

    /// Capture the enabled flag of every board in a known state.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.devices
            .iter()
            .enumerate()
            .filter_map(|(index, d)| d.enabled.as_bool().map(|on| (index, on)))
            .collect()
    }

    /// Re-apply a snapshot in capture order.
    pub fn restore(&mut self, snapshot: &Snapshot) -> Result<()> {
        for entry in snapshot.entries() {
            if entry.index >= self.devices.len() {
                warn!(index = entry.index, "Board vanished since snapshot, skipping");
                continue;
            }
            self.toggle(entry.index, Some(entry.was_enabled))?;
        }
        Ok(())
    }

    /// Run the device manager command for one board with bounded retry.
    ///
    /// No-op when the board is already in the target state. When every
    /// attempt fails the cached state is still set to the target.
    fn apply(&mut self, index: usize, action: DeviceAction) -> Result<()> {
        let target = action.target();
        let device = self.device(index)?;
        if device.enabled == target {
            trace!(index, %target, "Board already in target state");
            return Ok(());
        }
        let id = device.id.clone();
        if device.enabled == EnabledState::Unknown {
            debug!(index, %id, %target, "Board state unknown, it will not be restored");
        }
        let attempts = match action {
            DeviceAction::Enable => self.retries.enable,
            DeviceAction::Disable => self.retries.disable,
        };

        let mut succeeded = false;
        for attempt in 1..=attempts {
            debug!(%id, action = action.as_str(), attempt, attempts, "Running device command");
            match self.source.run_device_command(action, &id) {
                Ok(()) => {
                    info!(%id, action = action.as_str(), attempt, "Device command succeeded");
                    succeeded = true;
                    break;
                }
                Err(err) => {
                    warn!(%id, action = action.as_str(), attempt, attempts, error = %err, "Device command failed");
                }
            }
        }
        if !succeeded {
            error!(%id, action = action.as_str(), attempts, "Giving up, assuming target state");
        }

        self.devices[index].enabled = target;
        Ok(())
    }
}

//! Board enumeration and enable/disable through the OS device manager.
//!
//! The device manager is reached through the [`DeviceSource`] trait so the
//! registry can be driven by the real command line or by a mock.

mod info;
pub mod mock;
mod real;
mod registry;

pub use info::{Device, DeviceAction, EnabledState, RawDevice, display_names};
pub use real::{CommandSource, RECORD_FIELDS, parse_listing};
pub use registry::{BoxedSource, Registry};

use crate::error::Result;

/// External device manager operations.
///
/// # Implementation Notes
///
/// - `list_devices` returns every connected device; filtering by
///   description happens in the registry
/// - `run_device_command` fails with `FleetError::DeviceCommand` on a
///   non-zero exit; retrying is the caller's job
pub trait DeviceSource {
    /// List connected devices.
    ///
    /// # Errors
    ///
    /// Returns `FleetError::Enumeration` if the listing command fails or
    /// its output is malformed.
    fn list_devices(&mut self) -> Result<Vec<RawDevice>>;

    /// Enable or disable one device by instance id.
    fn run_device_command(&mut self, action: DeviceAction, id: &str) -> Result<()>;
}

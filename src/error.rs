//! Error types for fleet operations.

use thiserror::Error;

/// Primary error type for fleet operations.
#[derive(Error, Debug)]
pub enum FleetError {
    // Device errors
    #[error("Device enumeration failed: {reason}")]
    Enumeration { reason: String },

    #[error("Failed to {action} device '{id}': {reason}")]
    DeviceCommand {
        action: String,
        id: String,
        reason: String,
    },

    /// `index` is 0-based; the message shows the board number.
    #[error("No board {}: {count} boards connected", .index + 1)]
    InvalidDeviceIndex { index: usize, count: usize },

    // Toolchain errors
    #[error("Toolchain session I/O error: {0}")]
    SessionIo(String),

    #[error("Toolchain session already closed")]
    SessionClosed,

    #[error("Bitstream path contains a double quote: {path}")]
    InvalidImagePath { path: String },

    // Run control
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Another operation is already running")]
    Busy,

    #[error("Failed to run script '{path}': {reason}")]
    Script { path: String, reason: String },

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl FleetError {
    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidDeviceIndex { .. }
                | Self::InvalidImagePath { .. }
                | Self::Busy
                | Self::ConfigNotFound { .. }
                | Self::ConfigParse(_)
                | Self::ConfigInvalid(_)
                | Self::Script { .. }
        )
    }

    /// Returns true if this error is the operator-requested abort signal.
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Enumeration { .. } => {
                Some("Check that the listing command works and the tool runs elevated")
            }
            Self::DeviceCommand { .. } => Some("Run the tool as administrator"),
            Self::InvalidDeviceIndex { .. } => Some("Run: fleet list"),
            Self::InvalidImagePath { .. } => Some("Rename the bitstream so its path has no '\"'"),
            Self::SessionIo(_) | Self::SessionClosed => {
                Some("Check the Vivado installation and that hw_server is reachable")
            }
            Self::Busy => Some("Wait for the current operation to finish"),
            Self::ConfigNotFound { .. } => Some("Run: fleet config to print the defaults"),
            Self::ConfigParse(_) | Self::ConfigInvalid(_) => {
                Some("Fix the file shown by: fleet config --path")
            }
            _ => None,
        }
    }
}

/// Convenience type alias for Results using FleetError.
pub type Result<T> = std::result::Result<T, FleetError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E: std::error::Error> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| FleetError::Other(format!("{}: {e}", f().into())))
    }
}

//! Device information types for managed boards.

use std::fmt;

use serde::Serialize;

/// Tri-state enabled flag of a board.
///
/// `Unknown` means the device manager reported a status matching neither
/// the enabled nor the disabled patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnabledState {
    Enabled,
    Disabled,
    Unknown,
}

impl EnabledState {
    /// Classify a raw status string against the locale patterns.
    #[must_use]
    pub fn from_status<S: AsRef<str>>(status: &str, enabled: &[S], disabled: &[S]) -> Self {
        if enabled.iter().any(|s| s.as_ref() == status) {
            Self::Enabled
        } else if disabled.iter().any(|s| s.as_ref() == status) {
            Self::Disabled
        } else {
            Self::Unknown
        }
    }

    /// `Some(true)` / `Some(false)` for known states, `None` for unknown.
    #[must_use]
    pub const fn as_bool(self) -> Option<bool> {
        match self {
            Self::Enabled => Some(true),
            Self::Disabled => Some(false),
            Self::Unknown => None,
        }
    }

    #[must_use]
    pub const fn is_known(self) -> bool {
        !matches!(self, Self::Unknown)
    }
}

impl From<bool> for EnabledState {
    fn from(enabled: bool) -> Self {
        if enabled { Self::Enabled } else { Self::Disabled }
    }
}

impl fmt::Display for EnabledState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Unknown => "unknown",
        })
    }
}

/// A device record as produced by the enumeration command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawDevice {
    /// Instance id (stable hardware path).
    pub id: String,
    /// Device class description.
    pub description: String,
    /// Raw status text, locale dependent.
    pub status: String,
}

impl RawDevice {
    pub fn new(id: impl Into<String>, description: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            status: status.into(),
        }
    }
}

/// A managed board in the current device set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Device {
    /// Instance id (stable hardware path).
    pub id: String,
    /// Device class description.
    pub description: String,
    /// Raw status text as last listed.
    pub status: String,
    /// Cached enabled state.
    pub enabled: EnabledState,
    /// Shortest distinguishing part of `id` across the current set.
    pub display_name: String,
}

/// Device manager operation on a single device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceAction {
    Enable,
    Disable,
}

impl DeviceAction {
    /// Target state after the action succeeds.
    #[must_use]
    pub const fn target(self) -> EnabledState {
        match self {
            Self::Enable => EnabledState::Enabled,
            Self::Disable => EnabledState::Disabled,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
        }
    }
}

/// Compute display names by stripping the prefix and suffix shared by all ids.
///
/// A single id is returned unchanged. If stripping would leave a name empty
/// (identical ids, or one id nested in another) that id is kept whole.
#[must_use]
pub fn display_names(ids: &[&str]) -> Vec<String> {
    if ids.len() <= 1 {
        return ids.iter().map(|id| (*id).to_string()).collect();
    }

    let chars: Vec<Vec<char>> = ids.iter().map(|id| id.chars().collect()).collect();
    let shortest = chars.iter().map(Vec::len).min().unwrap_or(0);

    let prefix = (0..shortest)
        .take_while(|&k| chars.iter().all(|c| c[k] == chars[0][k]))
        .count();
    let suffix = (0..shortest - prefix)
        .take_while(|&k| {
            let first = &chars[0];
            let expected = first[first.len() - 1 - k];
            chars.iter().all(|c| c[c.len() - 1 - k] == expected)
        })
        .count();

    chars
        .iter()
        .zip(ids)
        .map(|(c, id)| {
            let name: String = c[prefix..c.len() - suffix].iter().collect();
            if name.is_empty() { (*id).to_string() } else { name }
        })
        .collect()
}

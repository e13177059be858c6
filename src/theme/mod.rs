//! Theme system for human-mode output.

use console::Style;

use crate::device::EnabledState;

/// Visual theme for fleet human-mode output.
///
/// Centralizes styles for consistent rendering.
#[derive(Debug, Clone)]
pub struct FleetTheme {
    // Status colors
    pub accent: Style,
    pub success: Style,
    pub error: Style,
    pub warning: Style,
    pub muted: Style,

    // Component styles
    pub header: Style,
    pub label: Style,
    pub value: Style,
    pub board_number: Style,
    pub device_id: Style,
    pub enabled: Style,
    pub disabled: Style,
    pub unknown: Style,
}

impl FleetTheme {
    /// Style of an enabled-state badge.
    #[must_use]
    pub const fn state(&self, state: EnabledState) -> &Style {
        match state {
            EnabledState::Enabled => &self.enabled,
            EnabledState::Disabled => &self.disabled,
            EnabledState::Unknown => &self.unknown,
        }
    }
}

impl Default for FleetTheme {
    fn default() -> Self {
        Self {
            accent: Style::new().blue().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warning: Style::new().yellow().bold(),
            muted: Style::new().dim(),
            header: Style::new().blue().bold(),
            label: Style::new().dim(),
            value: Style::new().bold(),
            board_number: Style::new().yellow().bold(),
            device_id: Style::new().italic().dim(),
            enabled: Style::new().green(),
            disabled: Style::new().red(),
            unknown: Style::new().yellow().dim(),
        }
    }
}

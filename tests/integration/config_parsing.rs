//! Integration tests for configuration parsing.
//!
//! Tests verify config files on disk in both formats and that a loaded
//! configuration drives the command-backed device source.

use std::fs;

use tempfile::TempDir;

use fleet::config::{load_config, load_config_file, FleetConfig};
use fleet::error::FleetError;

fn write(dir: &TempDir, name: &str, text: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, text).unwrap();
    path
}

#[test]
fn toml_file_overrides_selected_fields() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "fleet.toml",
        r#"
device_description = "Digilent USB Device"
status_enabled = ["Started", "Gestartet"]
restore_on_failure = false

[toolchain]
path_pattern = "/opt/Xilinx/Vivado/*/bin/vivado"
hw_server_url = "TCP:lab-host:3121"
program_retries = 3
"#,
    );

    let config = load_config_file(&path).unwrap();
    assert_eq!(config.device_description, "Digilent USB Device");
    assert_eq!(config.status_enabled, ["Started", "Gestartet"]);
    assert!(!config.restore_on_failure);
    assert_eq!(config.toolchain.hw_server_url, "TCP:lab-host:3121");
    assert_eq!(config.toolchain.program_retries, 3);
    // Untouched sections keep their defaults
    assert_eq!(config.retries, FleetConfig::default().retries);
    assert_eq!(config.list_command, FleetConfig::default().list_command);
}

#[test]
fn yaml_file_is_detected_by_extension() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "fleet.yml",
        "refresh_interval_ms: 500\nretries:\n  enable: 2\n  disable: 4\n",
    );

    let config = load_config_file(&path).unwrap();
    assert_eq!(config.refresh_interval_ms, 500);
    assert_eq!(config.retries.enable, 2);
    assert_eq!(config.retries.disable, 4);
}

#[test]
fn explicit_path_is_reported_back() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "fleet.toml", "");

    let (config, source) = load_config(Some(&path)).unwrap();
    assert_eq!(config, FleetConfig::default());
    assert_eq!(source.as_deref(), Some(path.as_path()));
}

#[test]
fn unsupported_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "fleet.json", "{}");

    let err = load_config_file(&path).unwrap_err();
    assert!(matches!(err, FleetError::ConfigParse(ref msg) if msg.contains("fleet.json")));
    assert!(err.is_user_recoverable());
}

#[test]
fn template_without_placeholder_is_invalid() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "fleet.toml", "enable_command = \"pnputil /enable-device\"\n");

    let err = load_config_file(&path).unwrap_err();
    assert!(matches!(err, FleetError::ConfigInvalid(ref msg) if msg.contains("enable_command")));
    assert!(err.suggestion().is_some());
}

#[test]
fn written_defaults_load_back_unchanged() {
    let dir = TempDir::new().unwrap();
    let text = toml::to_string_pretty(&FleetConfig::default()).unwrap();
    let path = write(&dir, "fleet.toml", &text);

    assert_eq!(load_config_file(&path).unwrap(), FleetConfig::default());
}

#[cfg(unix)]
mod command_source {
    use fleet::config::load_config_file;
    use fleet::device::{CommandSource, EnabledState, Registry};

    use crate::common::fixtures::FleetFixture;

    fn registry(fixture: &FleetFixture) -> Registry {
        let config = load_config_file(&fixture.config_path()).unwrap();
        let mut registry = Registry::new(Box::new(CommandSource::new(&config)), &config);
        registry.refresh().unwrap();
        registry
    }

    #[test]
    fn fixture_config_lists_matching_boards() {
        let fixture = FleetFixture::with_boards(&[true, false, true]);
        let registry = registry(&fixture);

        assert_eq!(registry.len(), 3);
        let names: Vec<&str> = registry
            .devices()
            .iter()
            .map(|d| d.display_name.as_str())
            .collect();
        assert_eq!(names, ["1", "2", "3"]);
        assert_eq!(registry.is_enabled(1).unwrap(), EnabledState::Disabled);
    }

    #[test]
    fn failing_commands_still_reach_target_state() {
        let fixture = FleetFixture::with_boards(&[false]).with_failing_commands();
        let mut registry = registry(&fixture);

        registry.enable(0).unwrap();
        assert_eq!(registry.is_enabled(0).unwrap(), EnabledState::Enabled);
    }

    #[test]
    fn listing_change_is_picked_up_on_refresh() {
        let fixture = FleetFixture::with_boards(&[true]);
        let mut registry = registry(&fixture);
        assert_eq!(registry.len(), 1);

        fixture.write_listing(&crate::common::fixtures::board_listing(&[true, true]));
        registry.refresh().unwrap();
        assert_eq!(registry.len(), 2);
    }
}

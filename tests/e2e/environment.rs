//! Environment variable behavior end-to-end tests.

use crate::common::cli::{fleet, parse_json};
use crate::common::init_test_logging;

#[test]
fn fleet_format_env_sets_json_output() {
    init_test_logging();
    let output = fleet()
        .env("FLEET_FORMAT", "json")
        .arg("version")
        .assert()
        .success()
        .get_output()
        .clone();

    let json = parse_json(&output.stdout);
    assert!(json.get("version").is_some());
    assert!(json.get("git_sha").is_some());
}

#[test]
fn fleet_format_env_sets_compact_json() {
    init_test_logging();
    let output = fleet()
        .env("FLEET_FORMAT", "json-compact")
        .arg("version")
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim_end().lines().count(), 1, "Expected compact JSON single line");
    assert!(parse_json(&output.stdout).get("version").is_some());
}

#[test]
fn cli_format_flag_overrides_env() {
    init_test_logging();
    let output = fleet()
        .env("FLEET_FORMAT", "json")
        .args(["version", "--format=text"])
        .assert()
        .success()
        .get_output()
        .clone();

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        serde_json::from_str::<serde_json::Value>(stdout.trim()).is_err(),
        "--format=text should override FLEET_FORMAT=json"
    );
}

#[test]
fn missing_explicit_config_is_an_error() {
    init_test_logging();
    let output = fleet()
        .env("FLEET_CONFIG", "/nonexistent/fleet.toml")
        .args(["--robot", "config"])
        .assert()
        .failure()
        .code(1)
        .get_output()
        .clone();

    let json = parse_json(&output.stderr);
    assert_eq!(json["error"], true);
    assert!(json["message"].as_str().unwrap().contains("/nonexistent/fleet.toml"));
}

#[cfg(unix)]
#[test]
fn fleet_description_env_selects_other_boards() {
    use crate::common::fixtures::FleetFixture;

    init_test_logging();
    let fixture = FleetFixture::with_boards(&[true, false]);
    let output = fleet()
        .env("FLEET_CONFIG", fixture.config_path())
        .env("FLEET_DESCRIPTION", "USB Root Hub (USB 3.0)")
        .args(["--robot", "list"])
        .assert()
        .success()
        .get_output()
        .clone();

    let json = parse_json(&output.stdout);
    let boards = json.as_array().unwrap();
    assert_eq!(boards.len(), 1);
    assert_eq!(boards[0]["id"], "USB\\ROOT_HUB30\\4&1A2B");
}

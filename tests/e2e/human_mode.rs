//! Human-mode output end-to-end tests.

use predicates::prelude::*;

use crate::common::cli::{fleet, fleet_with};
use crate::common::fixtures::FleetFixture;
use crate::common::init_test_logging;

#[test]
fn quick_start_without_command() {
    init_test_logging();
    fleet()
        .assert()
        .success()
        .stdout(predicate::str::contains("QUICK START"))
        .stdout(predicate::str::contains("fleet enable-only 1"));
}

#[test]
fn list_shows_numbered_boards_with_state() {
    init_test_logging();
    let fixture = FleetFixture::with_boards(&[true, false]);
    fleet_with(&fixture)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("Boards:"))
        .stdout(predicate::str::contains(" 1. 1  enabled"))
        .stdout(predicate::str::contains(" 2. 2  disabled"))
        .stdout(predicate::str::contains("ROOT_HUB").not());
}

#[test]
fn list_long_shows_instance_ids() {
    init_test_logging();
    let fixture = FleetFixture::with_boards(&[true]);
    fleet_with(&fixture)
        .args(["list", "--long"])
        .assert()
        .success()
        .stdout(predicate::str::contains("USB\\VID_0403&PID_6010\\210251A"))
        .stdout(predicate::str::contains("(Started)"));
}

#[test]
fn list_without_boards_warns() {
    init_test_logging();
    let fixture = FleetFixture::with_boards(&[]);
    fleet_with(&fixture)
        .arg("list")
        .assert()
        .success()
        .stderr(predicate::str::contains("No boards found"));
}

#[test]
fn enable_all_reports_completion() {
    init_test_logging();
    let fixture = FleetFixture::with_boards(&[false, false]);
    fleet_with(&fixture)
        .args(["--quiet", "enable-all"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[OK] Enable all finished: 2 steps"));
}

#[test]
fn failing_device_commands_still_complete() {
    init_test_logging();
    let fixture = FleetFixture::with_boards(&[false]).with_failing_commands();
    fleet_with(&fixture)
        .args(["--quiet", "toggle", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Toggle board 1 finished"));
}

#[test]
fn out_of_range_board_is_rejected() {
    init_test_logging();
    let fixture = FleetFixture::with_boards(&[true, true]);
    fleet_with(&fixture)
        .args(["toggle", "9"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("No board 9: 2 boards connected"));
}

#[test]
fn board_zero_is_a_usage_error() {
    init_test_logging();
    let fixture = FleetFixture::with_boards(&[true]);
    fleet_with(&fixture)
        .args(["toggle", "0"])
        .assert()
        .failure()
        .code(2);
}

#[test]
fn toolchain_reports_missing_installation() {
    init_test_logging();
    let fixture = FleetFixture::with_boards(&[true]);
    fleet_with(&fixture)
        .arg("toolchain")
        .assert()
        .success()
        .stdout(predicate::str::contains("not found"))
        .stdout(predicate::str::contains("no-vivado"));
}

#[test]
fn config_shows_source_file() {
    init_test_logging();
    let fixture = FleetFixture::with_boards(&[true]);
    fleet_with(&fixture)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("fleet.toml"))
        .stdout(predicate::str::contains("refresh_interval_ms = 50"));
}

#[test]
fn broken_listing_is_reported() {
    init_test_logging();
    let fixture = FleetFixture::with_boards(&[true]);
    fixture.write_listing("Banner\n\nInstance ID: A\nStatus: Started\n");
    fleet_with(&fixture)
        .arg("list")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Device enumeration failed"));
}

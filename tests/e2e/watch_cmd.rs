//! E2E tests for the watch command behavior.

use std::time::{Duration, Instant};

use predicates::prelude::*;

use crate::common::cli::{fleet_with, parse_json_lines};
use crate::common::fixtures::FleetFixture;
use crate::common::init_test_logging;

#[test]
fn watch_count_stops_after_listings() {
    init_test_logging();
    let fixture = FleetFixture::with_boards(&[true, false]);

    let start = Instant::now();
    let output = fleet_with(&fixture)
        .args(["--format=json-compact", "watch", "--count", "3", "--interval", "20"])
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .get_output()
        .clone();
    let elapsed = start.elapsed();

    assert!(
        elapsed < Duration::from_secs(5),
        "watch --count=3 should exit quickly (elapsed: {elapsed:?})"
    );
    let listings = parse_json_lines(&output.stdout);
    assert_eq!(listings.len(), 3);
    for listing in &listings {
        assert_eq!(listing.as_array().unwrap().len(), 2);
    }
}

#[test]
fn watch_keeps_going_when_refresh_fails() {
    init_test_logging();
    let fixture = FleetFixture::with_boards(&[true]);
    fixture.write_listing("Banner\n\nInstance ID: A\n");

    let output = fleet_with(&fixture)
        .args(["--format=json-compact", "watch", "-n", "2", "-i", "10"])
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .get_output()
        .clone();

    assert!(output.stdout.is_empty());
}

#[test]
fn human_watch_announces_itself() {
    init_test_logging();
    let fixture = FleetFixture::with_boards(&[false]);

    fleet_with(&fixture)
        .args(["watch", "--count", "1"])
        .timeout(Duration::from_secs(10))
        .assert()
        .success()
        .stdout(predicate::str::contains("Watching boards"))
        .stdout(predicate::str::contains("disabled"));
}

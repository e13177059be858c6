//! Test fixture helpers for creating temporary test data.
//!
//! A [`FleetFixture`] is a temporary directory holding a device listing in
//! `pnputil` format, a config file whose commands read that listing, and
//! any operator scripts a test needs. Everything is removed on drop.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Description of managed boards in fixtures.
pub const BOARD_DESCRIPTION: &str = "USB Serial Converter A";

/// Render a device listing the way `pnputil /enum-devices` prints it.
///
/// Each entry is `(instance id, description, status)`.
#[must_use]
pub fn pnputil_listing(devices: &[(&str, &str, &str)]) -> String {
    let mut text = String::from("Microsoft PnP Utility\r\n\r\n");
    for (id, description, status) in devices {
        let _ = write!(
            text,
            "Instance ID:                {id}\r\n\
             Device Description:         {description}\r\n\
             Class Name:                 USB\r\n\
             Class GUID:                 {{36fc9e60-c465-11cf-8056-444553540000}}\r\n\
             Manufacturer Name:          FTDI\r\n\
             Status:                     {status}\r\n\r\n"
        );
    }
    text
}

/// Listing with `enabled.len()` FTDI boards plus one unrelated hub.
#[must_use]
pub fn board_listing(enabled: &[bool]) -> String {
    let ids: Vec<String> = (1..=enabled.len())
        .map(|i| format!("USB\\VID_0403&PID_6010\\21025{i}A"))
        .collect();
    let mut devices: Vec<(&str, &str, &str)> = ids
        .iter()
        .zip(enabled)
        .map(|(id, &on)| {
            (
                id.as_str(),
                BOARD_DESCRIPTION,
                if on { "Started" } else { "Disabled" },
            )
        })
        .collect();
    devices.insert(1.min(devices.len()), ("USB\\ROOT_HUB30\\4&1A2B", "USB Root Hub (USB 3.0)", "Started"));
    pnputil_listing(&devices)
}

/// Temporary fleet environment with automatic cleanup.
pub struct FleetFixture {
    pub dir: TempDir,
    enable_command: String,
    disable_command: String,
    retries: u32,
}

impl FleetFixture {
    /// Fixture whose device manager lists the given boards.
    ///
    /// # Panics
    ///
    /// Panics if the temporary files cannot be written.
    #[must_use]
    pub fn with_boards(enabled: &[bool]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let fixture = Self {
            dir,
            enable_command: "true {id}".to_string(),
            disable_command: "true {id}".to_string(),
            retries: 3,
        };
        fixture.write_listing(&board_listing(enabled));
        fixture.write_config();
        fixture
    }

    /// Make every enable/disable command fail.
    #[must_use]
    pub fn with_failing_commands(mut self) -> Self {
        self.enable_command = "false {id}".to_string();
        self.disable_command = "false {id}".to_string();
        self.write_config();
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    #[must_use]
    pub fn config_path(&self) -> PathBuf {
        self.path().join("fleet.toml")
    }

    #[must_use]
    pub fn listing_path(&self) -> PathBuf {
        self.path().join("listing.txt")
    }

    /// Replace the listed devices.
    ///
    /// # Panics
    ///
    /// Panics if the listing cannot be written.
    pub fn write_listing(&self, listing: &str) {
        fs::write(self.listing_path(), listing).expect("Failed to write listing");
    }

    fn write_config(&self) {
        let config = format!(
            "device_description = \"{BOARD_DESCRIPTION}\"\n\
             list_command = \"cat {listing}\"\n\
             enable_command = \"{enable}\"\n\
             disable_command = \"{disable}\"\n\
             refresh_interval_ms = 50\n\
             \n\
             [retries]\n\
             enable = {retries}\n\
             disable = {retries}\n\
             \n\
             [toolchain]\n\
             path_pattern = \"{dir}/no-vivado/*/vivado\"\n\
             shell = \"sh\"\n",
            listing = self.listing_path().display(),
            enable = self.enable_command,
            disable = self.disable_command,
            retries = self.retries,
            dir = self.path().display(),
        );
        fs::write(self.config_path(), config).expect("Failed to write config");
    }

    /// Create an executable `sh` script with the given body.
    ///
    /// # Panics
    ///
    /// Panics if the script cannot be written.
    #[cfg(unix)]
    #[must_use]
    pub fn script(&self, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;

        let path = self.path().join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("Failed to write script");
        let mut perms = fs::metadata(&path).expect("script metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("Failed to chmod script");
        path
    }

    /// Create an executable script that appends `tag` to `runs.log`.
    #[cfg(unix)]
    #[must_use]
    pub fn logging_script(&self, name: &str, tag: &str) -> PathBuf {
        let body = format!("echo {tag} >> \"{}\"", self.run_log_path().display());
        self.script(name, &body)
    }

    #[must_use]
    pub fn run_log_path(&self) -> PathBuf {
        self.path().join("runs.log")
    }

    /// Lines appended by logging scripts so far.
    #[must_use]
    pub fn run_log(&self) -> Vec<String> {
        fs::read_to_string(self.run_log_path())
            .map(|text| text.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

//! Filesystem locations used by the fleet tool.

use std::path::PathBuf;

use tracing::trace;

/// Application directory name under the platform config directory.
pub const APP_DIR: &str = "fleet";

/// Default config file name.
pub const CONFIG_FILE: &str = "config.toml";

/// Per-user configuration file (`<config_dir>/fleet/config.toml`).
///
/// Returns `None` when the platform has no config directory.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    let path = dirs::config_dir()?.join(APP_DIR).join(CONFIG_FILE);
    trace!(path = %path.display(), "Default config path");
    Some(path)
}

//! Configuration for the fleet tool.
//!
//! Static settings only: the device description to match, the device
//! manager command templates, retry bounds and the toolchain location.
//! Loaded from TOML or YAML; missing fields fall back to defaults.

mod loader;
mod path;
mod schema;

pub use loader::{ConfigFormat, load_config, load_config_file, parse_config};
pub use path::{APP_DIR, CONFIG_FILE, default_config_path};
pub use schema::{FleetConfig, ID_PLACEHOLDER, RetryConfig, ToolchainConfig};

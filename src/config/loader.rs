//! Loading the fleet configuration from TOML or YAML files.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, trace};

use super::path::default_config_path;
use super::schema::FleetConfig;
use crate::error::{FleetError, Result, ResultExt};

/// Configuration file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format (.yaml, .yml).
    Yaml,
    /// TOML format (.toml).
    Toml,
}

impl ConfigFormat {
    /// Detect format from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    #[must_use]
    pub fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?;
        trace!(extension = %ext, "Detecting config format from extension");
        match ext.to_lowercase().as_str() {
            "yaml" | "yml" => Some(Self::Yaml),
            "toml" => Some(Self::Toml),
            _ => None,
        }
    }
}

/// Parse configuration text in the given format and validate it.
pub fn parse_config(text: &str, format: ConfigFormat) -> Result<FleetConfig> {
    let config: FleetConfig = match format {
        ConfigFormat::Toml => {
            toml::from_str(text).map_err(|e| FleetError::ConfigParse(e.to_string()))?
        }
        ConfigFormat::Yaml => {
            serde_yaml::from_str(text).map_err(|e| FleetError::ConfigParse(e.to_string()))?
        }
    };
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file, detecting the format from its extension.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load_config_file(path: &Path) -> Result<FleetConfig> {
    if !path.exists() {
        return Err(FleetError::ConfigNotFound {
            path: path.display().to_string(),
        });
    }

    let format = ConfigFormat::from_extension(path).ok_or_else(|| {
        FleetError::ConfigParse(format!(
            "Unsupported config extension (expected .toml, .yaml or .yml): {}",
            path.display()
        ))
    })?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read {}", path.display()))?;
    let config = parse_config(&text, format)?;
    info!(?format, "Loaded configuration");
    Ok(config)
}

/// Resolve the effective configuration.
///
/// An explicit path must exist. Without one, the per-user default file is
/// used when present, otherwise built-in defaults apply.
pub fn load_config(explicit: Option<&Path>) -> Result<(FleetConfig, Option<PathBuf>)> {
    if let Some(path) = explicit {
        return Ok((load_config_file(path)?, Some(path.to_path_buf())));
    }

    match default_config_path() {
        Some(path) if path.exists() => {
            let config = load_config_file(&path)?;
            Ok((config, Some(path)))
        }
        _ => {
            debug!("No config file found, using defaults");
            Ok((FleetConfig::default(), None))
        }
    }
}

//! Locating a Vivado installation.

use std::path::PathBuf;

use tracing::{debug, warn};

/// Resolve a version glob to the highest sorted match.
///
/// Returns `None` when nothing matches or the pattern is invalid; a missing
/// toolchain is not an error, programming steps are simply unavailable.
#[must_use]
pub fn discover_installation(pattern: &str) -> Option<PathBuf> {
    let entries = match glob::glob(pattern) {
        Ok(entries) => entries,
        Err(err) => {
            warn!(%pattern, error = %err, "Invalid toolchain path pattern");
            return None;
        }
    };

    let mut matches: Vec<PathBuf> = entries.filter_map(Result::ok).collect();
    matches.sort();
    let found = matches.pop();
    debug!(%pattern, found = ?found, "Toolchain discovery");
    found
}

//! Path resolution helpers for the configuration file and image arguments.
//!
//! Supports absolute paths, relative paths and "~" home directory expansion.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{Result, ScdkError};

/// Directory name used under the platform config directory.
pub const APP_DIR: &str = "screamdeck";
/// File name of the configuration file.
pub const CONFIG_FILE: &str = "config.toml";

/// Expand a leading `~` to the home directory; other paths are returned as-is.
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    trace!(path = %path.display(), "Resolving path");

    let path_str = path.to_string_lossy();
    if path_str == "~" || path_str.starts_with("~/") {
        let home = home_dir()?;
        let rest = path_str.strip_prefix("~/").unwrap_or("");
        let resolved = if rest.is_empty() {
            home
        } else {
            home.join(rest)
        };
        debug!(
            original = %path.display(),
            resolved = %resolved.display(),
            "Expanded home directory path"
        );
        return Ok(resolved);
    }

    Ok(path.to_path_buf())
}

/// Resolve the user's home directory (cross-platform).
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .ok_or_else(|| ScdkError::ConfigParse("Could not determine home directory".to_string()))
}

/// Default location of the configuration file, if the platform has one.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

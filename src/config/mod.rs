//! Configuration file handling.
//!
//! The configuration is a small TOML file:
//!
//! ```toml
//! quality = 80
//! input_timeout_ms = 100
//! serial = "CL12K1A00042"
//! brightness = 60
//! ```
//!
//! Every key is optional. Command-line flags and environment variables
//! override values read from the file.

mod path;

pub use path::{APP_DIR, CONFIG_FILE, default_config_path, expand_home, home_dir};

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::codec::DEFAULT_QUALITY;
use crate::error::{Result, ScdkError};
use crate::session::SessionOptions;

const fn default_quality() -> u8 {
    DEFAULT_QUALITY
}

const fn default_input_timeout_ms() -> u64 {
    100
}

/// Effective runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// JPEG quality for key tiles (0-100).
    #[serde(default = "default_quality")]
    pub quality: u8,

    /// How long a single key-state read waits for input.
    #[serde(default = "default_input_timeout_ms")]
    pub input_timeout_ms: u64,

    /// Serial number of the device to open.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serial: Option<String>,

    /// Brightness applied right after the device is opened.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            quality: default_quality(),
            input_timeout_ms: default_input_timeout_ms(),
            serial: None,
            brightness: None,
        }
    }
}

impl Config {
    /// Session options derived from this configuration.
    pub const fn session_options(&self) -> SessionOptions {
        SessionOptions {
            quality: self.quality,
        }
    }

    /// Input read timeout.
    pub const fn input_timeout(&self) -> Duration {
        Duration::from_millis(self.input_timeout_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(ScdkError::ConfigParse(format!(
                "quality must be 0-100, got {}",
                self.quality
            )));
        }
        if let Some(level) = self.brightness.filter(|&b| b > 100) {
            return Err(ScdkError::ConfigParse(format!(
                "brightness must be 0-100, got {level}"
            )));
        }
        Ok(())
    }
}

/// Parse configuration from TOML text.
pub fn load_config_from_str(content: &str) -> Result<Config> {
    trace!("Parsing config content");
    let config: Config =
        toml::from_str(content).map_err(|e| ScdkError::ConfigParse(format!("TOML: {e}")))?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from a file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = expand_home(path.as_ref())?;
    debug!(path = %path.display(), "Loading configuration file");

    let content = std::fs::read_to_string(&path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ScdkError::ConfigNotFound {
                path: path.display().to_string(),
            }
        } else {
            ScdkError::Io(e)
        }
    })?;

    load_config_from_str(&content)
}

/// Load the effective configuration.
///
/// An explicit path must exist. Without one, the default location is used
/// when present and built-in defaults otherwise.
pub fn load_effective(explicit: Option<&Path>) -> Result<Config> {
    if let Some(path) = explicit {
        return load_config(path);
    }

    match default_config_path() {
        Some(path) if path.is_file() => load_config(path),
        _ => {
            debug!("No configuration file, using defaults");
            Ok(Config::default())
        }
    }
}

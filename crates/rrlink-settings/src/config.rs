//! Configuration file handling for rrlink
//!
//! Supports JSON and TOML files. The default location is
//! `<platform config dir>/rrlink/config.toml`.
//!
//! ```toml
//! [device]
//! dialect = "fived"
//! port = "auto"
//! baud_rate = 115200
//! resend_cache_size = 64
//! default_feedrate = 1500
//! command_queue_size = 16
//! ```

use crate::error::{SettingsError, SettingsResult};
use rrlink_communication::{guess_device, DeviceConfig};
use rrlink_core::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_COMMAND_QUEUE_SIZE, DEFAULT_FEEDRATE, DEFAULT_RESEND_CACHE_SIZE,
};
use rrlink_core::Dialect;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Port value that asks for the port to be guessed at connect time.
pub const AUTO_PORT: &str = "auto";

/// Device settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Firmware dialect
    pub dialect: Dialect,
    /// Serial port path, or `"auto"`
    pub port: String,
    /// Serial speed
    pub baud_rate: u32,
    /// Lines kept for resend requests
    pub resend_cache_size: usize,
    /// Feedrate injected into feed moves without one (5D)
    pub default_feedrate: u32,
    /// Queue depth below which the sender keeps feeding blocks
    pub command_queue_size: usize,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            port: AUTO_PORT.to_string(),
            baud_rate: DEFAULT_BAUD_RATE,
            resend_cache_size: DEFAULT_RESEND_CACHE_SIZE,
            default_feedrate: DEFAULT_FEEDRATE,
            command_queue_size: DEFAULT_COMMAND_QUEUE_SIZE,
        }
    }
}

impl DeviceSettings {
    /// Engine configuration for these settings
    pub fn device_config(&self) -> DeviceConfig {
        DeviceConfig {
            dialect: self.dialect,
            resend_cache_size: self.resend_cache_size,
            default_feedrate: self.default_feedrate,
            command_queue_size: self.command_queue_size,
        }
    }

    /// Port to open, guessing one when set to `"auto"`
    pub fn resolve_port(&self) -> Option<String> {
        if self.port.eq_ignore_ascii_case(AUTO_PORT) {
            let guessed = guess_device();
            tracing::debug!("Guessed serial port: {:?}", guessed);
            guessed
        } else {
            Some(self.port.clone())
        }
    }

    fn validate(&self) -> SettingsResult<()> {
        if self.port.trim().is_empty() {
            return Err(SettingsError::invalid("device.port", "must not be empty"));
        }
        if self.baud_rate == 0 {
            return Err(SettingsError::invalid("device.baud_rate", "must be > 0"));
        }
        if self.default_feedrate == 0 {
            return Err(SettingsError::invalid("device.default_feedrate", "must be > 0"));
        }
        if self.command_queue_size == 0 {
            return Err(SettingsError::invalid("device.command_queue_size", "must be > 0"));
        }
        Ok(())
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Device settings
    pub device: DeviceSettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform default config file path
    pub fn default_path() -> SettingsResult<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("rrlink").join("config.toml"))
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no config directory on this platform".to_string())
            })
    }

    /// Load from the default path, falling back to defaults if the file is absent
    pub fn load_or_default() -> SettingsResult<Self> {
        let path = Self::default_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = match Format::of(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Save config to file (JSON or TOML), creating parent directories
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| SettingsError::ConfigDirectory(format!("{}: {}", parent.display(), e)))?;
        }
        std::fs::write(path, content)?;
        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> SettingsResult<()> {
        self.device.validate()
    }
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            other => Err(SettingsError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

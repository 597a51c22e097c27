//! Configuration file support for ttybridge.
//!
//! Configuration is loaded from multiple sources with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (TTYBRIDGE_*)
//! 3. `--config PATH`, or the local config file (./ttybridge.toml)
//! 4. Global config file (~/.config/ttybridge/config.toml)
//!
//! Implicit files that fail to load are skipped with a warning. A file named
//! with `--config` must load.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Device path used when nothing else names one.
pub const DEFAULT_DEVICE: &str = "/dev/ttyS1";

/// Baud rate used when nothing else names one.
pub const DEFAULT_BAUD: u32 = 115200;

/// Default raw print-share TCP port.
pub const DEFAULT_SHARE_PORT: u16 = 9100;

/// Serial line configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Printer device node (e.g., "/dev/ttyS1" or "/dev/ttyUSB0").
    pub device: Option<String>,
    /// Nominal baud rate.
    pub baud: Option<u32>,
    /// Refuse unsupported baud rates instead of falling back to 115200.
    #[serde(default)]
    pub strict_baud: bool,
}

/// Raw TCP share configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShareConfig {
    /// Address to bind.
    pub bind: Option<String>,
    /// TCP port to listen on.
    pub port: Option<u16>,
    /// Announce the share over mDNS.
    #[serde(default)]
    pub advertise: bool,
    /// Advertised service instance name.
    pub name: Option<String>,
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Serial configuration.
    #[serde(default)]
    pub serial: SerialConfig,
    /// Share configuration.
    #[serde(default)]
    pub share: ShareConfig,
}

impl Config {
    /// Load configuration from the global and local files.
    pub fn load() -> Self {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_from_file(&global_path) {
                debug!("Loaded global config from {}", global_path.display());
                config.merge(global_config);
            }
        }

        // Local config overrides global
        if let Some(local_config) = Self::load_from_file(Path::new("ttybridge.toml")) {
            debug!("Loaded local config from ttybridge.toml");
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file path (--config flag).
    ///
    /// Unlike the implicit files, a missing or malformed file is an error.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn load_from_file(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }

        match fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => Some(config),
                Err(e) => {
                    warn!("Failed to parse config file {}: {}", path.display(), e);
                    None
                },
            },
            Err(e) => {
                warn!("Failed to read config file {}: {}", path.display(), e);
                None
            },
        }
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "ttybridge").map(|dirs| dirs.config_dir().to_path_buf())
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one.
    fn merge(&mut self, other: Self) {
        if other.serial.device.is_some() {
            self.serial.device = other.serial.device;
        }
        if other.serial.baud.is_some() {
            self.serial.baud = other.serial.baud;
        }
        if other.serial.strict_baud {
            self.serial.strict_baud = true;
        }

        if other.share.bind.is_some() {
            self.share.bind = other.share.bind;
        }
        if other.share.port.is_some() {
            self.share.port = other.share.port;
        }
        if other.share.advertise {
            self.share.advertise = true;
        }
        if other.share.name.is_some() {
            self.share.name = other.share.name;
        }
    }

    /// Device path, falling back to [`DEFAULT_DEVICE`].
    pub fn device(&self) -> &str {
        self.serial
            .device
            .as_deref()
            .unwrap_or(DEFAULT_DEVICE)
    }

    /// Baud rate, falling back to [`DEFAULT_BAUD`].
    pub fn baud(&self) -> u32 {
        self.serial
            .baud
            .unwrap_or(DEFAULT_BAUD)
    }

    /// Share listen address, falling back to `0.0.0.0:9100`.
    pub fn share_addr(&self) -> String {
        format!(
            "{}:{}",
            self.share
                .bind
                .as_deref()
                .unwrap_or("0.0.0.0"),
            self.share
                .port
                .unwrap_or(DEFAULT_SHARE_PORT)
        )
    }
}

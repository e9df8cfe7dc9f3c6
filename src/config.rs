//! TOML configuration.
//!
//! ```toml
//! [logging]
//! level = "info"
//!
//! [session]
//! pairing_rate_hz = 15
//! reconnect_delay_ms = 500
//! max_reconnect_attempts = 2
//!
//! [[controllers]]
//! kind = "pro_controller"
//! body_color = "#828282"
//! button_color = "#0F0F0F"
//! adapter_path = "/org/bluez/hci0"
//! reconnect_address = "7C:BB:8A:01:02:03"
//! ```

use crate::controller::{Color, ControllerType};
use crate::session::SessionSettings;
use crate::transport::BdAddr;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const CONFIG_DIR: &str = "switchcon";
const CONFIG_FILE: &str = "config.toml";
pub const CONFIG_ENV: &str = "SWITCHCON_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive, `RUST_LOG` wins when set.
    pub level: String,
    pub ansi_colors: bool,
    pub show_target: bool,
    pub show_thread_ids: bool,
    pub show_file_line: bool,
    pub file_logging_enabled: bool,
    pub log_dir: PathBuf,
    pub file_name_prefix: String,
    /// `minutely`, `hourly`, `daily` or `never`.
    pub rotation: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            ansi_colors: true,
            show_target: false,
            show_thread_ids: true,
            show_file_line: false,
            file_logging_enabled: false,
            log_dir: PathBuf::from("logs"),
            file_name_prefix: "switchcon.log".to_string(),
            rotation: "daily".to_string(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SessionConfig {
    pub pairing_rate_hz: u32,
    pub reconnect_delay_ms: u64,
    pub max_reconnect_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pairing_rate_hz: 15,
            reconnect_delay_ms: 500,
            max_reconnect_attempts: 2,
        }
    }
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        let rate = u64::from(config.pairing_rate_hz.max(1));
        Self {
            pairing_interval: Duration::from_nanos(1_000_000_000 / rate),
            reconnect_delay: Duration::from_millis(config.reconnect_delay_ms),
            max_reconnect_attempts: config.max_reconnect_attempts,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct ControllerConfig {
    pub kind: ControllerType,
    pub body_color: Option<Color>,
    pub button_color: Option<Color>,
    /// BlueZ object path of the adapter, e.g. `/org/bluez/hci0`.
    pub adapter_path: String,
    /// Console to reconnect to instead of waiting for a new pairing.
    pub reconnect_address: Option<BdAddr>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            kind: ControllerType::ProController,
            body_color: None,
            button_color: None,
            adapter_path: "/org/bluez/hci0".to_string(),
            reconnect_address: None,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LogSettings,
    pub session: SessionConfig,
    pub controllers: Vec<ControllerConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            logging: LogSettings::default(),
            session: SessionConfig::default(),
            controllers: vec![ControllerConfig::default()],
        }
    }
}

impl AppConfig {
    /// `dirs::config_dir()/switchcon/config.toml`, or the working directory
    /// when the platform has no config dir.
    pub fn default_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| {
            warn!("Could not determine config directory, using current directory");
            PathBuf::from(".")
        });
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        path
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Loads `path`, writing the defaults there first if it does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            return Self::load(path);
        }
        info!("No config at {}, creating defaults", path.display());
        let config = Self::default();
        config.save(path)?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        fs::write(path, content).map_err(io_error)?;
        debug!("Saved config to {}", path.display());
        Ok(())
    }
}

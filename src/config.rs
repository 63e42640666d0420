//! Application configuration: receiver address, pacing and input tuning.
//!
//! The config lives in a single toml file under the user's home directory.
//! A missing file is not an error, defaults are used and a template is
//! written so there is something to edit for the next run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::control::InputSettings;

const CONFIG_DIR: &str = ".config/steerlink";
const CONFIG_FILE: &str = "config.toml";

// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config file: {0}")]
    ParseError(String),

    #[error("Failed to write config file: {0}")]
    WriteError(String),
}

/// Where the link goes and how fast it talks.
///
/// Fields left out of the file keep their defaults, so a config can override
/// just the host.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LinkConfig {
    /// Receiver host name or address
    pub host: String,
    /// Receiver TCP port
    pub port: u16,
    /// Give up on the connect attempt after this many milliseconds
    pub connect_timeout_ms: u64,
    /// Target spacing between frames
    pub tick_interval_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host: "192.168.1.29".to_string(), // receiver on the local network
            port: 65433,
            connect_timeout_ms: 5000,
            tick_interval_ms: 20,
        }
    }
}

/// Top-level config file contents.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub input: InputSettings,
}

impl AppConfig {
    /// Loads the config from `path`, falling back to defaults when the file
    /// does not exist yet.
    ///
    /// A zero tick interval is rejected here, the transmit timer cannot run
    /// with it.
    pub async fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => {
                let config: Self = toml::from_str(&content)
                    .map_err(|e| ConfigError::ParseError(e.to_string()))?;
                if config.link.tick_interval_ms == 0 {
                    return Err(ConfigError::ParseError(
                        "tick_interval_ms must be at least 1".to_string(),
                    ));
                }
                info!("Loaded config from {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config file {} not found, using defaults", path.display());
                let config = Self::default();
                if let Err(e) = config.save(path).await {
                    warn!("Could not write default config: {}", e);
                }
                Ok(config)
            }
            Err(e) => Err(ConfigError::ReadError(e.to_string())),
        }
    }

    /// Writes the config to `path`, creating parent directories as needed.
    pub async fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        info!("Wrote config to {}", path.display());
        Ok(())
    }
}

/// Default config location, `~/.config/steerlink/config.toml`.
pub fn default_config_path() -> PathBuf {
    let mut path = get_home_dir();
    path.push(CONFIG_DIR);
    path.push(CONFIG_FILE);
    path
}

fn get_home_dir() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| {
        warn!("Could not determine home directory, using current directory");
        PathBuf::from(".")
    })
}

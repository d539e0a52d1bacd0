//! Configuration loading and management

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::DEFAULT_REGISTER_PATH;

/// Environment variable supplying the backend base URL.
pub const API_URL_ENV: &str = "NOTES_API_URL";

const CONFIG_FILE: &str = "config.json";
const STORAGE_FILE: &str = "storage.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to access {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("No backend URL configured (set NOTES_API_URL or api_url in config.json)")]
    MissingApiUrl,
}

/// Client configuration, stored as `config.json` in the state directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Backend base URL. `NOTES_API_URL` takes precedence.
    #[serde(default)]
    pub api_url: Option<String>,

    /// Path of the account registration endpoint
    #[serde(default = "default_register_path")]
    pub register_path: String,
}

fn default_register_path() -> String {
    DEFAULT_REGISTER_PATH.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            register_path: default_register_path(),
        }
    }
}

impl Config {
    /// Load configuration from the state directory, writing a default
    /// `config.json` there if none exists yet.
    pub fn load(state_dir: &Path) -> Result<Self, ConfigError> {
        let config_file = state_dir.join(CONFIG_FILE);

        if config_file.exists() {
            let content = std::fs::read_to_string(&config_file).map_err(|source| ConfigError::Io {
                path: config_file.clone(),
                source,
            })?;
            let config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: config_file.clone(),
                source,
            })?;
            tracing::debug!("Loaded configuration from {:?}", config_file);
            Ok(config)
        } else {
            let config = Config::default();

            std::fs::create_dir_all(state_dir).map_err(|source| ConfigError::Io {
                path: state_dir.to_path_buf(),
                source,
            })?;
            let content = serde_json::to_string_pretty(&config).map_err(|source| ConfigError::Parse {
                path: config_file.clone(),
                source,
            })?;
            std::fs::write(&config_file, content).map_err(|source| ConfigError::Io {
                path: config_file.clone(),
                source,
            })?;
            tracing::info!("Created default config at {:?}", config_file);

            Ok(config)
        }
    }

    /// Pick the backend URL: an explicit override (flag or environment)
    /// wins over the config file.
    pub fn resolve_api_url(&self, override_url: Option<&str>) -> Result<String, ConfigError> {
        override_url
            .or(self.api_url.as_deref())
            .filter(|url| !url.trim().is_empty())
            .map(str::to_string)
            .ok_or(ConfigError::MissingApiUrl)
    }

    /// Where the token storage file lives inside the state directory.
    pub fn storage_path(state_dir: &Path) -> PathBuf {
        state_dir.join(STORAGE_FILE)
    }
}

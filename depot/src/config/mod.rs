//! Configuration management for depot
//!
//! Default config location: ~/.depot/config.toml
//!
//! ```toml
//! [logging]
//! level = "info"
//! format = "pretty"
//!
//! [backends.local]
//! kind = "local"
//!
//! [backends.local.options]
//! root = "~/files"
//! create_root = true
//!
//! [backends.scratch]
//! kind = "memory"
//! ```
//!
//! Loading is the only part of the crate that touches the filesystem for
//! configuration; the registry consumes the parsed mapping.

mod backends;

pub use backends::BackendConfig;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;
use crate::registry::BackendRegistry;

/// Everything read from `config.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DepotConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Named backends, in declaration order
    #[serde(default)]
    pub backends: IndexMap<String, BackendConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "pretty" or "json"
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Replace a leading `~` with the home directory.
pub fn expand_tilde(path: &Path) -> Result<PathBuf, ConfigError> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(rest))
    } else if s == "~" {
        dirs::home_dir().ok_or(ConfigError::NoHomeDir)
    } else {
        Ok(path.to_path_buf())
    }
}

impl DepotConfig {
    /// `~/.depot/config.toml`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::home_dir()
            .map(|home| home.join(".depot").join("config.toml"))
            .ok_or(ConfigError::NoHomeDir)
    }

    /// Load config from a file path.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = ?path, backends = config.backends.len(), "Loaded config");
        Ok(config)
    }

    /// Load from `path`, or an empty default config if the file is missing.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Write the configuration back as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        fs::write(path, content).map_err(write_err)?;
        Ok(())
    }

    /// Validate every backend and build the registry.
    pub fn build_registry(&self) -> Result<BackendRegistry, ConfigError> {
        BackendRegistry::from_config(&self.backends)
    }
}

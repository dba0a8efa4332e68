//! Application and detection configuration
//!
//! Configuration is resolved in layers: built-in defaults, then a TOML file
//! (explicit path or `<config_dir>/cadence/config.toml`), then `CADENCE_*`
//! environment variables.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Default database file when nothing else is configured
pub const DEFAULT_DB_PATH: &str = "cadence.db";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 3000;

/// Thresholds used by the recurring pattern detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DetectionConfig {
    /// Smallest group that can be considered recurring
    pub min_group_size: usize,
    /// Groups with std_dev / |mean| above this are rejected
    pub max_amount_dispersion: f64,
    /// Candidates scoring below this are discarded
    pub min_confidence: f64,
    /// Cap applied to similarity-only confidence
    pub similarity_multiplier: f64,
    /// Occurrence count at which similarity evidence saturates
    pub similarity_saturation: usize,
    /// Shortest description prefix kept as a label
    pub min_label_length: usize,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            min_group_size: 2,
            max_amount_dispersion: 0.20,
            min_confidence: 0.30,
            similarity_multiplier: 0.7,
            similarity_saturation: 10,
            min_label_length: 3,
        }
    }
}

/// Fully resolved application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: String,
    pub host: String,
    pub port: u16,
    /// Extra CORS origins allowed by the server
    pub allowed_origins: Vec<String>,
    /// Bearer keys accepted by the server (empty = none configured)
    pub api_keys: Vec<String>,
    pub detection: DetectionConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            allowed_origins: Vec::new(),
            api_keys: Vec::new(),
            detection: DetectionConfig::default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    database: Option<RawDatabase>,
    server: Option<RawServer>,
    detection: Option<DetectionConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawDatabase {
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawServer {
    host: Option<String>,
    port: Option<u16>,
    allowed_origins: Option<Vec<String>>,
    api_keys: Option<Vec<String>>,
}

/// Default config file location (~/.config/cadence/config.toml on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cadence").join("config.toml"))
}

impl AppConfig {
    /// Load configuration from `path`, or the default location if it exists,
    /// then apply environment overrides.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                Self::from_file(path)?
            }
            None => match default_config_path() {
                Some(default_path) if default_path.exists() => Self::from_file(&default_path)?,
                _ => Self::default(),
            },
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a config file without environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML content
    pub fn from_toml(content: &str) -> Result<Self> {
        let raw: RawConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

        let mut config = Self::default();

        if let Some(database) = raw.database {
            if let Some(path) = database.path {
                config.db_path = path;
            }
        }

        if let Some(server) = raw.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(origins) = server.allowed_origins {
                config.allowed_origins = origins;
            }
            if let Some(keys) = server.api_keys {
                config.api_keys = keys;
            }
        }

        if let Some(detection) = raw.detection {
            config.detection = detection;
        }

        Ok(config)
    }

    /// Apply `CADENCE_*` overrides using the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("CADENCE_DB_PATH") {
            self.db_path = path;
        }
        if let Some(host) = lookup("CADENCE_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("CADENCE_PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("Invalid CADENCE_PORT: {}", port)))?;
        }
        if let Some(origins) = lookup("CADENCE_CORS_ORIGINS") {
            self.allowed_origins = split_list(&origins);
        }
        if let Some(keys) = lookup("CADENCE_API_KEYS") {
            self.api_keys = split_list(&keys);
        }
        Ok(())
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

//! Configuration loading
//!
//! Settings resolve in priority order:
//! 1. Command-line argument / environment variable (handled by the binary's
//!    clap parser and passed in as [`ConfigOverrides`])
//! 2. TOML config file
//! 3. Compiled default

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_PORT: u16 = 5780;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Contents of `config.toml`; every key is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TomlConfig {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub database_path: Option<PathBuf>,
    pub session_secret: Option<String>,
    pub log_level: Option<String>,
}

/// Values that take precedence over the TOML file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub bind: Option<String>,
    pub database_path: Option<PathBuf>,
    pub session_secret: Option<String>,
}

/// Fully resolved server settings
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub bind: String,
    pub database_path: PathBuf,
    pub session_secret: String,
    pub log_level: String,
}

impl ServerConfig {
    /// Merge overrides, TOML values and defaults
    ///
    /// A session secret is mandatory; there is no compiled default for it.
    pub fn resolve(overrides: ConfigOverrides, toml: TomlConfig) -> Result<Self> {
        let session_secret = overrides
            .session_secret
            .or(toml.session_secret)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "session secret not configured (use --session-secret, \
                     CONFHUB_SESSION_SECRET or session_secret in config.toml)"
                        .to_string(),
                )
            })?;

        Ok(Self {
            port: overrides.port.or(toml.port).unwrap_or(DEFAULT_PORT),
            bind: overrides
                .bind
                .or(toml.bind)
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            database_path: overrides
                .database_path
                .or(toml.database_path)
                .unwrap_or_else(default_database_path),
            session_secret,
            log_level: toml
                .log_level
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

/// Load the TOML config file
///
/// Returns `None` for a missing file. Nothing is logged here: the binary
/// reads config before its subscriber is installed and reports the outcome
/// afterwards.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))?;
    Ok(Some(config))
}

/// Platform config file location (`~/.config/confhub/config.toml` on Linux)
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("confhub").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("confhub.toml"))
}

/// Platform database location (`~/.local/share/confhub/confhub.db` on Linux)
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("confhub").join("confhub.db"))
        .unwrap_or_else(|| PathBuf::from("./confhub_data/confhub.db"))
}

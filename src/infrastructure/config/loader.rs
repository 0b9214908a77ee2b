//! Configuration loading and validation

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use std::path::Path;
use thiserror::Error;

use crate::domain::error::RouteError;
use crate::domain::models::config::Config;
use crate::domain::models::RouteTable;

/// Default project config file, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "switchboard.yaml";

/// Optional local overrides, merged over the main config file
pub const LOCAL_CONFIG_FILE: &str = "switchboard.local.yaml";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Port `0` is not a usable listener port.
    #[error("Invalid port: {0}. Must be between 1 and 65535")]
    InvalidPort(u16),

    /// A worker budget is zero.
    #[error("Invalid {0}: must be greater than zero")]
    InvalidTimeout(&'static str),

    /// The advertised protocol version is blank.
    #[error("Protocol version cannot be empty")]
    EmptyProtocolVersion,

    /// Unknown logging level.
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    /// The `routes` section is unusable.
    #[error("Invalid route: {0}")]
    InvalidRoute(#[from] RouteError),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. `path` if given, else switchboard.yaml (optional)
    /// 3. switchboard.local.yaml (optional)
    /// 4. Environment variables (SWITCHBOARD_* prefix, `__` for nesting)
    pub fn load(path: Option<&Path>) -> Result<Config> {
        if let Some(explicit) = path {
            if !explicit.is_file() {
                anyhow::bail!("Config file not found: {}", explicit.display());
            }
        }
        let main = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(main))
            .merge(Yaml::file(LOCAL_CONFIG_FILE))
            .merge(Env::prefixed("SWITCHBOARD_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.server.port == 0 {
            return Err(ConfigError::InvalidPort(config.server.port));
        }

        let worker = &config.worker;
        for (name, value) in [
            ("handshake_timeout_ms", worker.handshake_timeout_ms),
            ("request_timeout_ms", worker.request_timeout_ms),
            ("teardown_timeout_ms", worker.teardown_timeout_ms),
        ] {
            if value == 0 {
                return Err(ConfigError::InvalidTimeout(name));
            }
        }

        if worker.protocol_version.trim().is_empty() {
            return Err(ConfigError::EmptyProtocolVersion);
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Self::route_table(config)?;

        Ok(())
    }

    /// Build the immutable route table from the `routes` section
    pub fn route_table(config: &Config) -> Result<RouteTable, ConfigError> {
        Ok(RouteTable::new(config.routes.clone())?)
    }
}

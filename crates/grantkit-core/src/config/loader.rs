//! Configuration loading

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use super::model::GrantConfig;
use crate::error::{GrantError, GrantResult};

pub const ENV_SETTLE_DELAY: &str = "GRANTKIT_SETTLE_DELAY";
pub const ENV_AUTO_REQUEST: &str = "GRANTKIT_AUTO_REQUEST";
pub const ENV_LOG_LEVEL: &str = "GRANTKIT_LOG_LEVEL";
pub const ENV_LOG_FORMAT: &str = "GRANTKIT_LOG_FORMAT";

/// Source of configuration data
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// Default configuration
    Default,
    /// A TOML, YAML or JSON file, picked by extension; a missing file is skipped
    File(PathBuf),
    /// `GRANTKIT_*` process environment variables
    Environment,
    /// Explicit variables using the same names as the environment source
    Variables(HashMap<String, String>),
}

/// Configuration loader with support for multiple sources.
///
/// Sources apply in order. A file replaces the whole configuration (missing
/// fields take their defaults); variables override single fields.
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a configuration source
    pub fn add_source(mut self, source: ConfigSource) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_defaults(self) -> Self {
        self.add_source(ConfigSource::Default)
    }

    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_source(ConfigSource::File(path.as_ref().to_path_buf()))
    }

    pub fn with_env(self) -> Self {
        self.add_source(ConfigSource::Environment)
    }

    pub fn with_variables(self, variables: HashMap<String, String>) -> Self {
        self.add_source(ConfigSource::Variables(variables))
    }

    /// Load configuration from all sources and validate it
    pub fn load(self) -> GrantResult<GrantConfig> {
        let mut config = GrantConfig::default();

        for source in &self.sources {
            match source {
                ConfigSource::Default => {
                    tracing::debug!("Loading default config");
                    config = GrantConfig::default();
                }
                ConfigSource::File(path) => {
                    if let Some(loaded) = load_from_file(path)? {
                        config = loaded;
                    }
                }
                ConfigSource::Environment => {
                    tracing::debug!("Loading config from environment");
                    apply_overrides(&mut config, |name| env::var(name).ok())?;
                }
                ConfigSource::Variables(variables) => {
                    apply_overrides(&mut config, |name| variables.get(name).cloned())?;
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

fn load_from_file(path: &Path) -> GrantResult<Option<GrantConfig>> {
    if !path.exists() {
        tracing::debug!("Config file not found, skipping: {}", path.display());
        return Ok(None);
    }

    tracing::debug!("Loading config from file: {}", path.display());
    let content = fs::read_to_string(path).map_err(|e| {
        GrantError::io_with_path(
            format!("Failed to read config file: {}", e),
            path.display().to_string(),
        )
    })?;

    let config: GrantConfig = match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => toml::from_str(&content)?,
        Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
        _ => serde_json::from_str(&content)?,
    };
    Ok(Some(config))
}

fn apply_overrides<F>(config: &mut GrantConfig, lookup: F) -> GrantResult<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_SETTLE_DELAY) {
        config.coordinator.settle_delay = humantime::parse_duration(value.trim()).map_err(|e| {
            GrantError::config_with_context(
                format!("Invalid settle delay {:?}: {}", value, e),
                ENV_SETTLE_DELAY,
            )
        })?;
    }

    if let Some(value) = lookup(ENV_AUTO_REQUEST) {
        config.coordinator.auto_request = parse_bool(&value).ok_or_else(|| {
            GrantError::config_with_context(
                format!("Invalid boolean {:?}", value),
                ENV_AUTO_REQUEST,
            )
        })?;
    }

    if let Some(value) = lookup(ENV_LOG_LEVEL) {
        config.logging.level = value.trim().to_ascii_lowercase();
    }

    if let Some(value) = lookup(ENV_LOG_FORMAT) {
        config.logging.format = value.trim().to_ascii_lowercase();
    }

    Ok(())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

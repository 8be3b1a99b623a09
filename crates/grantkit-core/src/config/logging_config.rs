//! Logging configuration

use serde::{Deserialize, Serialize};

use crate::error::{GrantError, GrantResult};

const FORMATS: &[&str] = &["pretty", "compact", "json"];
const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    pub level: String,
    /// Log format (pretty, compact, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> GrantResult<()> {
        if !LEVELS.contains(&self.level.to_ascii_lowercase().as_str()) {
            return Err(GrantError::config_with_context(
                format!("unknown log level: {}", self.level),
                "logging.level",
            ));
        }
        if !FORMATS.contains(&self.format.as_str()) {
            return Err(GrantError::config_with_context(
                format!("unknown log format: {}", self.format),
                "logging.format",
            ));
        }
        Ok(())
    }
}

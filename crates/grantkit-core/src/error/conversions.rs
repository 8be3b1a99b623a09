//! From trait implementations for GrantError conversions

use super::types::GrantError;

impl From<serde_json::Error> for GrantError {
    fn from(error: serde_json::Error) -> Self {
        Self::config(format!("Failed to parse JSON config: {}", error))
    }
}

impl From<serde_yaml::Error> for GrantError {
    fn from(error: serde_yaml::Error) -> Self {
        Self::config(format!("Failed to parse YAML config: {}", error))
    }
}

impl From<toml::de::Error> for GrantError {
    fn from(error: toml::de::Error) -> Self {
        Self::config(format!("Failed to parse TOML config: {}", error))
    }
}

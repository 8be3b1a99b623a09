//! Top-level configuration model

use serde::{Deserialize, Serialize};

use super::coordinator_config::CoordinatorConfig;
use super::logging_config::LoggingConfig;
use crate::error::GrantResult;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrantConfig {
    pub coordinator: CoordinatorConfig,
    pub logging: LoggingConfig,
}

impl GrantConfig {
    pub fn validate(&self) -> GrantResult<()> {
        self.coordinator.validate()?;
        self.logging.validate()
    }
}

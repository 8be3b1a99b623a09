//! Batch coordinator configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::coordinator::DebouncePolicy;
use crate::error::{GrantError, GrantResult};

/// Upper bound for the settle delay
pub const MAX_SETTLE_DELAY: Duration = Duration::from_secs(10);

/// Batch coordinator configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Delay between a resolution and the settle re-scan (e.g. "200ms")
    #[serde(with = "humantime_serde")]
    pub settle_delay: Duration,
    /// Prompt every undecided kind as soon as a batch starts
    pub auto_request: bool,
    /// Buffered batch events per subscriber
    pub event_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            settle_delay: DebouncePolicy::DEFAULT_DELAY,
            auto_request: false,
            event_capacity: 64,
        }
    }
}

impl CoordinatorConfig {
    /// Configuration with zero settle delay, for tests and headless hosts
    pub fn immediate() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            ..Default::default()
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_auto_request(mut self, auto_request: bool) -> Self {
        self.auto_request = auto_request;
        self
    }

    pub fn debounce(&self) -> DebouncePolicy {
        DebouncePolicy::new(self.settle_delay)
    }

    pub fn validate(&self) -> GrantResult<()> {
        if self.settle_delay > MAX_SETTLE_DELAY {
            return Err(GrantError::config_with_context(
                format!(
                    "settle delay {:?} exceeds the maximum of {:?}",
                    self.settle_delay, MAX_SETTLE_DELAY
                ),
                "coordinator.settle_delay",
            ));
        }
        if self.event_capacity == 0 {
            return Err(GrantError::config_with_context(
                "event capacity must be at least 1",
                "coordinator.event_capacity",
            ));
        }
        Ok(())
    }
}

//! Settle-check debounce policy

use std::time::Duration;

/// How long the coordinator waits after a resolution before re-scanning.
///
/// Platforms can report a resolution before their own status read reflects
/// it, so the aggregate is re-read after a short delay instead of trusting
/// the delivered status. A zero delay re-scans inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebouncePolicy {
    delay: Duration,
}

impl DebouncePolicy {
    /// Delay used when nothing else is configured
    pub const DEFAULT_DELAY: Duration = Duration::from_millis(200);

    pub const fn new(delay: Duration) -> Self {
        Self { delay }
    }

    /// Re-scan as soon as a resolution arrives
    pub const fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_immediate(&self) -> bool {
        self.delay.is_zero()
    }
}

impl Default for DebouncePolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_DELAY)
    }
}

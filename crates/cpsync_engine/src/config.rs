//! Configuration for the sync engine.

use crate::clock::{Clock, SystemClock};
use std::sync::Arc;
use std::time::Duration;

/// Sync period used when the caller does not pass one.
pub const DEFAULT_SYNC_PERIOD: Duration = Duration::from_secs(60);

/// Configuration for a [`Dispatcher`](crate::Dispatcher).
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How long a successfully programmed entity is considered in sync.
    pub sync_period: Duration,
    /// Wall-clock source for the staleness gate.
    pub clock: Arc<dyn Clock>,
}

impl SyncConfig {
    /// Creates a configuration with the default sync period and the system clock.
    pub fn new() -> Self {
        Self {
            sync_period: DEFAULT_SYNC_PERIOD,
            clock: Arc::new(SystemClock),
        }
    }

    /// Sets the sync period.
    pub fn with_sync_period(mut self, period: Duration) -> Self {
        self.sync_period = period;
        self
    }

    /// Sets the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

//! Configuration for a match session

use std::time::Duration;

/// Timing configuration of a [`MatchSession`](crate::MatchSession)
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Interval at which the last snapshot is republished even without changes (in milliseconds)
    pub publish_interval_ms: u64,

    /// Interval at which the opponent snapshot and pending attacks are polled (in milliseconds)
    pub poll_interval_ms: u64,

    /// Whether to subscribe to the store's push feed in addition to polling
    pub push_enabled: bool,

    /// How long `wait_for_start` waits for the match to begin (None = forever)
    pub start_timeout_ms: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            publish_interval_ms: 1000,
            poll_interval_ms: 1000,
            push_enabled: true,
            start_timeout_ms: None,
        }
    }
}

impl SyncConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the republish interval in milliseconds
    pub fn with_publish_interval_ms(mut self, interval_ms: u64) -> Self {
        self.publish_interval_ms = interval_ms.max(1);
        self
    }

    /// Set the polling interval in milliseconds
    pub fn with_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.poll_interval_ms = interval_ms.max(1);
        self
    }

    /// Enable or disable the push subscription
    pub fn with_push(mut self, enabled: bool) -> Self {
        self.push_enabled = enabled;
        self
    }

    /// Set the match start timeout in milliseconds
    pub fn with_start_timeout_ms(mut self, timeout_ms: Option<u64>) -> Self {
        self.start_timeout_ms = timeout_ms;
        self
    }

    pub(crate) fn publish_interval(&self) -> Duration {
        Duration::from_millis(self.publish_interval_ms)
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

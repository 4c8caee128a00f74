use std::time::Duration;

/// Tuning for the change feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveConfig {
    /// First wait before reopening a dropped change channel.
    pub reconnect_initial_delay: Duration,
    /// Upper bound for the doubling reconnect delay.
    pub reconnect_max_delay: Duration,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            reconnect_initial_delay: Duration::from_millis(250),
            reconnect_max_delay: Duration::from_secs(30),
        }
    }
}

impl LiveConfig {
    pub fn with_reconnect_delays(mut self, initial: Duration, max: Duration) -> Self {
        self.reconnect_initial_delay = initial;
        self.reconnect_max_delay = max.max(initial);
        self
    }

    /// Delay to use after `current`, doubling up to the configured maximum.
    pub(crate) fn next_delay(&self, current: Duration) -> Duration {
        current.saturating_mul(2).min(self.reconnect_max_delay)
    }
}

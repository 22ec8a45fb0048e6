//! Configuration options for the transport session

use std::time::Duration;

/// Response budget applied to every exchange (two minutes)
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(120);

/// Longest single wait handed to the link before the budget is re-checked
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Shortest poll interval; smaller values are raised to this
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Configuration options for a transport session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// How long to wait for the card to answer a single command
    pub response_timeout: Duration,

    /// Granularity at which the link is polled for a response, never below
    /// [`MIN_POLL_INTERVAL`]
    pub poll_interval: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl TransportConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response timeout
    pub const fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Set the poll interval, raised to [`MIN_POLL_INTERVAL`] if shorter
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = if interval.as_nanos() < MIN_POLL_INTERVAL.as_nanos() {
            MIN_POLL_INTERVAL
        } else {
            interval
        };
        self
    }
}

//! Error types specific to card transport

use std::time::Duration;

/// Transport error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No compatible card technology is present
    #[error("No compatible card available: {0}")]
    Unavailable(String),

    /// The low-level connect call failed
    #[error("Failed to connect to card: {0}")]
    ConnectFailed(String),

    /// No response arrived within the response budget
    #[error("Card did not respond within {elapsed:?}")]
    Timeout {
        /// Time spent waiting for the response
        elapsed: Duration,
    },

    /// Lower-layer fault, including a card removed mid-exchange
    #[error("I/O error: {0}")]
    Io(String),
}

impl TransportError {
    /// Create an unavailable error
    pub fn unavailable<S: Into<String>>(message: S) -> Self {
        Self::Unavailable(message.into())
    }

    /// Create a connect failure
    pub fn connect_failed<S: Into<String>>(message: S) -> Self {
        Self::ConnectFailed(message.into())
    }

    /// Create an I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Error reported when the card leaves the field mid-exchange
    pub fn connection_lost() -> Self {
        Self::Io("connection lost".to_string())
    }

    /// Check if this is a timeout
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

use std::time::Duration;

use tapsign_apdu_core::TransportConfig;
use tapsign_card::SessionConfig;

/// Configuration of a [`Signer`](crate::Signer)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignerConfig {
    /// Transport session options
    pub transport: TransportConfig,

    /// Card session options
    pub session: SessionConfig,
}

impl SignerConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transport options
    pub const fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Set the card session options
    pub fn with_session(mut self, session: SessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Set how long each command may take
    pub const fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.transport.response_timeout = timeout;
        self
    }
}

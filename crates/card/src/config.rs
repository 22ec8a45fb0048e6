//! Configuration of a card session

use k256::PublicKey;

use crate::constants::{DEFAULT_KEY_INDEX, DEFAULT_PIN_SLOT};

/// Configuration options for a card session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// PIN slot verified before signing
    pub pin_slot: u8,

    /// Key slot used for signing
    pub key_index: u8,

    /// Whether a failed GET STATUS aborts the session
    pub require_status: bool,

    /// Card authentication keys accepted during the handshake; empty accepts
    /// any card whose proof verifies
    pub trusted_card_keys: Vec<PublicKey>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pin_slot: DEFAULT_PIN_SLOT,
            key_index: DEFAULT_KEY_INDEX,
            require_status: false,
            trusted_card_keys: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the PIN slot
    pub const fn with_pin_slot(mut self, pin_slot: u8) -> Self {
        self.pin_slot = pin_slot;
        self
    }

    /// Set the signing key slot
    pub const fn with_key_index(mut self, key_index: u8) -> Self {
        self.key_index = key_index;
        self
    }

    /// Set whether a failed GET STATUS aborts the session
    pub const fn with_require_status(mut self, require_status: bool) -> Self {
        self.require_status = require_status;
        self
    }

    /// Trust one more card authentication key
    pub fn with_trusted_card_key(mut self, key: PublicKey) -> Self {
        self.trusted_card_keys.push(key);
        self
    }
}

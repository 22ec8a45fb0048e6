use sha2::{Digest, Sha256};
use tapsign_card::constants::DEFAULT_KEY_INDEX;

/// Message to be signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningRequest {
    /// Text as entered by the user
    pub message: String,
    /// SHA-256 of the UTF-8 message
    pub digest: [u8; 32],
    /// On-card key slot
    pub key_index: u8,
}

impl SigningRequest {
    /// Hash a message for the default key slot
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let digest = Sha256::digest(message.as_bytes()).into();
        Self {
            message,
            digest,
            key_index: DEFAULT_KEY_INDEX,
        }
    }

    /// Sign with another key slot
    pub const fn with_key_index(mut self, key_index: u8) -> Self {
        self.key_index = key_index;
        self
    }
}

use tapsign_apdu_core::{Command, StatusWord};

use crate::constants::{CLA_SATOCHIP, ins};
use crate::error::SessionError;

/// SIGN TRANSACTION HASH over a 32-byte digest with the key in `key_index`
pub fn sign_hash(key_index: u8, digest: &[u8; 32]) -> Command {
    Command::new_with_data(
        CLA_SATOCHIP,
        ins::SIGN_HASH,
        key_index,
        0x00,
        digest.to_vec(),
    )
}

/// Interpret the SIGN HASH status
pub fn check(status: StatusWord) -> Result<(), SessionError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(SessionError::SigningRejected(status))
    }
}

//! Command frames of the signing applet
//!
//! Each module builds one command and interprets the status words the card
//! answers it with. Serialization and secure channel wrapping live in
//! [`crate::codec`].

pub mod get_status;
pub mod init_secure_channel;
pub mod select;
pub mod sign_hash;
pub mod verify_pin;

use tapsign_apdu_core::Command;

use crate::constants::{CLA_SATOCHIP, ins};

pub use init_secure_channel::CardHandshake;

/// Carrier for a secure channel envelope
pub fn process_secure_channel(envelope: Vec<u8>) -> Command {
    Command::new_with_data(CLA_SATOCHIP, ins::PROCESS_SECURE_CHANNEL, 0x00, 0x00, envelope)
}

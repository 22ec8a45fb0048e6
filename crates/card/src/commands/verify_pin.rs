use tapsign_apdu_core::{StatusWord, command::MAX_SHORT_DATA};
use zeroize::Zeroizing;

use crate::constants::{CLA_SATOCHIP, ins, status::PIN_BLOCKED};
use crate::error::{CodecError, SessionError};
use crate::types::Pin;

/// Raw VERIFY PIN frame for the given slot
///
/// Built directly into a wiped buffer so the PIN never lands in a shared
/// [`Bytes`](tapsign_apdu_core::Bytes) allocation.
pub fn verify_pin(pin_slot: u8, pin: &Pin) -> Result<Zeroizing<Vec<u8>>, CodecError> {
    if pin.len() > MAX_SHORT_DATA {
        return Err(tapsign_apdu_core::Error::CommandDataTooLong(pin.len()).into());
    }

    let mut frame = Zeroizing::new(Vec::with_capacity(5 + pin.len()));
    frame.extend_from_slice(&[CLA_SATOCHIP, ins::VERIFY_PIN, pin_slot, 0x00, pin.len() as u8]);
    frame.extend_from_slice(pin.as_bytes());
    Ok(frame)
}

/// Interpret the VERIFY PIN status
pub fn check(status: StatusWord) -> Result<(), SessionError> {
    if status.is_success() {
        return Ok(());
    }
    if status == PIN_BLOCKED || status.is_authentication_blocked() {
        return Err(SessionError::PinBlocked);
    }
    match status.retry_counter() {
        Some(0) => Err(SessionError::PinBlocked),
        Some(remaining) => Err(SessionError::WrongPin { remaining }),
        None => Err(SessionError::PinRejected(status)),
    }
}

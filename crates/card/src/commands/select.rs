use tapsign_apdu_core::{Command, StatusWord};

use crate::constants::{CLA_ISO, SATOCHIP_AID, ins};
use crate::error::SessionError;

/// SELECT the signing applet by AID
pub fn select_applet() -> Command {
    Command::new_with_data(CLA_ISO, ins::SELECT, 0x04, 0x00, SATOCHIP_AID)
}

/// Interpret the SELECT status
///
/// `6A 82` is the usual answer of a card without the applet; any other failure
/// is treated the same way.
pub fn check(status: StatusWord) -> Result<(), SessionError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(SessionError::AppletNotFound(status))
    }
}

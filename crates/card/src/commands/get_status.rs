use tapsign_apdu_core::{Command, Response};

use crate::constants::{CLA_SATOCHIP, ins};
use crate::error::SessionError;
use crate::types::CardStatus;

/// GET STATUS
pub const fn get_status() -> Command {
    Command::new(CLA_SATOCHIP, ins::GET_STATUS, 0x00, 0x00)
}

/// Parse a GET STATUS response
pub fn parse(response: &Response) -> Result<CardStatus, SessionError> {
    if !response.is_success() {
        return Err(SessionError::StatusUnavailable(format!(
            "card answered {}",
            response.status()
        )));
    }
    CardStatus::try_from(response.payload().as_ref())
        .map_err(|e| SessionError::StatusUnavailable(e.to_string()))
}

#[cfg(test)]
mod tests {
    use tapsign_apdu_core::{Bytes, StatusWord};

    use super::*;

    #[test]
    fn test_get_status_frame() {
        assert_eq!(get_status().to_bytes().unwrap().as_ref(), &[0xB0, 0x3C, 0x00, 0x00]);
    }

    #[test]
    fn test_failed_status() {
        let err = parse(&Response::error(StatusWord::new(0x6D, 0x00))).unwrap_err();
        assert_eq!(
            err,
            SessionError::StatusUnavailable("card answered 6D 00".to_string())
        );

        let err = parse(&Response::success(Bytes::from_static(&[0x00]))).unwrap_err();
        assert!(matches!(err, SessionError::StatusUnavailable(_)));
    }
}

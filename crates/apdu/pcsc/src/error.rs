//! Error types for the PC/SC adapter

use tapsign_apdu_core::TransportError;

/// PC/SC-specific errors
#[derive(Debug, thiserror::Error)]
pub enum PcscError {
    /// PC/SC error
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No readers available
    #[error("No readers available")]
    NoReadersAvailable,

    /// Reader not found
    #[error("Reader not found: {0}")]
    ReaderNotFound(String),

    /// No card present in any matching reader
    #[error("No card present: {0}")]
    NoCard(String),
}

impl From<PcscError> for TransportError {
    fn from(error: PcscError) -> Self {
        let message = error.to_string();
        match error {
            PcscError::NoReadersAvailable
            | PcscError::ReaderNotFound(_)
            | PcscError::NoCard(_) => Self::Unavailable(message),
            PcscError::Pcsc(
                pcsc::Error::NoSmartcard
                | pcsc::Error::ReaderUnavailable
                | pcsc::Error::NoReadersAvailable
                | pcsc::Error::UnknownReader,
            ) => Self::Unavailable(message),
            PcscError::Pcsc(pcsc::Error::RemovedCard | pcsc::Error::ResetCard) => Self::Io(message),
            PcscError::Pcsc(_) => Self::ConnectFailed(message),
        }
    }
}

/// Map a failure during an exchange with an already connected card
pub(crate) fn transmit_error(error: pcsc::Error) -> TransportError {
    match error {
        pcsc::Error::RemovedCard | pcsc::Error::ResetCard => TransportError::connection_lost(),
        other => TransportError::io(format!("PC/SC transmit failed: {other}")),
    }
}

//! Framing errors for APDU commands and responses
//!
//! Transport failures live in [`crate::transport::TransportError`]; this type only
//! covers frames that cannot be built or parsed.

/// Result type for APDU framing operations
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors raised while building or parsing APDU frames
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Invalid command length
    #[error("Invalid command length: {0}")]
    InvalidCommandLength(usize),

    /// Command data does not fit a short APDU
    #[error("Command data too long for a short APDU: {0} bytes")]
    CommandDataTooLong(usize),

    /// Response is shorter than the two status bytes
    #[error("Response too short: {0} bytes")]
    ResponseTooShort(usize),
}

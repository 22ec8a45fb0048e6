//! Error types for the card protocol
//!
//! Each layer has its own enum and wraps the layer below with `#[from]`, so the
//! original status word or transport cause is never lost on the way up.

use tapsign_apdu_core::{StatusWord, TransportError};

use crate::session::SessionState;

/// Result type for card session operations
pub type Result<T, E = SessionError> = std::result::Result<T, E>;

/// Errors raised while encoding or decoding frames
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The response is structurally invalid
    #[error("Malformed response: {0}")]
    MalformedResponse(&'static str),

    /// The response tag or sequence number did not verify under the session keys
    #[error("Secure channel authentication failed")]
    AuthenticationFailed,

    /// The session sequence counter cannot advance any further
    #[error("Secure channel sequence counter exhausted")]
    SequenceExhausted,

    /// A command frame could not be built or parsed
    #[error(transparent)]
    Frame(#[from] tapsign_apdu_core::Error),

    /// Key material rejected by a primitive
    #[error("Cipher failure: {0}")]
    Cipher(&'static str),
}

/// Errors raised by the secure channel handshake
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NegotiationError {
    /// The card could not prove it holds a trusted authentication key
    #[error("Card authentication failed")]
    CardAuthenticationFailed,

    /// The handshake response is structurally invalid
    #[error("Secure channel protocol error: {0}")]
    ProtocolError(&'static str),

    /// The card refused to open a secure channel
    #[error("Card refused the secure channel: {0}")]
    Rejected(StatusWord),

    /// Transport failure during the handshake
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Frame failure during the handshake
    #[error(transparent)]
    Codec(#[from] CodecError),
}

/// Errors raised by the card session state machine
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The signing applet is not present on the card
    #[error("Signing applet not found: {0}")]
    AppletNotFound(StatusWord),

    /// The card status could not be read
    #[error("Card status unavailable: {0}")]
    StatusUnavailable(String),

    /// The PIN did not match
    #[error("Wrong PIN, {remaining} attempts remaining")]
    WrongPin {
        /// Attempts left before the PIN blocks
        remaining: u8,
    },

    /// The PIN retry counter is exhausted
    #[error("PIN is blocked")]
    PinBlocked,

    /// The card refused the PIN for another reason
    #[error("PIN verification rejected: {0}")]
    PinRejected(StatusWord),

    /// The card refused to sign
    #[error("Signing rejected: {0}")]
    SigningRejected(StatusWord),

    /// A step was requested out of order or after the session ended
    #[error("Invalid session state: expected {expected}, was {actual}")]
    InvalidState {
        /// State the step requires
        expected: SessionState,
        /// State the session was in
        actual: SessionState,
    },

    /// Transport failure
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Frame or secure channel failure
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Secure channel handshake failure
    #[error(transparent)]
    Negotiation(#[from] NegotiationError),
}

impl SessionError {
    /// The transport failure behind this error, if any
    pub const fn transport_error(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) | Self::Negotiation(NegotiationError::Transport(e)) => Some(e),
            _ => None,
        }
    }

    /// Human-readable description for the person holding the card
    pub fn user_message(&self) -> String {
        if let Some(transport) = self.transport_error() {
            return match transport {
                TransportError::Unavailable(_) => "No compatible card was found. Tap the card again.".into(),
                TransportError::ConnectFailed(_) => "Could not connect to the card. Tap the card again.".into(),
                TransportError::Timeout { .. } => "The card did not respond in time. Tap the card again.".into(),
                TransportError::Io(_) => "Connection to the card was lost. Hold the card still and try again.".into(),
            };
        }

        match self {
            Self::AppletNotFound(_) => "This card does not carry the signing applet.".into(),
            Self::StatusUnavailable(_) => "Could not read the card status.".into(),
            Self::WrongPin { remaining: 1 } => "Wrong PIN. 1 attempt remaining.".into(),
            Self::WrongPin { remaining } => format!("Wrong PIN. {remaining} attempts remaining."),
            Self::PinBlocked => "The PIN is blocked. Unblock the card before signing.".into(),
            Self::PinRejected(sw) => format!("The card rejected the PIN ({sw})."),
            Self::SigningRejected(sw) => format!("The card refused to sign ({sw})."),
            Self::Negotiation(NegotiationError::CardAuthenticationFailed) => {
                "The card could not prove it is genuine.".into()
            }
            Self::Negotiation(_) | Self::Codec(_) => {
                "Secure connection to the card failed. Tap the card again.".into()
            }
            Self::InvalidState { .. } => format!("Internal error: {self}"),
            Self::Transport(_) => self.to_string(),
        }
    }
}

//! Card session state machine
//!
//! A [`CardSession`] walks one tapped card through the signing flow:
//!
//! ```text
//! Disconnected -> AppletSelected -> StatusKnown -> SecureChannelOpen -> PinVerified -> Signed
//! ```
//!
//! Each step is one round trip. Any failure moves the session to `Failed`, which
//! like `Signed` is terminal. A step requested out of order is refused with
//! [`SessionError::InvalidState`] before anything is sent.

use derive_more::Display;
use tapsign_apdu_core::{Bytes, CardTransport};
use tracing::{debug, warn};

use crate::codec;
use crate::commands;
use crate::config::SessionConfig;
use crate::error::{CodecError, Result, SessionError};
use crate::secure_channel::{SecureChannelContext, negotiate};
use crate::types::{CardStatus, Pin};

/// Position of a card session in the signing flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SessionState {
    /// Nothing sent yet
    Disconnected,
    /// The signing applet answered SELECT
    AppletSelected,
    /// GET STATUS was attempted
    StatusKnown,
    /// Session keys are negotiated
    SecureChannelOpen,
    /// The PIN was accepted
    PinVerified,
    /// A signature was produced
    Signed,
    /// A step failed; see [`CardSession::failure`]
    Failed,
}

impl SessionState {
    /// Whether no further step may run
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Signed | Self::Failed)
    }
}

/// Signing flow over one transport
#[derive(Debug)]
pub struct CardSession<T: CardTransport> {
    /// Transport to the card
    transport: T,
    /// Configuration
    config: SessionConfig,
    /// Current state
    state: SessionState,
    /// Error that moved the session to `Failed`
    failure: Option<SessionError>,
    /// Negotiated secure channel
    channel: Option<SecureChannelContext>,
    /// Status read during `fetch_status`
    status: Option<CardStatus>,
}

impl<T: CardTransport> CardSession<T> {
    /// Start a session over an open transport
    pub const fn new(transport: T, config: SessionConfig) -> Self {
        Self {
            transport,
            config,
            state: SessionState::Disconnected,
            failure: None,
            channel: None,
            status: None,
        }
    }

    /// Current state
    pub const fn state(&self) -> SessionState {
        self.state
    }

    /// Error that ended the session, if it failed
    pub const fn failure(&self) -> Option<&SessionError> {
        self.failure.as_ref()
    }

    /// Card status, if it was read
    pub const fn status(&self) -> Option<&CardStatus> {
        self.status.as_ref()
    }

    /// Session configuration
    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Borrow the transport
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// End the session and hand back the transport
    ///
    /// The secure channel keys are wiped here.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// SELECT the signing applet
    pub fn select_applet(&mut self) -> Result<()> {
        self.ensure_state(SessionState::Disconnected)?;
        let result = self.do_select_applet();
        self.advance(result, SessionState::AppletSelected)
    }

    /// Read the card status
    ///
    /// Unless `require_status` is set, a card that cannot report its status is
    /// logged and the session continues with `Ok(None)`. Transport failures are
    /// always fatal.
    pub fn fetch_status(&mut self) -> Result<Option<CardStatus>> {
        self.ensure_state(SessionState::AppletSelected)?;
        let result = match self.do_fetch_status() {
            Ok(status) => {
                self.status = Some(status);
                Ok(Some(status))
            }
            Err(SessionError::StatusUnavailable(reason)) if !self.config.require_status => {
                warn!(%reason, "Card status unavailable, continuing without it");
                Ok(None)
            }
            Err(e) => Err(e),
        };
        self.advance(result, SessionState::StatusKnown)
    }

    /// Negotiate the secure channel
    pub fn open_secure_channel(&mut self) -> Result<()> {
        self.ensure_state(SessionState::StatusKnown)?;
        let result = negotiate(&mut self.transport, &self.config.trusted_card_keys)
            .map(|channel| self.channel = Some(channel))
            .map_err(SessionError::from);
        self.advance(result, SessionState::SecureChannelOpen)
    }

    /// Verify the PIN; the credential is wiped before this returns
    pub fn verify_pin(&mut self, pin: Pin) -> Result<()> {
        self.ensure_state(SessionState::SecureChannelOpen)?;
        let result = self.do_verify_pin(&pin);
        drop(pin);
        self.advance(result, SessionState::PinVerified)
    }

    /// Sign a 32-byte digest with the configured key slot
    ///
    /// Returns the signature exactly as the card encodes it.
    pub fn sign_hash(&mut self, digest: &[u8; 32]) -> Result<Bytes> {
        self.ensure_state(SessionState::PinVerified)?;
        let result = self.do_sign_hash(digest);
        self.advance(result, SessionState::Signed)
    }

    fn do_select_applet(&mut self) -> Result<()> {
        let response = self.exchange(&codec::encode_select_applet()?)?;
        commands::select::check(response.status())
    }

    fn do_fetch_status(&mut self) -> Result<CardStatus> {
        let response = self.exchange(&codec::encode_get_status()?)?;
        commands::get_status::parse(&response)
    }

    fn do_verify_pin(&mut self, pin: &Pin) -> Result<()> {
        let pin_slot = self.config.pin_slot;
        let frame = codec::encode_verify_pin_in_slot(pin_slot, pin, self.channel_mut()?)?;
        let response = self.exchange_secure(&frame)?;
        commands::verify_pin::check(response.status())
    }

    fn do_sign_hash(&mut self, digest: &[u8; 32]) -> Result<Bytes> {
        let key_index = self.config.key_index;
        let frame = codec::encode_sign_hash(key_index, digest, self.channel_mut()?)?;
        let response = self.exchange_secure(&frame)?;
        commands::sign_hash::check(response.status())?;
        if response.payload().is_empty() {
            return Err(CodecError::MalformedResponse("empty signature").into());
        }
        Ok(response.into_payload())
    }

    fn exchange(&mut self, frame: &[u8]) -> Result<tapsign_apdu_core::Response> {
        let raw = self.transport.transmit_raw(frame)?;
        Ok(codec::decode_response(&raw)?)
    }

    fn exchange_secure(&mut self, frame: &[u8]) -> Result<tapsign_apdu_core::Response> {
        let raw = self.transport.transmit_raw(frame)?;
        Ok(codec::decode_secure_response(&raw, self.channel_mut()?)?)
    }

    fn channel_mut(&mut self) -> Result<&mut SecureChannelContext> {
        let actual = self.state;
        self.channel.as_mut().ok_or(SessionError::InvalidState {
            expected: SessionState::SecureChannelOpen,
            actual,
        })
    }

    fn ensure_state(&self, expected: SessionState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            warn!(%expected, actual = %self.state, "Card session step out of order");
            Err(SessionError::InvalidState {
                expected,
                actual: self.state,
            })
        }
    }

    fn advance<R>(&mut self, result: Result<R>, next: SessionState) -> Result<R> {
        match result {
            Ok(value) => {
                debug!(from = %self.state, to = %next, "Card session advanced");
                self.state = next;
                Ok(value)
            }
            Err(e) => {
                warn!(state = %self.state, error = %e, "Card session failed");
                self.state = SessionState::Failed;
                self.channel = None;
                self.failure = Some(e.clone());
                Err(e)
            }
        }
    }
}

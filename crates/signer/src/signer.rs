use bytes::Bytes;
use tapsign_apdu_core::{CardTransport, Clock, Connector, SystemClock, TransportSession};
use tapsign_card::{CardSession, Pin, SessionError};
use tracing::{debug, info, warn};

use crate::{SignedArtifact, SignerConfig, SigningRequest};

/// Signs messages with a tapped card
///
/// Holds only configuration; every call to [`sign`](Self::sign) opens and closes
/// its own transport session. Nothing is retried.
#[derive(Debug, Clone)]
pub struct Signer<C: Clock + Clone = SystemClock> {
    config: SignerConfig,
    clock: C,
}

impl Default for Signer {
    fn default() -> Self {
        Self::new(SignerConfig::default())
    }
}

impl Signer {
    /// Create a signer using the wall clock
    pub const fn new(config: SignerConfig) -> Self {
        Self {
            config,
            clock: SystemClock,
        }
    }
}

impl<C: Clock + Clone> Signer<C> {
    /// Create a signer measuring timeouts on `clock`
    pub const fn with_clock(config: SignerConfig, clock: C) -> Self {
        Self { config, clock }
    }

    /// Signer configuration
    pub const fn config(&self) -> &SignerConfig {
        &self.config
    }

    /// Sign `message` with the card behind `tag`
    ///
    /// The transport is closed before this returns, whatever the outcome.
    pub fn sign<K: Connector>(
        &self,
        connector: &mut K,
        tag: K::Tag,
        message: &str,
        pin: Pin,
    ) -> Result<SignedArtifact, SessionError> {
        let request = SigningRequest::new(message).with_key_index(self.config.session.key_index);
        self.sign_request(connector, tag, request, pin)
    }

    /// Sign a prepared request
    pub fn sign_request<K: Connector>(
        &self,
        connector: &mut K,
        tag: K::Tag,
        request: SigningRequest,
        pin: Pin,
    ) -> Result<SignedArtifact, SessionError> {
        debug!(digest = %hex::encode(request.digest), "Starting signing operation");

        let transport =
            TransportSession::open(connector, tag, self.config.transport, self.clock.clone())?;
        let session_config = self.config.session.clone().with_key_index(request.key_index);
        let mut session = CardSession::new(transport, session_config);

        let result = drive(&mut session, &request.digest, pin);
        session.into_transport().close();

        match result {
            Ok(signature) => {
                info!(len = signature.len(), "Message signed");
                Ok(SignedArtifact::new(request.message, signature))
            }
            Err(e) => {
                warn!(error = %e, "Signing failed");
                Err(e)
            }
        }
    }

    /// Sign and hand the outcome to `report` as display text
    ///
    /// Success carries the artifact string, failure the
    /// [`user_message`](SessionError::user_message) of the error.
    pub fn sign_and_report<K, F>(
        &self,
        connector: &mut K,
        tag: K::Tag,
        message: &str,
        pin: Pin,
        report: F,
    ) where
        K: Connector,
        F: FnOnce(Result<String, String>),
    {
        let outcome = self
            .sign(connector, tag, message, pin)
            .map(|artifact| artifact.to_string())
            .map_err(|e| e.user_message());
        report(outcome);
    }
}

fn drive<T: CardTransport>(
    session: &mut CardSession<T>,
    digest: &[u8; 32],
    pin: Pin,
) -> Result<Bytes, SessionError> {
    session.select_applet()?;
    session.fetch_status()?;
    session.open_secure_channel()?;
    session.verify_pin(pin)?;
    session.sign_hash(digest)
}

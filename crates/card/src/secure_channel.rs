//! Secure channel context and negotiation
//!
//! After the applet is selected, the host and the card run one ECDH handshake
//! over secp256k1. The card signs both ephemeral keys with its authentication
//! key, the host checks that proof, and both sides derive an AES-256 key and an
//! HMAC-SHA256 key from the shared secret. Every later command travels inside
//! an envelope sealed by [`SecureChannelContext::seal`].

use std::fmt;

use k256::{PublicKey, SecretKey, elliptic_curve::sec1::ToEncodedPoint};
use rand::RngCore;
use rand_v8::thread_rng;
use tapsign_apdu_core::CardTransport;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::codec;
use crate::commands::CardHandshake;
use crate::constants::envelope::{IV_LEN, IV_RANDOM_LEN, MAC_LEN};
use crate::crypto::{SessionKeys, generate_ecdh_shared_secret, verify_der_signature};
use crate::error::{CodecError, NegotiationError};

/// Negotiated keys and sequence counter of one secure channel
///
/// Both peers hold one. Sealing increments the counter and stamps it into the
/// IV; opening accepts only the counter immediately after the last one seen,
/// so a host request `n` is answered by card reply `n + 1`.
pub struct SecureChannelContext {
    /// Session keys
    keys: SessionKeys,
    /// Last sequence number sent or accepted
    counter: u32,
}

impl fmt::Debug for SecureChannelContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecureChannelContext")
            .field("counter", &self.counter)
            .finish_non_exhaustive()
    }
}

impl SecureChannelContext {
    /// Start a channel with freshly derived keys
    pub const fn new(keys: SessionKeys) -> Self {
        Self { keys, counter: 0 }
    }

    /// Last sequence number sent or accepted
    pub const fn counter(&self) -> u32 {
        self.counter
    }

    /// Encrypt and authenticate a message under the next sequence number
    ///
    /// `iv(16) || be16(len ct) || ct || be16(len tag) || tag(32)`
    pub fn seal(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CodecError> {
        let counter = self
            .counter
            .checked_add(1)
            .ok_or(CodecError::SequenceExhausted)?;
        self.counter = counter;

        let mut iv = [0u8; IV_LEN];
        rand::rng().fill_bytes(&mut iv[..IV_RANDOM_LEN]);
        iv[IV_RANDOM_LEN..].copy_from_slice(&counter.to_be_bytes());

        let ciphertext = self.keys.encrypt(&iv, plaintext);
        let ct_len = u16::try_from(ciphertext.len())
            .map_err(|_| tapsign_apdu_core::Error::CommandDataTooLong(ciphertext.len()))?
            .to_be_bytes();
        let tag = self.keys.tag(&[&iv, &ct_len, &ciphertext])?;

        let mut envelope = Vec::with_capacity(IV_LEN + 2 + ciphertext.len() + 2 + MAC_LEN);
        envelope.extend_from_slice(&iv);
        envelope.extend_from_slice(&ct_len);
        envelope.extend_from_slice(&ciphertext);
        envelope.extend_from_slice(&(MAC_LEN as u16).to_be_bytes());
        envelope.extend_from_slice(&tag);
        Ok(envelope)
    }

    /// Verify and decrypt an envelope from the peer
    ///
    /// Fails with [`CodecError::MalformedResponse`] if the declared lengths do
    /// not match the envelope and with [`CodecError::AuthenticationFailed`] if
    /// the tag or the sequence number is wrong. The context is left unchanged on
    /// failure.
    pub fn open(&mut self, envelope: &[u8]) -> Result<Zeroizing<Vec<u8>>, CodecError> {
        let parts = EnvelopeParts::split(envelope)?;
        self.keys
            .verify_tag(&[parts.iv, parts.ct_len, parts.ciphertext], parts.tag)
            .inspect_err(|_| warn!("Secure channel tag mismatch"))?;

        let expected = self
            .counter
            .checked_add(1)
            .ok_or(CodecError::SequenceExhausted)?;
        let mut counter = [0u8; 4];
        counter.copy_from_slice(&parts.iv[IV_RANDOM_LEN..]);
        let counter = u32::from_be_bytes(counter);
        if counter != expected {
            warn!(counter, expected, "Secure channel sequence mismatch");
            return Err(CodecError::AuthenticationFailed);
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(parts.iv);
        let plaintext = Zeroizing::new(self.keys.decrypt(&iv, parts.ciphertext)?);
        self.counter = counter;
        Ok(plaintext)
    }
}

/// Borrowed fields of a received envelope
struct EnvelopeParts<'a> {
    iv: &'a [u8],
    ct_len: &'a [u8],
    ciphertext: &'a [u8],
    tag: &'a [u8],
}

impl<'a> EnvelopeParts<'a> {
    fn split(envelope: &'a [u8]) -> Result<Self, CodecError> {
        if envelope.len() < IV_LEN + 2 {
            return Err(CodecError::MalformedResponse("secure envelope too short"));
        }
        let (iv, rest) = envelope.split_at(IV_LEN);
        let (ct_len, rest) = rest.split_at(2);
        let len = u16::from_be_bytes([ct_len[0], ct_len[1]]) as usize;
        if len == 0 || len % 16 != 0 || rest.len() < len + 2 {
            return Err(CodecError::MalformedResponse("secure envelope length mismatch"));
        }
        let (ciphertext, rest) = rest.split_at(len);
        let (tag_len, tag) = rest.split_at(2);
        if u16::from_be_bytes([tag_len[0], tag_len[1]]) as usize != MAC_LEN || tag.len() != MAC_LEN
        {
            return Err(CodecError::MalformedResponse("secure envelope tag length mismatch"));
        }

        Ok(Self {
            iv,
            ct_len,
            ciphertext,
            tag,
        })
    }
}

/// Run the secure channel handshake over an open transport
///
/// When `trusted_keys` is non-empty the card's authentication key must be one
/// of them. No context is produced unless the card's proof verifies.
pub fn negotiate<T>(
    transport: &mut T,
    trusted_keys: &[PublicKey],
) -> Result<SecureChannelContext, NegotiationError>
where
    T: CardTransport + ?Sized,
{
    let host_secret = SecretKey::random(&mut thread_rng());
    let host_public = host_secret.public_key();

    debug!("Initiating secure channel");
    let frame = codec::encode_initiate_secure_channel(&host_public)?;
    let response = codec::decode_response(&transport.transmit_raw(&frame)?)?;
    if !response.is_success() {
        return Err(NegotiationError::Rejected(response.status()));
    }

    let handshake = CardHandshake::parse(response.payload())?;
    let card_ephemeral = PublicKey::from_sec1_bytes(&handshake.card_ephemeral)
        .map_err(|_| NegotiationError::ProtocolError("invalid card ephemeral key"))?;
    let authentication_key = PublicKey::from_sec1_bytes(&handshake.authentication_key)
        .map_err(|_| NegotiationError::CardAuthenticationFailed)?;

    if !trusted_keys.is_empty() && !trusted_keys.contains(&authentication_key) {
        warn!(
            key = %hex::encode(&handshake.authentication_key),
            "Card authentication key is not trusted"
        );
        return Err(NegotiationError::CardAuthenticationFailed);
    }

    let host_point = host_public.to_encoded_point(false);
    let transcript = [handshake.card_ephemeral.as_ref(), host_point.as_bytes()].concat();
    if !verify_der_signature(&authentication_key, &transcript, &handshake.proof) {
        warn!("Card authentication proof did not verify");
        return Err(NegotiationError::CardAuthenticationFailed);
    }

    let shared_secret = generate_ecdh_shared_secret(&host_secret, &card_ephemeral);
    let keys = SessionKeys::derive(&shared_secret)?;

    debug!(
        key = %hex::encode(&handshake.authentication_key),
        "Secure channel established"
    );
    Ok(SecureChannelContext::new(keys))
}

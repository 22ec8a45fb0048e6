//! In-memory signing card for tests and demos
//!
//! [`SimulatedCard`] answers the applet commands the way a real card does,
//! including the secure channel handshake with a genuine authentication key.
//! [`SimulatedConnector`] hands it out as a [`CardLink`] and records every frame
//! and disconnect so tests can assert on the traffic.

use std::sync::Arc;
use std::time::Duration;

use k256::{
    PublicKey, SecretKey,
    ecdsa::{Signature, SigningKey, signature::Signer, signature::hazmat::PrehashSigner},
    elliptic_curve::sec1::ToEncodedPoint,
};
use parking_lot::{Mutex, MutexGuard};
use rand_v8::thread_rng;
use tapsign_apdu_core::{
    Bytes, CardLink, Connector, ManualClock, Response, StatusWord, TransportError,
    prelude::status as sw,
};
use tracing::trace;

use crate::codec;
use crate::commands::CardHandshake;
use crate::constants::{CLA_ISO, CLA_SATOCHIP, DEFAULT_KEY_INDEX, SATOCHIP_AID, ins, status};
use crate::crypto::{SessionKeys, generate_ecdh_shared_secret};
use crate::secure_channel::SecureChannelContext;
use crate::types::{CardStatus, Version};

const DEFAULT_PIN_TRIES: u8 = 3;
const INTERNAL_ERROR: StatusWord = StatusWord::new(0x6F, 0x00);

/// What the card does with one frame
#[derive(Debug)]
enum Exchange {
    /// Answer after the configured delay
    Answer(Bytes),
    /// Never answer
    Silent,
    /// Leave the field
    Removed,
}

/// A signing card living in memory
pub struct SimulatedCard {
    authentication_key: SigningKey,
    signing_key: SigningKey,
    pin: Vec<u8>,
    pin_max_tries: u8,
    pin_tries: u8,
    applet_installed: bool,
    status_override: Option<StatusWord>,
    forge_proof: bool,
    canned_signature: Option<Bytes>,
    response_delay: Duration,
    silent_after: Option<usize>,
    removed_after: Option<usize>,

    selected: bool,
    channel: Option<SecureChannelContext>,
    pin_verified: bool,
    exchanges: usize,
}

impl std::fmt::Debug for SimulatedCard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedCard")
            .field("pin_tries", &self.pin_tries)
            .field("selected", &self.selected)
            .field("channel_open", &self.channel.is_some())
            .field("pin_verified", &self.pin_verified)
            .field("exchanges", &self.exchanges)
            .finish_non_exhaustive()
    }
}

impl SimulatedCard {
    /// A card with the applet installed, fresh keys and the given PIN
    pub fn new(pin: impl Into<Vec<u8>>) -> Self {
        Self {
            authentication_key: SigningKey::random(&mut thread_rng()),
            signing_key: SigningKey::random(&mut thread_rng()),
            pin: pin.into(),
            pin_max_tries: DEFAULT_PIN_TRIES,
            pin_tries: DEFAULT_PIN_TRIES,
            applet_installed: true,
            status_override: None,
            forge_proof: false,
            canned_signature: None,
            response_delay: Duration::ZERO,
            silent_after: None,
            removed_after: None,
            selected: false,
            channel: None,
            pin_verified: false,
            exchanges: 0,
        }
    }

    /// Use a fixed authentication key
    pub fn with_authentication_key(mut self, key: SigningKey) -> Self {
        self.authentication_key = key;
        self
    }

    /// Use a fixed signing key in slot 0
    pub fn with_signing_key(mut self, key: SigningKey) -> Self {
        self.signing_key = key;
        self
    }

    /// Set the PIN retry counter
    pub const fn with_pin_tries(mut self, tries: u8) -> Self {
        self.pin_max_tries = tries;
        self.pin_tries = tries;
        self
    }

    /// A card that does not carry the signing applet
    pub const fn without_applet(mut self) -> Self {
        self.applet_installed = false;
        self
    }

    /// Answer GET STATUS with a bare status word
    pub const fn with_status_word(mut self, status: StatusWord) -> Self {
        self.status_override = Some(status);
        self
    }

    /// Sign the handshake with a key other than the one presented
    pub const fn with_forged_proof(mut self) -> Self {
        self.forge_proof = true;
        self
    }

    /// Return these bytes instead of a real signature
    pub fn with_canned_signature(mut self, signature: impl Into<Bytes>) -> Self {
        self.canned_signature = Some(signature.into());
        self
    }

    /// Delay every answer
    pub const fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = delay;
        self
    }

    /// Stop answering after `n` exchanges
    pub const fn silent_after(mut self, n: usize) -> Self {
        self.silent_after = Some(n);
        self
    }

    /// Leave the field on exchange `n + 1`
    pub const fn removed_after(mut self, n: usize) -> Self {
        self.removed_after = Some(n);
        self
    }

    /// Public authentication key presented in the handshake
    pub fn authentication_public_key(&self) -> PublicKey {
        PublicKey::from(self.authentication_key.verifying_key())
    }

    /// Public key of the signing slot
    pub fn signing_public_key(&self) -> PublicKey {
        PublicKey::from(self.signing_key.verifying_key())
    }

    /// PIN tries left
    pub const fn pin_tries_remaining(&self) -> u8 {
        self.pin_tries
    }

    /// Frames received so far
    pub const fn exchanges(&self) -> usize {
        self.exchanges
    }

    fn exchange(&mut self, frame: &[u8]) -> Exchange {
        let index = self.exchanges;
        self.exchanges += 1;
        if self.removed_after.is_some_and(|n| index >= n) {
            return Exchange::Removed;
        }
        if self.silent_after.is_some_and(|n| index >= n) {
            return Exchange::Silent;
        }
        Exchange::Answer(self.process(frame))
    }

    /// Answer one command frame
    pub fn process(&mut self, frame: &[u8]) -> Bytes {
        let Ok(command) = codec::decode_command(frame) else {
            return status_only(sw::WRONG_LENGTH);
        };

        match (command.cla, command.ins) {
            (CLA_ISO, ins::SELECT) => self.select(command.data()),
            (CLA_SATOCHIP, _) if !self.selected => status_only(sw::CLASS_NOT_SUPPORTED),
            (CLA_SATOCHIP, ins::GET_STATUS) => self.status(),
            (CLA_SATOCHIP, ins::INIT_SECURE_CHANNEL) => self.init_secure_channel(command.data()),
            (CLA_SATOCHIP, ins::PROCESS_SECURE_CHANNEL) => self.process_secure(frame),
            (CLA_SATOCHIP, ins::VERIFY_PIN | ins::SIGN_HASH) => {
                status_only(status::SECURE_CHANNEL_REQUIRED)
            }
            _ => status_only(sw::INVALID_INSTRUCTION),
        }
    }

    fn select(&mut self, aid: &[u8]) -> Bytes {
        self.selected = self.applet_installed && aid == SATOCHIP_AID;
        self.channel = None;
        self.pin_verified = false;
        if self.selected {
            status_only(sw::SUCCESS)
        } else {
            status_only(sw::FILE_NOT_FOUND)
        }
    }

    fn status(&self) -> Bytes {
        if let Some(status) = self.status_override {
            return status_only(status);
        }
        let status = CardStatus {
            protocol_version: Version::new(0, 1),
            applet_version: Version::new(0, 12),
            pin_tries_remaining: self.pin_tries,
            puk_tries_remaining: 5,
            needs_2fa: Some(false),
            is_seeded: Some(true),
            setup_done: Some(true),
            needs_secure_channel: Some(true),
        };
        Response::success(status.to_bytes()).to_bytes()
    }

    fn init_secure_channel(&mut self, host_ephemeral: &[u8]) -> Bytes {
        let Ok(host_public) = PublicKey::from_sec1_bytes(host_ephemeral) else {
            return status_only(sw::INCORRECT_DATA);
        };

        let card_secret = SecretKey::random(&mut thread_rng());
        let card_point = card_secret.public_key().to_encoded_point(false);
        let transcript = [card_point.as_bytes(), host_ephemeral].concat();

        let proof: Signature = if self.forge_proof {
            SigningKey::random(&mut thread_rng()).sign(&transcript)
        } else {
            self.authentication_key.sign(&transcript)
        };
        let authentication_key = self
            .authentication_public_key()
            .to_encoded_point(false)
            .as_bytes()
            .to_vec();

        let shared_secret = generate_ecdh_shared_secret(&card_secret, &host_public);
        let Ok(keys) = SessionKeys::derive(&shared_secret) else {
            return status_only(INTERNAL_ERROR);
        };
        self.channel = Some(SecureChannelContext::new(keys));
        self.pin_verified = false;

        let handshake = CardHandshake {
            card_ephemeral: Bytes::copy_from_slice(card_point.as_bytes()),
            proof: Bytes::copy_from_slice(proof.to_der().as_bytes()),
            authentication_key: authentication_key.into(),
        };
        match handshake.to_bytes() {
            Ok(payload) => Response::success(payload).to_bytes(),
            Err(_) => status_only(INTERNAL_ERROR),
        }
    }

    fn process_secure(&mut self, frame: &[u8]) -> Bytes {
        let Some(mut channel) = self.channel.take() else {
            return status_only(status::SECURE_CHANNEL_REQUIRED);
        };
        let reply = self.process_wrapped(frame, &mut channel);
        self.channel = Some(channel);
        reply
    }

    fn process_wrapped(&mut self, frame: &[u8], channel: &mut SecureChannelContext) -> Bytes {
        let Ok(inner) = codec::unwrap_command(frame, channel) else {
            return status_only(status::SECURE_CHANNEL_WRONG_MAC);
        };

        let (data, status) = match codec::decode_command(&inner) {
            Ok(command) if command.ins == ins::VERIFY_PIN => {
                self.verify_pin(command.p1, command.data())
            }
            Ok(command) if command.ins == ins::SIGN_HASH => {
                self.sign_hash(command.p1, command.data())
            }
            Ok(_) => (Vec::new(), sw::INVALID_INSTRUCTION),
            Err(_) => (Vec::new(), sw::WRONG_LENGTH),
        };

        codec::wrap_response(&data, status, channel).unwrap_or_else(|_| status_only(INTERNAL_ERROR))
    }

    fn verify_pin(&mut self, slot: u8, pin: &[u8]) -> (Vec<u8>, StatusWord) {
        if slot != 0 {
            return (Vec::new(), sw::INCORRECT_P1P2);
        }
        if self.pin_tries == 0 {
            return (Vec::new(), status::PIN_BLOCKED);
        }
        if pin == self.pin.as_slice() {
            self.pin_tries = self.pin_max_tries;
            self.pin_verified = true;
            return (Vec::new(), sw::SUCCESS);
        }

        self.pin_tries -= 1;
        self.pin_verified = false;
        trace!(remaining = self.pin_tries, "Simulated card rejected PIN");
        (Vec::new(), StatusWord::new(0x63, 0xC0 | self.pin_tries))
    }

    fn sign_hash(&mut self, key_index: u8, digest: &[u8]) -> (Vec<u8>, StatusWord) {
        if !self.pin_verified {
            return (Vec::new(), status::UNAUTHORIZED);
        }
        if key_index != DEFAULT_KEY_INDEX {
            return (Vec::new(), status::KEY_NOT_INITIALIZED);
        }
        if digest.len() != 32 {
            return (Vec::new(), sw::WRONG_LENGTH);
        }
        if let Some(signature) = &self.canned_signature {
            return (signature.to_vec(), sw::SUCCESS);
        }

        let signature: Result<Signature, _> = self.signing_key.sign_prehash(digest);
        match signature {
            Ok(signature) => (signature.to_der().as_bytes().to_vec(), sw::SUCCESS),
            Err(_) => (Vec::new(), INTERNAL_ERROR),
        }
    }
}

fn status_only(status: StatusWord) -> Bytes {
    Response::error(status).to_bytes()
}

/// Traffic seen by the simulated reader
#[derive(Debug, Default)]
struct LinkRecord {
    sent: Vec<Bytes>,
    connects: usize,
    disconnects: usize,
}

/// Link to a [`SimulatedCard`]
#[derive(Debug)]
pub struct SimulatedLink {
    card: Arc<Mutex<SimulatedCard>>,
    record: Arc<Mutex<LinkRecord>>,
    clock: Option<Arc<ManualClock>>,
    pending: Option<Exchange>,
    waited: Duration,
    connected: bool,
}

impl SimulatedLink {
    /// Let `wait` pass on the test clock, or for real without one
    fn idle(&self, wait: Duration) {
        match &self.clock {
            Some(clock) => clock.advance(wait),
            None => std::thread::sleep(wait),
        }
    }
}

impl CardLink for SimulatedLink {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::connection_lost());
        }
        self.record.lock().sent.push(Bytes::copy_from_slice(frame));
        self.pending = Some(self.card.lock().exchange(frame));
        self.waited = Duration::ZERO;
        Ok(())
    }

    fn receive(&mut self, wait: Duration) -> Result<Option<Bytes>, TransportError> {
        match self.pending.take() {
            Some(Exchange::Removed) => {
                self.connected = false;
                Err(TransportError::connection_lost())
            }
            Some(Exchange::Answer(response)) => {
                let delay = self.card.lock().response_delay;
                if self.waited + wait >= delay {
                    self.idle(delay - self.waited);
                    Ok(Some(response))
                } else {
                    self.idle(wait);
                    self.waited += wait;
                    self.pending = Some(Exchange::Answer(response));
                    Ok(None)
                }
            }
            pending => {
                self.idle(wait);
                self.pending = pending;
                Ok(None)
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.record.lock().disconnects += 1;
    }
}

/// Reader with a [`SimulatedCard`] on it
#[derive(Debug, Clone)]
pub struct SimulatedConnector {
    card: Arc<Mutex<SimulatedCard>>,
    record: Arc<Mutex<LinkRecord>>,
    clock: Option<Arc<ManualClock>>,
    compatible: bool,
}

impl SimulatedConnector {
    /// Put a card on the reader
    pub fn new(card: SimulatedCard) -> Self {
        Self {
            card: Arc::new(Mutex::new(card)),
            record: Arc::new(Mutex::new(LinkRecord::default())),
            clock: None,
            compatible: true,
        }
    }

    /// Let idle waits advance a manual clock instead of sleeping
    pub fn with_clock(mut self, clock: Arc<ManualClock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Present a tag that does not speak ISO-DEP
    pub const fn incompatible(mut self) -> Self {
        self.compatible = false;
        self
    }

    /// Access the card
    pub fn card(&self) -> MutexGuard<'_, SimulatedCard> {
        self.card.lock()
    }

    /// Every frame sent so far
    pub fn sent_frames(&self) -> Vec<Bytes> {
        self.record.lock().sent.clone()
    }

    /// Number of successful connects
    pub fn connects(&self) -> usize {
        self.record.lock().connects
    }

    /// Number of link disconnects
    pub fn disconnects(&self) -> usize {
        self.record.lock().disconnects
    }
}

impl Connector for SimulatedConnector {
    type Tag = ();
    type Link = SimulatedLink;

    fn connect(&mut self, _tag: ()) -> Result<SimulatedLink, TransportError> {
        if !self.compatible {
            return Err(TransportError::unavailable("tag does not support ISO-DEP"));
        }
        self.record.lock().connects += 1;
        Ok(SimulatedLink {
            card: Arc::clone(&self.card),
            record: Arc::clone(&self.record),
            clock: self.clock.clone(),
            pending: None,
            waited: Duration::ZERO,
            connected: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_applet_commands_need_select() {
        let mut card = SimulatedCard::new("1234");
        let reply = card.process(&codec::encode_get_status().unwrap());
        assert_eq!(reply.as_ref(), &[0x6E, 0x00]);

        assert_eq!(card.process(&codec::encode_select_applet().unwrap()).as_ref(), &[0x90, 0x00]);
        let reply = card.process(&codec::encode_get_status().unwrap());
        assert_eq!(&reply[reply.len() - 2..], &[0x90, 0x00]);
    }

    #[test]
    fn test_plain_pin_is_refused() {
        let mut card = SimulatedCard::new("1234");
        card.process(&codec::encode_select_applet().unwrap());
        let reply = card.process(&hex::decode("B04200000431323334").unwrap());
        assert_eq!(reply.as_ref(), &[0x9C, 0x20]);
        assert_eq!(card.pin_tries_remaining(), 3);
    }

    #[test]
    fn test_missing_applet() {
        let mut card = SimulatedCard::new("1234").without_applet();
        let reply = card.process(&codec::encode_select_applet().unwrap());
        assert_eq!(reply.as_ref(), &[0x6A, 0x82]);
    }
}

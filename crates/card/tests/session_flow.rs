use std::sync::Arc;
use std::time::Duration;

use k256::ecdsa::{Signature, SigningKey, VerifyingKey, signature::hazmat::PrehashVerifier};
use sha2::{Digest, Sha256};
use tapsign_apdu_core::{ManualClock, StatusWord, TransportConfig, TransportError, TransportSession};
use tapsign_card::sim::{SimulatedCard, SimulatedConnector, SimulatedLink};
use tapsign_card::{CardSession, NegotiationError, Pin, SessionConfig, SessionError, SessionState};

type SimSession = CardSession<TransportSession<SimulatedLink, Arc<ManualClock>>>;

fn open_session(card: SimulatedCard, config: SessionConfig) -> (SimSession, SimulatedConnector, Arc<ManualClock>) {
    let clock = ManualClock::new();
    let mut connector = SimulatedConnector::new(card).with_clock(Arc::clone(&clock));
    let transport =
        TransportSession::open(&mut connector, (), TransportConfig::default(), Arc::clone(&clock))
            .unwrap();
    (CardSession::new(transport, config), connector, clock)
}

fn digest(message: &[u8]) -> [u8; 32] {
    Sha256::digest(message).into()
}

fn run_to_pin(session: &mut SimSession) {
    session.select_applet().unwrap();
    session.fetch_status().unwrap();
    session.open_secure_channel().unwrap();
}

#[test]
fn test_full_flow_produces_verifiable_signature() {
    let (mut session, connector, _clock) =
        open_session(SimulatedCard::new("1234"), SessionConfig::default());
    let digest = digest(b"hello mesh");

    session.select_applet().unwrap();
    assert_eq!(session.state(), SessionState::AppletSelected);

    let status = session.fetch_status().unwrap().unwrap();
    assert_eq!(status.pin_tries_remaining, 3);
    assert_eq!(session.state(), SessionState::StatusKnown);

    session.open_secure_channel().unwrap();
    assert_eq!(session.state(), SessionState::SecureChannelOpen);

    session.verify_pin(Pin::from("1234")).unwrap();
    assert_eq!(session.state(), SessionState::PinVerified);

    let signature = session.sign_hash(&digest).unwrap();
    assert_eq!(session.state(), SessionState::Signed);
    assert!(session.state().is_terminal());

    let signature = Signature::from_der(&signature).unwrap();
    let key = VerifyingKey::from(&connector.card().signing_public_key());
    key.verify_prehash(&digest, &signature).unwrap();

    let frames = connector.sent_frames();
    assert_eq!(frames.len(), 5);
    assert_eq!(&frames[0][..2], &[0x00, 0xA4]);
    assert_eq!(&frames[1][..2], &[0xB0, 0x3C]);
    assert_eq!(&frames[2][..2], &[0xB0, 0x81]);
    assert_eq!(&frames[3][..2], &[0xB0, 0x82]);
    assert_eq!(&frames[4][..2], &[0xB0, 0x82]);
    // The PIN never travels in the clear
    assert!(!frames[3].windows(4).any(|w| w == b"1234"));
}

#[test]
fn test_wrong_pin_reports_remaining_and_fails_session() {
    let (mut session, connector, _clock) =
        open_session(SimulatedCard::new("1234"), SessionConfig::default());
    run_to_pin(&mut session);

    let err = session.verify_pin(Pin::from("0000")).unwrap_err();
    assert_eq!(err, SessionError::WrongPin { remaining: 2 });
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(session.failure(), Some(&err));
    assert_eq!(connector.card().pin_tries_remaining(), 2);

    assert_eq!(
        session.sign_hash(&digest(b"x")),
        Err(SessionError::InvalidState {
            expected: SessionState::PinVerified,
            actual: SessionState::Failed,
        })
    );
    assert_eq!(connector.sent_frames().len(), 4);
}

#[test]
fn test_last_try_blocks_pin() {
    let (mut session, _connector, _clock) = open_session(
        SimulatedCard::new("1234").with_pin_tries(1),
        SessionConfig::default(),
    );
    run_to_pin(&mut session);

    assert_eq!(
        session.verify_pin(Pin::from("9999")),
        Err(SessionError::PinBlocked)
    );
}

#[test]
fn test_forged_proof_stops_before_pin() {
    let (mut session, connector, _clock) = open_session(
        SimulatedCard::new("1234").with_forged_proof(),
        SessionConfig::default(),
    );
    session.select_applet().unwrap();
    session.fetch_status().unwrap();

    assert_eq!(
        session.open_secure_channel(),
        Err(SessionError::Negotiation(
            NegotiationError::CardAuthenticationFailed
        ))
    );
    assert_eq!(session.state(), SessionState::Failed);
    assert!(matches!(
        session.verify_pin(Pin::from("1234")),
        Err(SessionError::InvalidState { .. })
    ));
    assert_eq!(connector.sent_frames().len(), 3);
}

#[test]
fn test_second_negotiation_is_rejected_without_traffic() {
    let (mut session, connector, _clock) =
        open_session(SimulatedCard::new("1234"), SessionConfig::default());
    run_to_pin(&mut session);
    assert_eq!(connector.sent_frames().len(), 3);

    assert_eq!(
        session.open_secure_channel(),
        Err(SessionError::InvalidState {
            expected: SessionState::StatusKnown,
            actual: SessionState::SecureChannelOpen,
        })
    );
    assert_eq!(session.state(), SessionState::SecureChannelOpen);
    assert_eq!(connector.sent_frames().len(), 3);

    // The first channel is still usable
    session.verify_pin(Pin::from("1234")).unwrap();
    assert_eq!(session.state(), SessionState::PinVerified);
}

#[test]
fn test_trusted_card_keys() {
    let stranger = SigningKey::from_slice(&[0x42; 32]).unwrap();
    let config = SessionConfig::default()
        .with_trusted_card_key(k256::PublicKey::from(stranger.verifying_key()));
    let (mut session, _connector, _clock) = open_session(SimulatedCard::new("1234"), config);
    session.select_applet().unwrap();
    session.fetch_status().unwrap();
    assert_eq!(
        session.open_secure_channel(),
        Err(SessionError::Negotiation(
            NegotiationError::CardAuthenticationFailed
        ))
    );

    let authentication_key = SigningKey::from_slice(&[0x24; 32]).unwrap();
    let card = SimulatedCard::new("1234").with_authentication_key(authentication_key.clone());
    let config = SessionConfig::default()
        .with_trusted_card_key(k256::PublicKey::from(authentication_key.verifying_key()));
    let (mut session, _connector, _clock) = open_session(card, config);
    run_to_pin(&mut session);
    assert_eq!(session.state(), SessionState::SecureChannelOpen);
}

#[test]
fn test_missing_status_is_tolerated_by_default() {
    let card = SimulatedCard::new("1234").with_status_word(StatusWord::new(0x6D, 0x00));
    let (mut session, _connector, _clock) = open_session(card, SessionConfig::default());

    session.select_applet().unwrap();
    assert_eq!(session.fetch_status(), Ok(None));
    assert_eq!(session.state(), SessionState::StatusKnown);
    assert!(session.status().is_none());

    session.open_secure_channel().unwrap();
    session.verify_pin(Pin::from("1234")).unwrap();
    assert!(session.sign_hash(&digest(b"status-less")).is_ok());
}

#[test]
fn test_missing_status_fails_when_required() {
    let card = SimulatedCard::new("1234").with_status_word(StatusWord::new(0x6D, 0x00));
    let config = SessionConfig::default().with_require_status(true);
    let (mut session, _connector, _clock) = open_session(card, config);

    session.select_applet().unwrap();
    assert!(matches!(
        session.fetch_status(),
        Err(SessionError::StatusUnavailable(_))
    ));
    assert_eq!(session.state(), SessionState::Failed);
}

#[test]
fn test_status_timeout_is_fatal_even_when_lenient() {
    let card = SimulatedCard::new("1234").silent_after(1);
    let (mut session, _connector, clock) = open_session(card, SessionConfig::default());

    session.select_applet().unwrap();
    let err = session.fetch_status().unwrap_err();
    assert_eq!(
        err,
        SessionError::Transport(TransportError::Timeout {
            elapsed: Duration::from_secs(120)
        })
    );
    assert_eq!(clock.elapsed(), Duration::from_secs(120));
    assert_eq!(session.state(), SessionState::Failed);
}

#[test]
fn test_missing_applet() {
    let (mut session, _connector, _clock) = open_session(
        SimulatedCard::new("1234").without_applet(),
        SessionConfig::default(),
    );

    assert_eq!(
        session.select_applet(),
        Err(SessionError::AppletNotFound(StatusWord::new(0x6A, 0x82)))
    );
    assert_eq!(session.state(), SessionState::Failed);
}

#[test]
fn test_card_removed_while_signing() {
    let (mut session, _connector, _clock) = open_session(
        SimulatedCard::new("1234").removed_after(4),
        SessionConfig::default(),
    );
    run_to_pin(&mut session);
    session.verify_pin(Pin::from("1234")).unwrap();

    let err = session.sign_hash(&digest(b"gone")).unwrap_err();
    assert!(matches!(err, SessionError::Transport(TransportError::Io(_))));
    assert_eq!(session.state(), SessionState::Failed);
}

#[test]
fn test_signature_bytes_are_passed_through() {
    let canned = vec![0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02];
    let (mut session, _connector, _clock) = open_session(
        SimulatedCard::new("1234").with_canned_signature(canned.clone()),
        SessionConfig::default(),
    );
    run_to_pin(&mut session);
    session.verify_pin(Pin::from("1234")).unwrap();

    assert_eq!(session.sign_hash(&digest(b"m")).unwrap().as_ref(), canned.as_slice());
}

#[test]
fn test_unknown_key_slot_is_rejected() {
    let config = SessionConfig::default().with_key_index(3);
    let (mut session, _connector, _clock) = open_session(SimulatedCard::new("1234"), config);
    run_to_pin(&mut session);
    session.verify_pin(Pin::from("1234")).unwrap();

    assert_eq!(
        session.sign_hash(&digest(b"m")),
        Err(SessionError::SigningRejected(StatusWord::new(0x9C, 0x0F)))
    );
}

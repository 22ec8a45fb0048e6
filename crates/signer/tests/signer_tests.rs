use std::sync::Arc;
use std::time::Duration;

use k256::ecdsa::{SigningKey, VerifyingKey};
use tapsign_apdu_core::{ManualClock, TransportError};
use tapsign_card::sim::{SimulatedCard, SimulatedConnector};
use tapsign_card::{NegotiationError, SessionConfig};
use tapsign_signer::{Pin, SessionError, Signer, SignerConfig};

fn signer_with_clock(config: SignerConfig) -> (Signer<Arc<ManualClock>>, Arc<ManualClock>) {
    let clock = ManualClock::new();
    (Signer::with_clock(config, Arc::clone(&clock)), clock)
}

#[test]
fn test_artifact_is_message_and_hex_signature() {
    let signing_key = SigningKey::from_slice(&[0x31; 32]).unwrap();
    let card = SimulatedCard::new("1234").with_signing_key(signing_key.clone());
    let (signer, clock) = signer_with_clock(SignerConfig::default());
    let mut connector = SimulatedConnector::new(card).with_clock(clock);

    let artifact = signer
        .sign(&mut connector, (), "hello mesh", Pin::from("1234"))
        .unwrap();

    let text = artifact.to_string();
    let (message, signature) = text.split_once(':').unwrap();
    assert_eq!(message, "hello mesh");
    assert_eq!(signature, hex::encode(artifact.signature()));
    assert!(signature.chars().all(|c| c.is_ascii_digit() || c.is_ascii_lowercase()));
    assert!(artifact.verify(&VerifyingKey::from(&signing_key)));

    assert_eq!(connector.connects(), 1);
    assert_eq!(connector.disconnects(), 1);
    assert_eq!(connector.sent_frames().len(), 5);
}

#[test]
fn test_canned_signature_lands_in_artifact() {
    let card = SimulatedCard::new("1234").with_canned_signature(vec![0xDE, 0xAD, 0xBE, 0xEF]);
    let (signer, clock) = signer_with_clock(SignerConfig::default());
    let mut connector = SimulatedConnector::new(card).with_clock(clock);

    let artifact = signer.sign(&mut connector, (), "m", Pin::from("1234")).unwrap();
    assert_eq!(artifact.to_string(), "m:deadbeef");
}

#[test]
fn test_wrong_pin_disconnects_once() {
    let (signer, clock) = signer_with_clock(SignerConfig::default());
    let mut connector = SimulatedConnector::new(SimulatedCard::new("1234")).with_clock(clock);

    let err = signer
        .sign(&mut connector, (), "hello", Pin::from("9999"))
        .unwrap_err();

    assert_eq!(err, SessionError::WrongPin { remaining: 2 });
    assert_eq!(err.user_message(), "Wrong PIN. 2 attempts remaining.");
    assert_eq!(connector.disconnects(), 1);
    assert_eq!(connector.sent_frames().len(), 4);
}

#[test]
fn test_forged_card_gets_no_pin() {
    let (signer, clock) = signer_with_clock(SignerConfig::default());
    let card = SimulatedCard::new("1234").with_forged_proof();
    let mut connector = SimulatedConnector::new(card).with_clock(clock);

    let err = signer
        .sign(&mut connector, (), "hello", Pin::from("1234"))
        .unwrap_err();

    assert_eq!(
        err,
        SessionError::Negotiation(NegotiationError::CardAuthenticationFailed)
    );
    // select, status, handshake and nothing after
    assert_eq!(connector.sent_frames().len(), 3);
    assert_eq!(connector.card().pin_tries_remaining(), 3);
    assert_eq!(connector.disconnects(), 1);
}

#[test]
fn test_untrusted_card_is_refused() {
    let trusted = SigningKey::from_slice(&[0x55; 32]).unwrap();
    let config = SignerConfig::default().with_session(
        SessionConfig::default().with_trusted_card_key(k256::PublicKey::from(trusted.verifying_key())),
    );
    let (signer, clock) = signer_with_clock(config);

    let mut stranger = SimulatedConnector::new(SimulatedCard::new("1234")).with_clock(Arc::clone(&clock));
    assert_eq!(
        signer.sign(&mut stranger, (), "m", Pin::from("1234")),
        Err(SessionError::Negotiation(NegotiationError::CardAuthenticationFailed))
    );

    let card = SimulatedCard::new("1234").with_authentication_key(trusted);
    let mut known = SimulatedConnector::new(card).with_clock(clock);
    assert!(signer.sign(&mut known, (), "m", Pin::from("1234")).is_ok());
}

#[test]
fn test_silent_card_times_out_at_budget() {
    let (signer, clock) = signer_with_clock(SignerConfig::default());
    let card = SimulatedCard::new("1234").silent_after(0);
    let mut connector = SimulatedConnector::new(card).with_clock(Arc::clone(&clock));

    let err = signer
        .sign(&mut connector, (), "hello", Pin::from("1234"))
        .unwrap_err();

    assert_eq!(
        err,
        SessionError::Transport(TransportError::Timeout {
            elapsed: Duration::from_secs(120)
        })
    );
    assert_eq!(clock.elapsed(), Duration::from_secs(120));
    assert_eq!(connector.disconnects(), 1);
}

#[test]
fn test_slow_card_within_budget_signs() {
    let (signer, clock) = signer_with_clock(SignerConfig::default());
    let card = SimulatedCard::new("1234").with_response_delay(Duration::from_secs(119));
    let mut connector = SimulatedConnector::new(card).with_clock(Arc::clone(&clock));

    assert!(signer.sign(&mut connector, (), "slow", Pin::from("1234")).is_ok());
    assert_eq!(clock.elapsed(), Duration::from_secs(5 * 119));
}

#[test]
fn test_custom_budget() {
    let config = SignerConfig::default().with_response_timeout(Duration::from_secs(2));
    let (signer, clock) = signer_with_clock(config);
    let card = SimulatedCard::new("1234").with_response_delay(Duration::from_secs(3));
    let mut connector = SimulatedConnector::new(card).with_clock(Arc::clone(&clock));

    let err = signer.sign(&mut connector, (), "m", Pin::from("1234")).unwrap_err();
    assert!(err.transport_error().is_some_and(TransportError::is_timeout));
    assert_eq!(clock.elapsed(), Duration::from_secs(2));
}

#[test]
fn test_card_removed_mid_flow() {
    let (signer, clock) = signer_with_clock(SignerConfig::default());
    let card = SimulatedCard::new("1234").removed_after(3);
    let mut connector = SimulatedConnector::new(card).with_clock(clock);

    let err = signer.sign(&mut connector, (), "m", Pin::from("1234")).unwrap_err();
    assert!(matches!(err, SessionError::Transport(TransportError::Io(_))));
    assert_eq!(connector.disconnects(), 1);
}

#[test]
fn test_incompatible_tag() {
    let (signer, clock) = signer_with_clock(SignerConfig::default());
    let mut connector = SimulatedConnector::new(SimulatedCard::new("1234"))
        .with_clock(clock)
        .incompatible();

    let err = signer.sign(&mut connector, (), "m", Pin::from("1234")).unwrap_err();
    assert!(matches!(err, SessionError::Transport(TransportError::Unavailable(_))));
    assert_eq!(connector.connects(), 0);
    assert_eq!(connector.disconnects(), 0);
    assert!(connector.sent_frames().is_empty());
}

#[test]
fn test_sign_and_report() {
    let (signer, clock) = signer_with_clock(SignerConfig::default());
    let card = SimulatedCard::new("1234").with_canned_signature(vec![0x01, 0x02]);
    let mut connector = SimulatedConnector::new(card).with_clock(Arc::clone(&clock));

    let mut reported = None;
    signer.sign_and_report(&mut connector, (), "ok", Pin::from("1234"), |outcome| {
        reported = Some(outcome)
    });
    assert_eq!(reported, Some(Ok("ok:0102".to_string())));

    let mut connector = SimulatedConnector::new(SimulatedCard::new("1234").without_applet())
        .with_clock(clock);
    let mut reported = None;
    signer.sign_and_report(&mut connector, (), "ok", Pin::from("1234"), |outcome| {
        reported = Some(outcome)
    });
    assert_eq!(
        reported,
        Some(Err("This card does not carry the signing applet.".to_string()))
    );
}

#[test]
fn test_signer_holds_no_state_between_calls() {
    let (signer, clock) = signer_with_clock(SignerConfig::default());
    let mut connector =
        SimulatedConnector::new(SimulatedCard::new("1234")).with_clock(Arc::clone(&clock));

    assert!(signer.sign(&mut connector, (), "one", Pin::from("0000")).is_err());
    assert!(signer.sign(&mut connector, (), "two", Pin::from("1234")).is_ok());
    assert_eq!(connector.connects(), 2);
    assert_eq!(connector.disconnects(), 2);
}

//! Tests against the local PC/SC service
//!
//! These skip when no PC/SC service, reader or card is available.

use tapsign_apdu_core::{TransportConfig, TransportSession};
use tapsign_apdu_transport_pcsc::{ConnectStrategy, PcscConnector, PcscError};

#[test]
fn test_list_readers() {
    let connector = match PcscConnector::new() {
        Ok(connector) => connector,
        Err(_) => {
            println!("Skipping test, PC/SC not available");
            return;
        }
    };

    match connector.list_readers() {
        Ok(readers) => {
            assert!(!readers.is_empty(), "Expected at least one reader");
            for reader in &readers {
                assert_eq!(reader.has_card(), reader.atr().is_some());
                if let Some(atr) = reader.atr() {
                    println!("{}: {}", reader.name(), hex::encode_upper(atr));
                }
            }
        }
        Err(PcscError::NoReadersAvailable) => println!("Skipping test, no readers"),
        Err(e) => println!("Could not list readers: {e:?}"),
    }
}

#[test]
fn test_select_on_any_card() {
    let mut connector = match PcscConnector::new() {
        Ok(connector) => connector,
        Err(_) => {
            println!("Skipping test, PC/SC not available");
            return;
        }
    };

    let mut session = match TransportSession::open_with_system_clock(
        &mut connector,
        ConnectStrategy::AnyCard,
        TransportConfig::default(),
    ) {
        Ok(session) => session,
        Err(e) => {
            println!("Skipping test, no card available: {e}");
            return;
        }
    };

    // SELECT with empty AID; every card answers with at least a status word
    let response = session
        .transceive(&[0x00, 0xA4, 0x04, 0x00, 0x00])
        .expect("card should answer");
    assert!(response.len() >= 2, "Response too short");

    session.close();
    assert!(!session.is_open());
}

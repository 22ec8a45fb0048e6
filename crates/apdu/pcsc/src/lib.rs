//! PC/SC reader adapter for the tapsign transport session
//!
//! A contactless PC/SC reader stands in for the phone's NFC radio on a desktop
//! host. [`PcscConnector`] implements [`Connector`](tapsign_apdu_core::Connector):
//! the "tag" it connects to is a [`ConnectStrategy`] naming which reader to use,
//! and the resulting [`PcscLink`] is handed to a
//! [`TransportSession`](tapsign_apdu_core::TransportSession).
//!
//! # Examples
//!
//! ```no_run
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use tapsign_apdu_core::{TransportConfig, TransportSession};
//! use tapsign_apdu_transport_pcsc::{ConnectStrategy, PcscConnector};
//!
//! let mut connector = PcscConnector::new()?;
//! for reader in connector.list_readers()? {
//!     println!("{} (card: {})", reader.name(), reader.has_card());
//! }
//!
//! let mut session = TransportSession::open_with_system_clock(
//!     &mut connector,
//!     ConnectStrategy::AnyCard,
//!     TransportConfig::default(),
//! )?;
//! let response = session.transceive(&[0x00, 0xA4, 0x04, 0x00, 0x00])?;
//! println!("{:02X?}", response);
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![warn(missing_docs)]

mod config;
mod connector;
mod error;
mod link;
mod reader;

pub use config::{ConnectStrategy, PcscConfig, ShareMode};
pub use connector::PcscConnector;
pub use error::PcscError;
pub use link::PcscLink;
pub use reader::PcscReader;

// Re-export some pcsc types for convenience
pub use pcsc::{Protocol, Protocols};

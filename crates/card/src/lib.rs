//! Signing-card protocol
//!
//! Everything between a connected [`CardTransport`](tapsign_apdu_core::CardTransport)
//! and a signature: the command codec, the authenticated secure channel and the
//! [`CardSession`] state machine that walks one card through
//! select, status, handshake, PIN and sign.
//!
//! ```no_run
//! use tapsign_card::{CardSession, Pin, SessionConfig};
//! # fn run<T: tapsign_apdu_core::CardTransport>(transport: T, digest: [u8; 32]) -> tapsign_card::Result<()> {
//! let mut session = CardSession::new(transport, SessionConfig::default());
//! session.select_applet()?;
//! session.fetch_status()?;
//! session.open_secure_channel()?;
//! session.verify_pin(Pin::from("1234"))?;
//! let signature = session.sign_hash(&digest)?;
//! # let _ = signature;
//! # Ok(())
//! # }
//! ```
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod codec;
pub mod commands;
mod config;
pub mod constants;
mod crypto;
mod error;
mod secure_channel;
mod session;
mod types;

#[cfg(any(test, feature = "simulator"))]
pub mod sim;

pub use config::SessionConfig;
pub use crypto::{SessionKeys, generate_ecdh_shared_secret, verify_der_signature};
pub use error::{CodecError, NegotiationError, Result, SessionError};
pub use secure_channel::{SecureChannelContext, negotiate};
pub use session::{CardSession, SessionState};
pub use types::{CardStatus, Pin, Version};

//! Signing orchestrator
//!
//! [`Signer`] takes a message and a PIN, drives a tapped card through the whole
//! [`CardSession`](tapsign_card::CardSession) flow and returns a
//! [`SignedArtifact`] of the form `message:hex(signature)`.
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod artifact;
mod config;
mod request;
mod signer;

pub use artifact::SignedArtifact;
pub use config::SignerConfig;
pub use request::SigningRequest;
pub use signer::Signer;

pub use tapsign_card::{Pin, SessionError};

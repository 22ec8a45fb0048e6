//! Core traits and types for APDU (Application Protocol Data Unit) operations
//!
//! This crate provides the foundational types for exchanging ISO/IEC 7816-4
//! command and response frames with a single tapped card.
//!
//! ## Overview
//!
//! - [`Command`] and [`Response`] model the frames, [`StatusWord`] the trailer.
//! - [`CardLink`] and [`Connector`] are the seams a host implements to hand a
//!   connected card over to the protocol code.
//! - [`TransportSession`] owns one link for the duration of one operation and
//!   enforces the response timeout against an injectable [`Clock`].
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

// Re-export bytes for convenience
pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod error;
pub mod response;
pub mod transport;

pub use command::Command;
pub use error::{Error, Result};
pub use response::Response;
pub use response::status::StatusWord;
pub use transport::{
    CardLink, CardTransport, Clock, Connector, ManualClock, SystemClock, TransportConfig,
    TransportError, TransportSession,
};

/// Prelude module containing commonly used traits and types
pub mod prelude {
    pub use crate::{
        Bytes, BytesMut, Command, Error, Response, Result,
        response::status::{StatusWord, common as status},
        transport::{
            CardLink, CardTransport, Clock, Connector, SystemClock, TransportConfig,
            TransportError, TransportSession,
        },
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test the basic types are re-exported correctly
    #[test]
    fn test_reexports() {
        let cmd = Command::new(0x00, 0xA4, 0x04, 0x00);
        assert_eq!(cmd.cla, 0x00);
        assert_eq!(cmd.ins, 0xA4);
        assert_eq!(cmd.p1, 0x04);
        assert_eq!(cmd.p2, 0x00);

        let data = Bytes::from_static(&[0x01, 0x02, 0x03]);
        let resp = Response::success(data.clone());
        assert!(resp.is_success());
        assert_eq!(resp.payload(), &data);
        assert_eq!(resp.status(), StatusWord::new(0x90, 0x00));
    }
}

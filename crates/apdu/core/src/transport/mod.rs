//! Transport traits for APDU communication with cards
//!
//! The host supplies a [`Connector`] that turns a tapped tag into a connected
//! [`CardLink`]. A [`TransportSession`] then owns that link for one operation and
//! turns its half-duplex send/receive into request/response exchanges bounded by
//! the response timeout.

pub mod clock;
pub mod config;
pub mod error;
pub mod session;

use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use tracing::{debug, trace};

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::TransportConfig;
pub use error::TransportError;
pub use session::TransportSession;

/// A connected, half-duplex byte channel to one card
///
/// Implementations wrap whatever the host radio stack hands out for a tapped tag
/// (an ISO-DEP handle, a PC/SC card connection, a simulator).
pub trait CardLink: Send + fmt::Debug {
    /// Hand one command frame to the card
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError>;

    /// Wait up to `wait` for the response to the last frame sent
    ///
    /// Returns `Ok(None)` if nothing arrived yet. A card that left the field is
    /// reported as [`TransportError::Io`].
    fn receive(&mut self, wait: Duration) -> Result<Option<Bytes>, TransportError>;

    /// Check if the link still reaches a card
    fn is_connected(&self) -> bool;

    /// Release the physical channel
    fn disconnect(&mut self);
}

/// Host capability that connects to a tapped tag
pub trait Connector {
    /// Handle the host delivers with a tap event
    type Tag;

    /// Link produced for a connected tag
    type Link: CardLink;

    /// Connect to the tag
    ///
    /// Fails with [`TransportError::Unavailable`] if the tag does not expose a
    /// compatible technology and [`TransportError::ConnectFailed`] if the
    /// connect call itself fails.
    fn connect(&mut self, tag: Self::Tag) -> Result<Self::Link, TransportError>;
}

/// Trait for request/response card transports
///
/// A transport is responsible for sending a raw APDU and returning the raw
/// response. It has no knowledge of command structure or secure channels.
pub trait CardTransport: Send + fmt::Debug {
    /// Send raw APDU bytes to card and return response bytes
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        trace!(command = ?hex::encode(command), "Transmitting raw command");
        let result = self.do_transmit_raw(command);
        match &result {
            Ok(response) => {
                trace!(response = ?hex::encode(response), "Received raw response");
            }
            Err(e) => {
                debug!(error = ?e, "Transport error during transmission");
            }
        }
        result
    }

    /// Internal implementation of transmit_raw
    /// This is the method that concrete implementations should override
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError>;

    /// Check if the transport is connected to a physical card
    fn is_connected(&self) -> bool;
}

#[cfg(test)]
pub(crate) mod mock {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    use bytes::Bytes;
    use parking_lot::Mutex;

    use super::{CardLink, Connector, ManualClock, TransportError};

    /// Shared record of what happened on a mock link
    #[derive(Debug, Default)]
    pub(crate) struct MockState {
        /// Frames sent by the session
        pub(crate) sent: Vec<Bytes>,
        /// Number of disconnect calls
        pub(crate) disconnects: usize,
    }

    /// Scripted link: each reply is delivered after the given delay
    #[derive(Debug)]
    pub(crate) struct MockLink {
        pub(crate) replies: VecDeque<(Duration, Result<Bytes, TransportError>)>,
        pub(crate) clock: Arc<ManualClock>,
        pub(crate) state: Arc<Mutex<MockState>>,
        pub(crate) pending: Option<(Duration, Result<Bytes, TransportError>)>,
        pub(crate) waited: Duration,
    }

    impl CardLink for MockLink {
        fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
            self.state.lock().sent.push(Bytes::copy_from_slice(frame));
            self.pending = self.replies.pop_front();
            self.waited = Duration::ZERO;
            Ok(())
        }

        fn receive(&mut self, wait: Duration) -> Result<Option<Bytes>, TransportError> {
            match &self.pending {
                Some((delay, _)) if self.waited + wait >= *delay => {
                    let step = *delay - self.waited;
                    self.clock.advance(step);
                    let (_, reply) = self.pending.take().expect("pending reply checked above");
                    reply.map(Some)
                }
                _ => {
                    // Silent card: the whole wait elapses
                    self.clock.advance(wait);
                    self.waited += wait;
                    Ok(None)
                }
            }
        }

        fn is_connected(&self) -> bool {
            true
        }

        fn disconnect(&mut self) {
            self.state.lock().disconnects += 1;
        }
    }

    /// Connector handing out a single scripted link
    #[derive(Debug)]
    pub(crate) struct MockConnector {
        pub(crate) link: Option<MockLink>,
    }

    impl Connector for MockConnector {
        type Tag = ();
        type Link = MockLink;

        fn connect(&mut self, _tag: ()) -> Result<MockLink, TransportError> {
            self.link
                .take()
                .ok_or_else(|| TransportError::unavailable("no tag in field"))
        }
    }
}

//! Connected PC/SC card

use std::fmt;
use std::time::Duration;

use pcsc::{Card, Disposition};
use tapsign_apdu_core::{Bytes, CardLink, TransportError};
use tracing::{debug, warn};

use crate::error::transmit_error;

/// Link to a card on a PC/SC reader
///
/// PC/SC exchanges are a single blocking `SCardTransmit`, so the frame handed
/// to [`send`](CardLink::send) is held until the session asks for the response
/// and then transmitted in one call.
pub struct PcscLink {
    /// Card connection, until disconnected
    card: Option<Card>,
    /// Reader name
    reader_name: String,
    /// Frame waiting to be transmitted
    pending: Option<Vec<u8>>,
}

impl fmt::Debug for PcscLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscLink")
            .field("reader_name", &self.reader_name)
            .field("has_card", &self.card.is_some())
            .field("pending", &self.pending.is_some())
            .finish()
    }
}

impl PcscLink {
    pub(crate) const fn new(card: Card, reader_name: String) -> Self {
        Self {
            card: Some(card),
            reader_name,
            pending: None,
        }
    }

    /// Get the reader name
    pub fn reader_name(&self) -> &str {
        &self.reader_name
    }
}

impl CardLink for PcscLink {
    fn send(&mut self, frame: &[u8]) -> Result<(), TransportError> {
        if self.card.is_none() {
            return Err(TransportError::connection_lost());
        }
        self.pending = Some(frame.to_vec());
        Ok(())
    }

    fn receive(&mut self, _wait: Duration) -> Result<Option<Bytes>, TransportError> {
        let Some(frame) = self.pending.take() else {
            return Ok(None);
        };
        let card = self.card.as_ref().ok_or_else(TransportError::connection_lost)?;

        let mut buffer = [0u8; pcsc::MAX_BUFFER_SIZE_EXTENDED];
        match card.transmit(&frame, &mut buffer) {
            Ok(response) => Ok(Some(Bytes::copy_from_slice(response))),
            Err(e) => {
                if matches!(e, pcsc::Error::RemovedCard | pcsc::Error::ResetCard) {
                    self.card = None;
                }
                Err(transmit_error(e))
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.card.is_some()
    }

    fn disconnect(&mut self) {
        self.pending = None;
        if let Some(card) = self.card.take() {
            match card.disconnect(Disposition::LeaveCard) {
                Ok(()) => debug!(reader = %self.reader_name, "Disconnected from card"),
                Err((_, e)) => warn!(reader = %self.reader_name, error = %e, "Card disconnect failed"),
            }
        }
    }
}

impl Drop for PcscLink {
    fn drop(&mut self) {
        self.disconnect();
    }
}

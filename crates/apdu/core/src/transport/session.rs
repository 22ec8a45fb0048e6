//! Transport session owning the link to one tapped card

use bytes::Bytes;
use tracing::{debug, trace, warn};

use super::config::MIN_POLL_INTERVAL;
use super::{CardLink, CardTransport, Clock, Connector, SystemClock, TransportConfig, TransportError};

/// One physical card, held for one operation
///
/// Exactly one link is held open between [`open`](Self::open) and
/// [`close`](Self::close). Closing is idempotent and also happens on drop, so the
/// link is disconnected exactly once whatever path the caller takes.
#[derive(Debug)]
pub struct TransportSession<L: CardLink, C: Clock = SystemClock> {
    /// Link to the card
    link: L,
    /// Time source for the response budget
    clock: C,
    /// Configuration
    config: TransportConfig,
    /// Whether the link is still held
    connected: bool,
}

impl<L: CardLink> TransportSession<L> {
    /// Connect to a tag using the wall clock
    pub fn open_with_system_clock<K>(
        connector: &mut K,
        tag: K::Tag,
        config: TransportConfig,
    ) -> Result<Self, TransportError>
    where
        K: Connector<Link = L>,
    {
        Self::open(connector, tag, config, SystemClock)
    }
}

impl<L: CardLink, C: Clock> TransportSession<L, C> {
    /// Connect to a tag through the host connector
    pub fn open<K>(
        connector: &mut K,
        tag: K::Tag,
        config: TransportConfig,
        clock: C,
    ) -> Result<Self, TransportError>
    where
        K: Connector<Link = L>,
    {
        let link = connector.connect(tag)?;
        debug!(
            timeout_ms = config.response_timeout.as_millis() as u64,
            "Transport session opened"
        );
        Ok(Self::from_link(link, config, clock))
    }

    /// Wrap an already connected link
    pub const fn from_link(link: L, config: TransportConfig, clock: C) -> Self {
        Self {
            link,
            clock,
            config,
            connected: true,
        }
    }

    /// Send one frame and wait for its response
    ///
    /// Fails with [`TransportError::Timeout`] once the configured budget has
    /// elapsed on the session clock without a response, and never earlier. A
    /// response that only turns up after the budget, from a link that blocks
    /// past its wait, is a timeout as well.
    pub fn transceive(&mut self, frame: &[u8]) -> Result<Bytes, TransportError> {
        if !self.connected {
            return Err(TransportError::io("transport session is closed"));
        }
        if !self.link.is_connected() {
            return Err(TransportError::connection_lost());
        }

        let budget = self.config.response_timeout;
        let poll_interval = self.config.poll_interval.max(MIN_POLL_INTERVAL);
        let started = self.clock.now();
        self.link.send(frame)?;

        loop {
            let elapsed = self.clock.now().saturating_duration_since(started);
            if elapsed >= budget {
                return Err(timed_out(elapsed));
            }

            let wait = poll_interval.min(budget - elapsed);
            if let Some(response) = self.link.receive(wait)? {
                let elapsed = self.clock.now().saturating_duration_since(started);
                if elapsed >= budget {
                    return Err(timed_out(elapsed));
                }
                trace!(len = response.len(), "Response received");
                return Ok(response);
            }
        }
    }

    /// Release the link; safe to call any number of times
    pub fn close(&mut self) {
        if self.connected {
            self.connected = false;
            self.link.disconnect();
            debug!("Transport session closed");
        }
    }

    /// Check whether the session still holds its link
    pub const fn is_open(&self) -> bool {
        self.connected
    }

    /// Session configuration
    pub const fn config(&self) -> &TransportConfig {
        &self.config
    }
}

fn timed_out(elapsed: std::time::Duration) -> TransportError {
    warn!(elapsed_ms = elapsed.as_millis() as u64, "Card response timed out");
    TransportError::Timeout { elapsed }
}

impl<L: CardLink, C: Clock> CardTransport for TransportSession<L, C> {
    fn do_transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, TransportError> {
        self.transceive(command)
    }

    fn is_connected(&self) -> bool {
        self.connected && self.link.is_connected()
    }
}

impl<L: CardLink, C: Clock> Drop for TransportSession<L, C> {
    fn drop(&mut self) {
        self.close();
    }
}

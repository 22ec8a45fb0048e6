//! PC/SC context acting as the host connector

use std::ffi::CString;
use std::fmt;

use pcsc::{Context, ReaderState, Scope, State};
use tapsign_apdu_core::{Connector, TransportError};
use tracing::debug;

use crate::config::{ConnectStrategy, PcscConfig};
use crate::error::PcscError;
use crate::link::PcscLink;
use crate::reader::PcscReader;

/// Connects to cards presented on PC/SC readers
pub struct PcscConnector {
    /// PC/SC context
    context: Context,
    /// Configuration
    config: PcscConfig,
}

impl fmt::Debug for PcscConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PcscConnector")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PcscConnector {
    /// Establish a PC/SC context with the default configuration
    pub fn new() -> Result<Self, PcscError> {
        Self::with_config(PcscConfig::default())
    }

    /// Establish a PC/SC context with a custom configuration
    pub fn with_config(config: PcscConfig) -> Result<Self, PcscError> {
        let context = Context::establish(Scope::User)?;
        Ok(Self { context, config })
    }

    /// List all available card readers
    pub fn list_readers(&self) -> Result<Vec<PcscReader>, PcscError> {
        let names = match self.context.list_readers_owned() {
            Ok(names) => names,
            Err(pcsc::Error::NoReadersAvailable) => return Err(PcscError::NoReadersAvailable),
            Err(e) => return Err(e.into()),
        };
        if names.is_empty() {
            return Err(PcscError::NoReadersAvailable);
        }

        let mut states: Vec<ReaderState> = names
            .iter()
            .map(|name| ReaderState::new(name.as_c_str(), State::UNAWARE))
            .collect();

        match self.context.get_status_change(None, &mut states) {
            Ok(()) => Ok(states.iter().map(PcscReader::from_reader_state).collect()),
            // Without a status snapshot the readers are reported empty
            Err(_) => Ok(names
                .into_iter()
                .map(|name| PcscReader::new(name.to_string_lossy().into_owned(), None))
                .collect()),
        }
    }

    /// Resolve a strategy to the name of the reader to connect to
    fn resolve(&self, strategy: &ConnectStrategy) -> Result<String, PcscError> {
        if let ConnectStrategy::Reader(name) = strategy {
            return Ok(name.clone());
        }

        self.list_readers()?
            .into_iter()
            .find(|reader| reader.atr().is_some_and(|atr| strategy.accepts_atr(atr)))
            .map(|reader| reader.name().to_string())
            .ok_or_else(|| PcscError::NoCard("no reader holds a matching card".to_string()))
    }

    fn connect_reader(&self, reader_name: String) -> Result<PcscLink, PcscError> {
        let reader = CString::new(reader_name.clone())
            .map_err(|_| PcscError::ReaderNotFound(reader_name.clone()))?;

        let card = self
            .context
            .connect(&reader, self.config.share_mode.into(), self.config.protocols)?;
        debug!(reader = %reader_name, "Connected to card");

        Ok(PcscLink::new(card, reader_name))
    }
}

impl Connector for PcscConnector {
    type Tag = ConnectStrategy;
    type Link = PcscLink;

    fn connect(&mut self, tag: ConnectStrategy) -> Result<PcscLink, TransportError> {
        let reader_name = self.resolve(&tag)?;
        Ok(self.connect_reader(reader_name)?)
    }
}

//! Configuration options for the PC/SC adapter

use pcsc::{Protocols as PcscProtocols, ShareMode as PcscShareMode};

/// Sharing mode for card connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMode {
    /// Exclusive access to the card (default)
    Exclusive,
    /// Shared access to the card
    Shared,
}

impl From<ShareMode> for PcscShareMode {
    fn from(mode: ShareMode) -> Self {
        match mode {
            ShareMode::Exclusive => Self::Exclusive,
            ShareMode::Shared => Self::Shared,
        }
    }
}

/// Which reader a connect request targets
///
/// This is the adapter's notion of a "tapped tag": the card sitting on the
/// selected reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectStrategy {
    /// Connect to a specific reader by name
    Reader(String),

    /// Connect to the first reader with a card present
    AnyCard,

    /// Connect to the first reader whose card ATR matches the pattern
    CardWithAtr {
        /// Expected ATR prefix
        pattern: Vec<u8>,
        /// Optional bit mask applied to both sides before comparing
        mask: Option<Vec<u8>>,
    },
}

impl ConnectStrategy {
    /// Match an ATR against this strategy's pattern
    ///
    /// Strategies that do not filter on ATR accept any card.
    pub fn accepts_atr(&self, atr: &[u8]) -> bool {
        let Self::CardWithAtr { pattern, mask } = self else {
            return true;
        };
        if pattern.len() > atr.len() {
            return false;
        }
        match mask {
            Some(mask) if mask.len() < pattern.len() => false,
            Some(mask) => pattern
                .iter()
                .zip(atr)
                .zip(mask)
                .all(|((p, a), m)| p & m == a & m),
            None => atr.starts_with(pattern),
        }
    }
}

/// Configuration options for the PC/SC adapter
#[derive(Debug, Clone, Copy)]
pub struct PcscConfig {
    /// Sharing mode for card connections
    pub share_mode: ShareMode,

    /// Preferred protocols for card communication
    pub protocols: PcscProtocols,
}

impl Default for PcscConfig {
    fn default() -> Self {
        Self {
            share_mode: ShareMode::Exclusive,
            protocols: PcscProtocols::ANY,
        }
    }
}

impl PcscConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sharing mode
    pub const fn with_share_mode(mut self, mode: ShareMode) -> Self {
        self.share_mode = mode;
        self
    }

    /// Set the preferred protocols
    pub const fn with_protocols(mut self, protocols: PcscProtocols) -> Self {
        self.protocols = protocols;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atr_prefix_match() {
        let strategy = ConnectStrategy::CardWithAtr {
            pattern: vec![0x3B, 0x8F],
            mask: None,
        };
        assert!(strategy.accepts_atr(&[0x3B, 0x8F, 0x80, 0x01]));
        assert!(!strategy.accepts_atr(&[0x3B, 0x8E, 0x80, 0x01]));
        assert!(!strategy.accepts_atr(&[0x3B]));
    }

    #[test]
    fn test_atr_masked_match() {
        let strategy = ConnectStrategy::CardWithAtr {
            pattern: vec![0x3B, 0x80],
            mask: Some(vec![0xFF, 0xF0]),
        };
        assert!(strategy.accepts_atr(&[0x3B, 0x8F]));
        assert!(!strategy.accepts_atr(&[0x3B, 0x7F]));

        let short_mask = ConnectStrategy::CardWithAtr {
            pattern: vec![0x3B, 0x80],
            mask: Some(vec![0xFF]),
        };
        assert!(!short_mask.accepts_atr(&[0x3B, 0x80]));
    }

    #[test]
    fn test_unfiltered_strategies_accept_any_card() {
        assert!(ConnectStrategy::AnyCard.accepts_atr(&[]));
        assert!(ConnectStrategy::Reader("ACS ACR122U".into()).accepts_atr(&[0x3B]));
    }

    #[test]
    fn test_config_builder() {
        let config = PcscConfig::new()
            .with_share_mode(ShareMode::Shared)
            .with_protocols(PcscProtocols::T1);
        assert_eq!(config.share_mode, ShareMode::Shared);
        assert_eq!(config.protocols, PcscProtocols::T1);
    }
}

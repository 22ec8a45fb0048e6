use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// PIN credential supplied by the card holder
///
/// The bytes are wiped when the value is dropped and never shown by `Debug`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Pin(Vec<u8>);

impl Pin {
    /// Wrap raw PIN bytes
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Raw PIN bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the PIN is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(***)")
    }
}

impl From<Vec<u8>> for Pin {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<String> for Pin {
    fn from(pin: String) -> Self {
        Self(pin.into_bytes())
    }
}

impl From<&str> for Pin {
    fn from(pin: &str) -> Self {
        Self(pin.as_bytes().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let pin = Pin::from("1234");
        assert_eq!(format!("{pin:?}"), "Pin(***)");
        assert_eq!(pin.as_bytes(), b"1234");
    }
}

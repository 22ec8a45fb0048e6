use std::fmt;

use bytes::Bytes;
use k256::ecdsa::{Signature, VerifyingKey, signature::hazmat::PrehashVerifier};
use sha2::{Digest, Sha256};

/// A message together with the card's signature over it
///
/// Displays as `message:hex(signature)` with lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedArtifact {
    message: String,
    signature: Bytes,
}

impl SignedArtifact {
    /// Pair a message with its signature
    pub fn new(message: impl Into<String>, signature: impl Into<Bytes>) -> Self {
        Self {
            message: message.into(),
            signature: signature.into(),
        }
    }

    /// Signed message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Signature bytes as the card returned them
    pub const fn signature(&self) -> &Bytes {
        &self.signature
    }

    /// Lowercase hex of the signature
    pub fn signature_hex(&self) -> String {
        hex::encode(&self.signature)
    }

    /// Parse the signature as DER-encoded ECDSA
    pub fn ecdsa_signature(&self) -> Option<Signature> {
        Signature::from_der(&self.signature).ok()
    }

    /// Check the signature against a public key
    pub fn verify(&self, key: &VerifyingKey) -> bool {
        let digest = Sha256::digest(self.message.as_bytes());
        self.ecdsa_signature()
            .is_some_and(|signature| key.verify_prehash(&digest, &signature).is_ok())
    }
}

impl fmt::Display for SignedArtifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.message, self.signature_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_joins_message_and_hex() {
        let artifact = SignedArtifact::new("hi", vec![0x30, 0xAB, 0x0F]);
        assert_eq!(artifact.to_string(), "hi:30ab0f");
        assert_eq!(artifact.signature_hex(), "30ab0f");
        assert!(artifact.ecdsa_signature().is_none());
    }

    #[test]
    fn test_message_may_contain_separator() {
        let artifact = SignedArtifact::new("a:b", vec![0x01]);
        assert_eq!(artifact.to_string(), "a:b:01");
    }

    #[test]
    fn test_verify() {
        use k256::ecdsa::{SigningKey, signature::hazmat::PrehashSigner};

        let key = SigningKey::from_slice(&[0x07; 32]).unwrap();
        let digest = Sha256::digest(b"hello");
        let signature: Signature = key.sign_prehash(&digest).unwrap();
        let artifact = SignedArtifact::new("hello", signature.to_der().as_bytes().to_vec());

        assert!(artifact.verify(key.verifying_key()));
        let other = SigningKey::from_slice(&[0x08; 32]).unwrap();
        assert!(!artifact.verify(other.verifying_key()));
    }
}

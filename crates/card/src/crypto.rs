//! Cryptographic primitives of the secure channel

use std::fmt;

use cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit, block_padding::Iso7816};
use hmac::{Hmac, Mac};
use k256::{
    PublicKey, SecretKey,
    ecdh::SharedSecret,
    ecdsa::{Signature, VerifyingKey, signature::Verifier},
};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::constants::{KDF_LABEL_ENC, KDF_LABEL_MAC, envelope::IV_LEN};
use crate::error::CodecError;

type HmacSha256 = Hmac<Sha256>;
type Encryptor = cbc::Encryptor<aes::Aes256>;
type Decryptor = cbc::Decryptor<aes::Aes256>;

/// Symmetric keys of one secure channel session
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SessionKeys {
    /// AES-256 encryption key
    enc: [u8; 32],
    /// HMAC-SHA256 key
    mac: [u8; 32],
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKeys(..)")
    }
}

impl SessionKeys {
    /// Create a key set from raw keys
    pub const fn new(enc: [u8; 32], mac: [u8; 32]) -> Self {
        Self { enc, mac }
    }

    /// Derive the session keys from an ECDH shared secret
    ///
    /// `enc = HMAC-SHA256(secret, "sc_key")`, `mac = HMAC-SHA256(secret, "sc_mac")`.
    pub fn derive(secret: &SharedSecret) -> Result<Self, CodecError> {
        let secret = secret.raw_secret_bytes();
        Ok(Self {
            enc: hmac_sha256(secret, &[KDF_LABEL_ENC])?,
            mac: hmac_sha256(secret, &[KDF_LABEL_MAC])?,
        })
    }

    /// Encrypt with AES-256-CBC and ISO 7816-4 padding
    pub(crate) fn encrypt(&self, iv: &[u8; IV_LEN], plaintext: &[u8]) -> Vec<u8> {
        Encryptor::new((&self.enc).into(), iv.into()).encrypt_padded_vec_mut::<Iso7816>(plaintext)
    }

    /// Decrypt AES-256-CBC with ISO 7816-4 padding
    pub(crate) fn decrypt(&self, iv: &[u8; IV_LEN], ciphertext: &[u8]) -> Result<Vec<u8>, CodecError> {
        Decryptor::new((&self.enc).into(), iv.into())
            .decrypt_padded_vec_mut::<Iso7816>(ciphertext)
            .map_err(|_| CodecError::MalformedResponse("invalid secure channel padding"))
    }

    /// Compute the authentication tag over the given parts
    pub(crate) fn tag(&self, parts: &[&[u8]]) -> Result<[u8; 32], CodecError> {
        hmac_sha256(&self.mac, parts)
    }

    /// Check a received authentication tag in constant time
    pub(crate) fn verify_tag(&self, parts: &[&[u8]], tag: &[u8]) -> Result<(), CodecError> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.mac)
            .map_err(|_| CodecError::Cipher("invalid MAC key length"))?;
        parts.iter().for_each(|part| mac.update(part));
        mac.verify_slice(tag).map_err(|_| CodecError::AuthenticationFailed)
    }
}

fn hmac_sha256(key: &[u8], parts: &[&[u8]]) -> Result<[u8; 32], CodecError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|_| CodecError::Cipher("invalid MAC key length"))?;
    parts.iter().for_each(|part| mac.update(part));
    Ok(mac.finalize().into_bytes().into())
}

/// ECDH over secp256k1
pub fn generate_ecdh_shared_secret(private: &SecretKey, public: &PublicKey) -> SharedSecret {
    k256::elliptic_curve::ecdh::diffie_hellman(private.to_nonzero_scalar(), public.as_affine())
}

/// Verify a DER ECDSA/SHA-256 signature by `key` over `message`
///
/// High-S signatures are normalized first, cards are not required to emit
/// low-S form.
pub fn verify_der_signature(key: &PublicKey, message: &[u8], der: &[u8]) -> bool {
    let Ok(signature) = Signature::from_der(der) else {
        return false;
    };
    let signature = signature.normalize_s().unwrap_or(signature);
    VerifyingKey::from(key).verify(message, &signature).is_ok()
}

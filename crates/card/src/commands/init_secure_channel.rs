use bytes::{BufMut, Bytes, BytesMut};
use k256::{PublicKey, elliptic_curve::sec1::ToEncodedPoint};
use tapsign_apdu_core::Command;

use crate::constants::{CLA_SATOCHIP, ins};
use crate::error::NegotiationError;

/// INITIATE SECURE CHANNEL with the host's ephemeral public key
pub fn init_secure_channel(host_ephemeral: &PublicKey) -> Command {
    let point = host_ephemeral.to_encoded_point(false);
    Command::new_with_data(
        CLA_SATOCHIP,
        ins::INIT_SECURE_CHANNEL,
        0x00,
        0x00,
        Bytes::copy_from_slice(point.as_bytes()),
    )
}

/// The card's half of the handshake
///
/// Wire form: three fields, each prefixed by its big-endian 16-bit length:
/// card ephemeral public key, DER signature by the authentication key over
/// `card_ephemeral || host_ephemeral`, card authentication public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardHandshake {
    /// SEC1 encoding of the card's ephemeral key
    pub card_ephemeral: Bytes,
    /// DER ECDSA proof signature
    pub proof: Bytes,
    /// SEC1 encoding of the card authentication key
    pub authentication_key: Bytes,
}

impl CardHandshake {
    /// Parse the handshake payload
    pub fn parse(payload: &[u8]) -> Result<Self, NegotiationError> {
        let mut rest = payload;
        let card_ephemeral = take_field(&mut rest)?;
        let proof = take_field(&mut rest)?;
        let authentication_key = take_field(&mut rest)?;
        if !rest.is_empty() {
            return Err(NegotiationError::ProtocolError("trailing handshake data"));
        }

        Ok(Self {
            card_ephemeral,
            proof,
            authentication_key,
        })
    }

    /// Serialize the handshake payload
    ///
    /// Fails if a field does not fit its 16-bit length prefix.
    pub fn to_bytes(&self) -> Result<Bytes, NegotiationError> {
        let mut buf = BytesMut::new();
        for field in [&self.card_ephemeral, &self.proof, &self.authentication_key] {
            let len = u16::try_from(field.len())
                .map_err(|_| NegotiationError::ProtocolError("handshake field too long"))?;
            buf.put_u16(len);
            buf.put_slice(field);
        }
        Ok(buf.freeze())
    }
}

fn take_field(rest: &mut &[u8]) -> Result<Bytes, NegotiationError> {
    let [hi, lo, tail @ ..] = *rest else {
        return Err(NegotiationError::ProtocolError("truncated handshake field length"));
    };
    let len = u16::from_be_bytes([*hi, *lo]) as usize;
    if len == 0 || tail.len() < len {
        return Err(NegotiationError::ProtocolError("handshake field length mismatch"));
    }
    let (field, tail) = tail.split_at(len);
    *rest = tail;
    Ok(Bytes::copy_from_slice(field))
}

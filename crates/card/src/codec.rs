//! Encoding and decoding of applet frames
//!
//! Pure functions: no I/O happens here. Commands sent after the handshake go
//! through [`wrap_command`], which seals the whole inner frame and carries it
//! in a PROCESS SECURE CHANNEL command.

use k256::PublicKey;
use tapsign_apdu_core::{Bytes, Command, Response, StatusWord};
use tracing::trace;
use zeroize::Zeroizing;

use crate::commands::{self, process_secure_channel};
use crate::constants::{CLA_SATOCHIP, DEFAULT_PIN_SLOT, ins};
use crate::error::CodecError;
use crate::secure_channel::SecureChannelContext;
use crate::types::Pin;

/// `00 A4 04 00 | "SatoChip"`
pub fn encode_select_applet() -> Result<Bytes, CodecError> {
    Ok(commands::select::select_applet().to_bytes()?)
}

/// `B0 3C 00 00`
pub fn encode_get_status() -> Result<Bytes, CodecError> {
    Ok(commands::get_status::get_status().to_bytes()?)
}

/// `B0 81 00 00 | uncompressed SEC1 point`
pub fn encode_initiate_secure_channel(host_ephemeral: &PublicKey) -> Result<Bytes, CodecError> {
    Ok(commands::init_secure_channel::init_secure_channel(host_ephemeral).to_bytes()?)
}

/// VERIFY PIN for the default slot, wrapped in the secure channel
pub fn encode_verify_pin(pin: &Pin, ctx: &mut SecureChannelContext) -> Result<Bytes, CodecError> {
    encode_verify_pin_in_slot(DEFAULT_PIN_SLOT, pin, ctx)
}

/// VERIFY PIN for a given slot, wrapped in the secure channel
pub fn encode_verify_pin_in_slot(
    pin_slot: u8,
    pin: &Pin,
    ctx: &mut SecureChannelContext,
) -> Result<Bytes, CodecError> {
    let inner = commands::verify_pin::verify_pin(pin_slot, pin)?;
    wrap_command(&inner, ctx)
}

/// SIGN HASH, wrapped in the secure channel
pub fn encode_sign_hash(
    key_index: u8,
    digest: &[u8; 32],
    ctx: &mut SecureChannelContext,
) -> Result<Bytes, CodecError> {
    let inner = Zeroizing::new(commands::sign_hash::sign_hash(key_index, digest).to_bytes()?.to_vec());
    wrap_command(&inner, ctx)
}

/// Seal a raw inner frame and carry it in `B0 82 00 00 | envelope`
pub fn wrap_command(inner: &[u8], ctx: &mut SecureChannelContext) -> Result<Bytes, CodecError> {
    let envelope = ctx.seal(inner)?;
    trace!(counter = ctx.counter(), len = envelope.len(), "Wrapped command");
    Ok(process_secure_channel(envelope).to_bytes()?)
}

/// Split a response into payload and status word
pub fn decode_response(bytes: &[u8]) -> Result<Response, CodecError> {
    Response::from_bytes(bytes).map_err(|_| CodecError::MalformedResponse("status word missing"))
}

/// Decode the response to a wrapped command
///
/// A success status must carry an envelope, which is opened and replaces the
/// payload. Other statuses carry no envelope and are returned unchanged.
pub fn decode_secure_response(
    bytes: &[u8],
    ctx: &mut SecureChannelContext,
) -> Result<Response, CodecError> {
    let response = decode_response(bytes)?;
    if !response.is_success() {
        return Ok(response);
    }
    if response.payload().is_empty() {
        return Err(CodecError::MalformedResponse("secure envelope missing"));
    }

    let plaintext = ctx.open(response.payload())?;
    Ok(Response::new(Bytes::copy_from_slice(&plaintext), response.status()))
}

/// Parse a plain command frame
pub fn decode_command(bytes: &[u8]) -> Result<Command, CodecError> {
    Ok(Command::from_bytes(bytes)?)
}

/// Card-side inverse of [`wrap_command`]
///
/// Returns the raw inner frame; it may hold the PIN and is wiped on drop.
pub fn unwrap_command(
    bytes: &[u8],
    ctx: &mut SecureChannelContext,
) -> Result<Zeroizing<Vec<u8>>, CodecError> {
    let outer = decode_command(bytes)?;
    if outer.cla != CLA_SATOCHIP || outer.ins != ins::PROCESS_SECURE_CHANNEL {
        return Err(CodecError::MalformedResponse("not a secure channel command"));
    }
    ctx.open(outer.data())
}

/// Card-side response to a wrapped command
///
/// Success responses are sealed; failures go back as a bare status word.
pub fn wrap_response(
    data: &[u8],
    status: StatusWord,
    ctx: &mut SecureChannelContext,
) -> Result<Bytes, CodecError> {
    if !status.is_success() {
        return Ok(Response::error(status).to_bytes());
    }
    let envelope = ctx.seal(data)?;
    Ok(Response::new(envelope, status).to_bytes())
}

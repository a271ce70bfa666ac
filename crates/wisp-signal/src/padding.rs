//! Transport padding for message payloads.
//!
//! Plaintext is padded before encryption with 1 to 15 bytes, each holding
//! the pad length. The scheme hides exact payload sizes from the transport
//! without a length field.

use rand::Rng;

use crate::error::{Error, Result};

/// Append random-length padding to a payload.
pub fn pad(payload: &[u8]) -> Vec<u8> {
    let length: u8 = rand::thread_rng().gen_range(1..=15);
    let mut padded = Vec::with_capacity(payload.len() + length as usize);
    padded.extend_from_slice(payload);
    padded.resize(payload.len() + length as usize, length);
    padded
}

/// Strip and validate padding from a decrypted payload.
pub fn unpad(padded: &[u8]) -> Result<&[u8]> {
    let length = *padded
        .last()
        .ok_or_else(|| Error::Malformed("empty padded payload".into()))?
        as usize;
    if length == 0 || length > 15 || length > padded.len() {
        return Err(Error::Malformed("invalid padding length".into()));
    }
    let (payload, padding) = padded.split_at(padded.len() - length);
    if padding.iter().any(|&byte| byte as usize != length) {
        return Err(Error::Malformed("inconsistent padding bytes".into()));
    }
    Ok(payload)
}

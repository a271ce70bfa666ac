//! Cryptographic primitives for the wisp session protocol.
//!
//! This crate implements the cryptographic leaves the session cipher is
//! built from:
//! - HKDF-SHA256 secret expansion into fixed 32-byte chunks
//! - HMAC-SHA256 with truncated constant-time verification
//! - AES-256-CBC with PKCS#7 padding
//! - Curve25519 key pairs and Diffie-Hellman agreement
//!
//! Conventions:
//! - All derived secrets are returned in `Zeroizing` wrappers
//! - Comparisons of authenticator material go through the subtle crate
//! - No logging of key material

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cbc;
pub mod error;
pub mod kdf;
pub mod key;
pub mod mac;

pub use error::{Error, Result};
pub use key::KeyPair;

/// Session protocol message version.
pub const CURRENT_VERSION: u8 = 3;

/// Symmetric key length in bytes.
pub const KEY_LENGTH: usize = 32;

/// Truncated message authenticator length in bytes.
pub const MAC_LENGTH: usize = 8;

/// AES-CBC initialization vector length in bytes.
pub const IV_LENGTH: usize = 16;

/// Type byte prefixed to encoded Curve25519 public keys.
pub const PUBLIC_KEY_HEADER: u8 = 0x05;

/// Encoded public key length (header byte + 32 key bytes).
pub const ENCODED_KEY_LENGTH: usize = 33;

//! Curve25519 key pairs and Diffie-Hellman agreement.

use std::fmt;

use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::{ENCODED_KEY_LENGTH, KEY_LENGTH, PUBLIC_KEY_HEADER};

/// A Curve25519 key pair.
///
/// Encoded public keys carry a one-byte curve-type header; the private key
/// never leaves this type except through [`KeyPair::agreement`].
#[derive(Clone)]
pub struct KeyPair {
    secret: StaticSecret,
    public: PublicKey,
}

impl KeyPair {
    /// Generate a fresh key pair from the system RNG.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Rebuild a key pair from raw private-key bytes.
    pub fn from_secret(bytes: [u8; KEY_LENGTH]) -> Self {
        let secret = StaticSecret::from(bytes);
        let public = PublicKey::from(&secret);
        Self { secret, public }
    }

    /// Raw 32-byte public key.
    pub fn public_bytes(&self) -> [u8; KEY_LENGTH] {
        self.public.to_bytes()
    }

    /// Encoded 33-byte public key (type header + raw key).
    pub fn public_encoded(&self) -> [u8; ENCODED_KEY_LENGTH] {
        encode_public(&self.public.to_bytes())
    }

    /// Diffie-Hellman agreement with a remote public key (raw or encoded).
    pub fn agreement(&self, remote_public: &[u8]) -> Result<Zeroizing<[u8; KEY_LENGTH]>> {
        let remote = decode_public(remote_public)?;
        let shared = self.secret.diffie_hellman(&PublicKey::from(remote));
        Ok(Zeroizing::new(shared.to_bytes()))
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &self.public.to_bytes())
            .finish_non_exhaustive()
    }
}

/// Prefix a raw public key with the curve-type header.
pub fn encode_public(raw: &[u8; KEY_LENGTH]) -> [u8; ENCODED_KEY_LENGTH] {
    let mut encoded = [0u8; ENCODED_KEY_LENGTH];
    encoded[0] = PUBLIC_KEY_HEADER;
    encoded[1..].copy_from_slice(raw);
    encoded
}

/// Accept a public key with or without its type header.
pub fn decode_public(bytes: &[u8]) -> Result<[u8; KEY_LENGTH]> {
    let raw: &[u8] = match bytes.len() {
        KEY_LENGTH => bytes,
        ENCODED_KEY_LENGTH => {
            if bytes[0] != PUBLIC_KEY_HEADER {
                return Err(Error::InvalidPublicKey(format!(
                    "unknown key type {:#04x}",
                    bytes[0]
                )));
            }
            &bytes[1..]
        }
        other => {
            return Err(Error::InvalidLength {
                expected: ENCODED_KEY_LENGTH,
                actual: other,
            })
        }
    };
    let mut key = [0u8; KEY_LENGTH];
    key.copy_from_slice(raw);
    Ok(key)
}

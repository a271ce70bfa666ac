//! Key derivation (HKDF-SHA256).
//!
//! The session protocol derives every secret by expanding input key
//! material into consecutive 32-byte chunks: three for per-message keys
//! (cipher key, MAC key, IV seed) and two for ratchet steps (next root
//! key, chain key).

use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{Error, Result};
use crate::KEY_LENGTH;

/// A derived 32-byte secret.
pub type Secret = Zeroizing<[u8; KEY_LENGTH]>;

/// Expand `ikm` into `N` 32-byte secrets with a zero-filled salt.
///
/// This is the per-message derivation: `N = 3` yields cipher key, MAC key
/// and IV seed from one message key.
pub fn derive_secrets<const N: usize>(ikm: &[u8], info: &[u8]) -> Result<[Secret; N]> {
    derive_secrets_with_salt(ikm, &[0u8; KEY_LENGTH], info)
}

/// Expand `ikm` into `N` 32-byte secrets with an explicit salt.
///
/// Ratchet steps salt the expansion with the current root key: `N = 2`
/// yields the next root key and the fresh chain key.
pub fn derive_secrets_with_salt<const N: usize>(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
) -> Result<[Secret; N]> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = Zeroizing::new(vec![0u8; N * KEY_LENGTH]);
    hk.expand(info, &mut okm)
        .map_err(|_| Error::KeyDerivation("HKDF expansion failed".into()))?;

    let mut secrets = [(); N].map(|()| Zeroizing::new([0u8; KEY_LENGTH]));
    for (index, secret) in secrets.iter_mut().enumerate() {
        secret.copy_from_slice(&okm[index * KEY_LENGTH..(index + 1) * KEY_LENGTH]);
    }
    Ok(secrets)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// RFC 5869 Test Case 1, truncated to the fixed-chunk interface.
    #[test]
    fn test_hkdf_rfc5869_vector() {
        let ikm = hex::decode("0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b").unwrap();
        let salt = hex::decode("000102030405060708090a0b0c").unwrap();
        let info = hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();

        let [first] = derive_secrets_with_salt::<1>(&ikm, &salt, &info).unwrap();

        let expected =
            hex::decode("3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf")
                .unwrap();
        assert_eq!(&first[..], &expected[..]);
    }

    #[test]
    fn test_chunks_are_consecutive_okm() {
        let [a, b, c] = derive_secrets::<3>(b"input", b"info").unwrap();
        let [a2, b2] = derive_secrets::<2>(b"input", b"info").unwrap();
        assert_eq!(*a, *a2);
        assert_eq!(*b, *b2);
        assert_ne!(*a, *b);
        assert_ne!(*b, *c);
    }

    #[test]
    fn test_info_separates_domains() {
        let [a] = derive_secrets::<1>(b"input", b"one").unwrap();
        let [b] = derive_secrets::<1>(b"input", b"two").unwrap();
        assert_ne!(*a, *b);
    }

    #[test]
    fn test_salt_changes_output() {
        let [a] = derive_secrets_with_salt::<1>(b"input", &[0u8; 32], b"info").unwrap();
        let [b] = derive_secrets_with_salt::<1>(b"input", &[1u8; 32], b"info").unwrap();
        assert_ne!(*a, *b);
    }
}

//! Message authentication (HMAC-SHA256).

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::KEY_LENGTH;

type HmacSha256 = Hmac<Sha256>;

/// Compute HMAC-SHA256 over `data`.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; KEY_LENGTH] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Verify a truncated HMAC-SHA256 tag in constant time.
///
/// `received` must hold exactly the truncated tag. Returns false on length
/// mismatch or tag mismatch; the comparison never short-circuits on
/// content.
pub fn verify_truncated(received: &[u8], key: &[u8], data: &[u8]) -> bool {
    let expected = hmac_sha256(key, data);
    if received.len() > expected.len() {
        return false;
    }
    expected[..received.len()].ct_eq(received).into()
}

//! HMAC-SHA256 payload signature verification.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Computes the hex HMAC-SHA256 signature of a payload.
#[must_use]
pub fn compute_signature(secret: &str, body: &[u8]) -> String {
    let Ok(mut mac) = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes()) else {
        // HMAC accepts keys of any length; this branch cannot be reached.
        return String::new();
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex signature against the shared secret in constant time.
#[must_use]
pub fn verify_signature(expected_hex: &str, secret: &str, body: &[u8]) -> bool {
    let computed = compute_signature(secret, body);
    if computed.is_empty() {
        return false;
    }
    expected_hex
        .as_bytes()
        .ct_eq(computed.as_bytes())
        .into()
}

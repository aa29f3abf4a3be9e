//! HMAC signature computation and verification.

use crate::intake::webhook::signature::{compute_signature, verify_signature};
use rstest::rstest;

#[rstest]
fn signature_is_deterministic_hex_sha256() {
    let first = compute_signature("secret", b"payload");
    let second = compute_signature("secret", b"payload");
    assert_eq!(first, second);
    assert_eq!(first.len(), 64);
    assert!(first.chars().all(|c| c.is_ascii_hexdigit()));
}

#[rstest]
fn signature_changes_with_secret_and_body() {
    let base = compute_signature("secret", b"payload");
    assert_ne!(base, compute_signature("other-secret", b"payload"));
    assert_ne!(base, compute_signature("secret", b"other-payload"));
}

#[rstest]
fn valid_signature_verifies() {
    let signature = compute_signature("secret", b"payload");
    assert!(verify_signature(&signature, "secret", b"payload"));
}

#[rstest]
fn tampered_body_fails_verification() {
    let signature = compute_signature("secret", b"payload");
    assert!(!verify_signature(&signature, "secret", b"tampered"));
}

#[rstest]
fn garbage_signature_fails_verification() {
    assert!(!verify_signature("not-hex-at-all", "secret", b"payload"));
    assert!(!verify_signature("", "secret", b"payload"));
}

// src/credential/signer.rs
//! Keyed authentication tag over credential payload fields.
//!
//! The tag is an HMAC-SHA-256 over `"{student_id}|{expiry}|{name}"`,
//! truncated to its first 8 bytes and hex-encoded (16 characters). It makes
//! the payload tamper-evident without any server round trip: altering any
//! field deterministically invalidates the tag, and forging one requires the
//! process-wide secret key.

use ring::{constant_time, hmac};

/// Length of the hex-encoded tag.
pub const TAG_HEX_LEN: usize = 16;

/// Bytes of HMAC output kept after truncation.
const TAG_BYTES: usize = 8;

/// Computes and verifies payload authentication tags.
///
/// Holds the immutable HMAC key, constructed once at startup from
/// configuration and injected wherever tags are computed. Never a mutable
/// global, which also keeps the signer independently testable with
/// throwaway keys.
pub struct Signer {
    key: hmac::Key,
}

impl Signer {
    /// Builds a signer from the configured secret.
    ///
    /// If the secret is a valid hex string it is decoded to bytes; otherwise
    /// the raw string bytes are used verbatim. The raw-bytes fallback keeps
    /// ad-hoc deployments working but offers whatever entropy the operator
    /// typed — deployments should supply a hex-encoded 32-byte key.
    pub fn new(secret: &str) -> Self {
        let material = hex::decode(secret).unwrap_or_else(|_| secret.as_bytes().to_vec());
        Signer {
            key: hmac::Key::new(hmac::HMAC_SHA256, &material),
        }
    }

    /// Computes the 16-hex-character tag binding the three payload fields.
    ///
    /// Deterministic: identical inputs under the same key always produce the
    /// same tag. `name` is the plain (decoded) display name, not its base64
    /// form.
    pub fn tag(&self, student_id: &str, expiry: &str, name: &str) -> String {
        let message = format!("{}|{}|{}", student_id, expiry, name);
        let digest = hmac::sign(&self.key, message.as_bytes());
        hex::encode(&digest.as_ref()[..TAG_BYTES])
    }

    /// Constant-time comparison of an embedded tag against the recomputed one.
    ///
    /// Must not short-circuit on the first mismatching byte; this check
    /// guards membership and identity forgery, so timing leaks matter.
    pub fn verify(&self, candidate: &str, expected: &str) -> bool {
        constant_time::verify_slices_are_equal(candidate.as_bytes(), expected.as_bytes()).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_signer() -> Signer {
        Signer::new("0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef")
    }

    #[test]
    fn test_tag_is_deterministic() {
        let signer = test_signer();
        let a = signer.tag("abc-123", "20260301", "José");
        let b = signer.tag("abc-123", "20260301", "José");
        assert_eq!(a, b);
        assert_eq!(a.len(), TAG_HEX_LEN);
    }

    #[test]
    fn test_any_field_change_alters_tag() {
        let signer = test_signer();
        let base = signer.tag("abc-123", "20260301", "José");
        assert_ne!(signer.tag("abc-124", "20260301", "José"), base);
        assert_ne!(signer.tag("abc-123", "20270301", "José"), base);
        assert_ne!(signer.tag("abc-123", "20260301", "Jose"), base);
    }

    #[test]
    fn test_different_keys_disagree() {
        let a = Signer::new("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");
        let b = Signer::new("bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb");
        assert_ne!(
            a.tag("abc-123", "20260301", "José"),
            b.tag("abc-123", "20260301", "José")
        );
    }

    #[test]
    fn test_raw_string_secret_fallback() {
        // Not valid hex, so the bytes are used verbatim; still deterministic.
        let signer = Signer::new("not-hex-at-all");
        assert_eq!(
            signer.tag("s", "20260101", "n"),
            signer.tag("s", "20260101", "n")
        );
    }

    #[test]
    fn test_verify_matches_and_rejects() {
        let signer = test_signer();
        let tag = signer.tag("abc-123", "20260301", "José");
        assert!(signer.verify(&tag, &tag));

        let mut flipped = tag.clone().into_bytes();
        flipped[0] = if flipped[0] == b'0' { b'1' } else { b'0' };
        let flipped = String::from_utf8(flipped).unwrap();
        assert!(!signer.verify(&flipped, &tag));
        assert!(!signer.verify("", &tag));
    }
}

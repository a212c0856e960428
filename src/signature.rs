//! HMAC-SHA-256 verification for webhook deliveries.
//!
//! The scheduling provider signs every delivery with a shared secret: the
//! signature header carries the lowercase hex digest of the raw request body.
//! Verification runs over the exact bytes received, before any JSON parsing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify a provider signature against the raw request body.
///
/// Comparison happens inside `Mac::verify_slice`, which is constant-time.
/// Any malformed hex in the provided signature fails verification.
pub fn verify(secret: &str, body: &[u8], provided_hex: &str) -> bool {
    let Ok(provided) = hex::decode(provided_hex.trim()) else {
        return false;
    };

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(body);
    mac.verify_slice(&provided).is_ok()
}

/// Compute the hex signature for a body. Used by tests and tooling to build
/// deliveries the way the provider does.
pub fn sign(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    // RFC 4231 test case 2
    #[test]
    fn test_known_vector() {
        let expected = hex!("5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843");
        assert_eq!(
            sign("Jefe", b"what do ya want for nothing?"),
            hex::encode(expected)
        );
        assert!(verify(
            "Jefe",
            b"what do ya want for nothing?",
            &hex::encode(expected)
        ));
    }

    #[test]
    fn test_sign_verify_round_trip() {
        let body = br#"{"triggerEvent":"BOOKING_CREATED","payload":{}}"#;
        let signature = sign("whsec_test", body);
        assert!(verify("whsec_test", body, &signature));
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let body = b"payload";
        let signature = sign("secret-a", body);
        assert!(!verify("secret-b", body, &signature));
    }

    #[test]
    fn test_rejects_tampered_body() {
        let signature = sign("secret", b"original");
        assert!(!verify("secret", b"tampered", &signature));
    }

    #[test]
    fn test_rejects_invalid_hex() {
        assert!(!verify("secret", b"body", "not-hex-at-all"));
        assert!(!verify("secret", b"body", ""));
    }

    #[test]
    fn test_accepts_surrounding_whitespace() {
        let body = b"body";
        let signature = format!(" {} ", sign("secret", body));
        assert!(verify("secret", body, &signature));
    }
}

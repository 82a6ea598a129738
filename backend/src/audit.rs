// Audit tags and one-time PINs

use hmac::{Hmac, Mac};
use rand::{thread_rng, Rng};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Hex-encoded HMAC-SHA256 of `payload` under the server-held audit key.
/// Tags are opaque to clients; only the holder of the key can recompute one.
pub fn audit_tag(key: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes()).expect("HMAC key");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Tag stored on a ballot row. The ballot itself never stores the dni; this
/// tag is the only, key-gated link back to the casting event.
pub fn ballot_tag(key: &str, dni: &str, race: &str, timestamp: &str) -> String {
    audit_tag(key, &format!("{dni}|{race}|{timestamp}"))
}

/// Tag stored on a ledger row.
pub fn ledger_tag(key: &str, ballot_id: &str, mesa_id: i32) -> String {
    audit_tag(key, &format!("{ballot_id}|{mesa_id}"))
}

/// Fresh single-use 6-digit PIN.
pub fn generate_otp() -> String {
    thread_rng().gen_range(100_000..1_000_000).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_are_deterministic_per_key_and_payload() {
        let a = audit_tag("secret", "1001|rep|2025-08-05 10:00:00");
        let b = audit_tag("secret", "1001|rep|2025-08-05 10:00:00");
        assert_eq!(a, b);
    }

    #[test]
    fn tags_differ_across_keys() {
        let a = audit_tag("secret", "payload");
        let b = audit_tag("other", "payload");
        assert_ne!(a, b);
    }

    #[test]
    fn tags_differ_across_races() {
        let a = ballot_tag("secret", "1001", "rep", "2025-08-05 10:00:00");
        let b = ballot_tag("secret", "1001", "amb", "2025-08-05 10:00:00");
        assert_ne!(a, b);
    }

    #[test]
    fn tags_are_hex_sha256_digests() {
        let tag = ledger_tag("secret", "some-ballot", 3);
        assert_eq!(tag.len(), 64);
        assert!(tag.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn otp_is_six_digits() {
        for _ in 0..100 {
            let otp = generate_otp();
            assert_eq!(otp.len(), 6);
            let value: u32 = otp.parse().unwrap();
            assert!((100_000..1_000_000).contains(&value));
        }
    }
}

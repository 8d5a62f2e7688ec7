use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

/// A freshly issued verification/reset token. The plaintext is emailed to the
/// user exactly once; only the digest and expiry are ever persisted.
pub struct IssuedToken {
    pub plaintext: String,
    pub digest: String,
    pub expires_at: OffsetDateTime,
}

/// Generates a single-use lifecycle token: 32 bytes of OS entropy, hex
/// encoded, with its SHA-256 digest for storage.
pub fn issue(now: OffsetDateTime, ttl: Duration) -> IssuedToken {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let plaintext = hex::encode(bytes);
    IssuedToken {
        digest: digest(&plaintext),
        plaintext,
        expires_at: now + ttl,
    }
}

/// One-way digest of a candidate token, matching what `issue` stores.
pub fn digest(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}

/// A token is redeemable only while its expiry is strictly in the future.
/// Mirrors the `expires_at > now` filter in the redemption query.
pub fn is_live(expires_at: OffsetDateTime, now: OffsetDateTime) -> bool {
    expires_at > now
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ttl() -> Duration {
        Duration::minutes(10)
    }

    #[test]
    fn digest_matches_issued_plaintext() {
        let now = OffsetDateTime::now_utc();
        let token = issue(now, ttl());
        assert_eq!(digest(&token.plaintext), token.digest);
        assert_ne!(token.plaintext, token.digest);
    }

    #[test]
    fn plaintext_has_expected_entropy() {
        let now = OffsetDateTime::now_utc();
        let token = issue(now, ttl());
        // 32 random bytes, hex encoded.
        assert_eq!(token.plaintext.len(), 64);
        assert!(token.plaintext.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn consecutive_issues_differ() {
        let now = OffsetDateTime::now_utc();
        let a = issue(now, ttl());
        let b = issue(now, ttl());
        assert_ne!(a.plaintext, b.plaintext);
        assert_ne!(a.digest, b.digest);
    }

    #[test]
    fn wrong_candidate_does_not_match() {
        let now = OffsetDateTime::now_utc();
        let token = issue(now, ttl());
        assert_ne!(digest("some-guess"), token.digest);
    }

    #[test]
    fn expiry_is_now_plus_ttl() {
        let now = OffsetDateTime::now_utc();
        let token = issue(now, ttl());
        assert_eq!(token.expires_at, now + Duration::minutes(10));
    }

    #[test]
    fn live_one_second_before_expiry() {
        let now = OffsetDateTime::now_utc();
        let token = issue(now, ttl());
        assert!(is_live(token.expires_at, token.expires_at - Duration::seconds(1)));
    }

    #[test]
    fn dead_one_second_after_expiry() {
        let now = OffsetDateTime::now_utc();
        let token = issue(now, ttl());
        assert!(!is_live(token.expires_at, token.expires_at + Duration::seconds(1)));
    }

    #[test]
    fn dead_exactly_at_expiry() {
        // "Strictly in the future": the boundary instant is already dead.
        let now = OffsetDateTime::now_utc();
        let token = issue(now, ttl());
        assert!(!is_live(token.expires_at, token.expires_at));
    }
}

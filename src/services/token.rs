//! Auto-login cookie tokens.
//!
//! The cookie stores a small JSON document: the username, the issue time
//! and a SHA-256 digest binding both to the account's current password
//! hash. No token state is kept server-side; changing the password
//! rotates the digest input and invalidates every outstanding cookie.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Cookie name carrying the serialized token.
pub const AUTO_LOGIN_COOKIE: &str = "auto_login";

/// How many trailing characters of the stored password hash are mixed
/// into the digest. PHC strings share a constant algorithm prefix, so the
/// tail is the part that actually varies per hash.
const SECRET_LEN: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoLoginToken {
    pub username: String,
    pub timestamp: String,
    pub token: String,
}

impl AutoLoginToken {
    /// Issue a fresh token for an account, stamped now.
    #[must_use]
    pub fn issue(username: &str, password_hash: &str) -> Self {
        let timestamp = Utc::now().to_rfc3339();
        let token = digest(username, &timestamp, password_hash);

        Self {
            username: username.to_string(),
            timestamp,
            token,
        }
    }

    /// Check the digest and lifetime against the account's current
    /// password hash. Malformed timestamps fail closed.
    #[must_use]
    pub fn verify(&self, password_hash: &str, lifetime_days: i64) -> bool {
        let Ok(issued) = chrono::DateTime::parse_from_rfc3339(&self.timestamp) else {
            return false;
        };

        let age = Utc::now().signed_duration_since(issued);
        if age < chrono::Duration::zero() || age > chrono::Duration::days(lifetime_days) {
            return false;
        }

        self.token == digest(&self.username, &self.timestamp, password_hash)
    }

    /// Serialize for storage in a cookie value.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse a cookie value. Anything that is not the expected JSON shape
    /// yields `None`.
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}

fn digest(username: &str, timestamp: &str, password_hash: &str) -> String {
    let secret_start = password_hash.len().saturating_sub(SECRET_LEN);
    let secret = &password_hash[secret_start..];

    let mut hasher = Sha256::new();
    hasher.update(username.as_bytes());
    hasher.update(timestamp.as_bytes());
    hasher.update(secret.as_bytes());
    let hash = hasher.finalize();

    format!("{hash:x}")
}

/// Fingerprint a client device from its IP and user agent.
#[must_use]
pub fn device_fingerprint(ip: &str, user_agent: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(ip.as_bytes());
    hasher.update(b":");
    hasher.update(user_agent.as_bytes());
    let hash = hasher.finalize();

    format!("{hash:x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$YWJjZGVmZ2hpamtsbW5vcA";

    #[test]
    fn test_issue_and_verify() {
        let token = AutoLoginToken::issue("alice", HASH);
        assert!(token.verify(HASH, 30));
    }

    #[test]
    fn test_verify_rejects_changed_hash() {
        let token = AutoLoginToken::issue("alice", HASH);

        let other_hash = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdHNhbHQ$cXJzdHV2d3h5ejAxMjM0NQ";
        assert!(!token.verify(other_hash, 30));
    }

    #[test]
    fn test_verify_rejects_expired() {
        let timestamp = (Utc::now() - chrono::Duration::days(31)).to_rfc3339();
        let token = AutoLoginToken {
            username: "alice".to_string(),
            token: digest("alice", &timestamp, HASH),
            timestamp,
        };

        assert!(!token.verify(HASH, 30));
    }

    #[test]
    fn test_verify_rejects_tampered_username() {
        let mut token = AutoLoginToken::issue("alice", HASH);
        token.username = "admin".to_string();

        assert!(!token.verify(HASH, 30));
    }

    #[test]
    fn test_verify_rejects_garbage_timestamp() {
        let token = AutoLoginToken {
            username: "alice".to_string(),
            timestamp: "not-a-time".to_string(),
            token: "deadbeef".to_string(),
        };

        assert!(!token.verify(HASH, 30));
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(AutoLoginToken::decode("{not json").is_none());
        assert!(AutoLoginToken::decode("42").is_none());
    }

    #[test]
    fn test_cookie_roundtrip() {
        let token = AutoLoginToken::issue("alice", HASH);
        let decoded = AutoLoginToken::decode(&token.encode()).unwrap();

        assert_eq!(decoded.username, token.username);
        assert_eq!(decoded.token, token.token);
    }

    #[test]
    fn test_fingerprint_depends_on_both_parts() {
        let a = device_fingerprint("1.2.3.4", "Mozilla/5.0");
        let b = device_fingerprint("1.2.3.5", "Mozilla/5.0");
        let c = device_fingerprint("1.2.3.4", "curl/8.0");

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }
}

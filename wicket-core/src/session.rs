//! Session records
//!
//! A session is what a successful login turns into. It is keyed by an opaque
//! token delivered to the browser in a cookie.
//!
//! | Field          | Type         | Description                                   |
//! | -------------- | ------------ | --------------------------------------------- |
//! | `token`        | `String`     | Opaque, unguessable session identifier.       |
//! | `identity_id`  | `IdentityId` | The identity the session was issued for.      |
//! | `email`        | `String`     | Identity email, required by protected routes. |
//! | `role`         | `Role`       | Identity role, required by protected routes.  |
//! | `created_at`   | `DateTime`   | When the session was issued.                  |
//! | `last_seen_at` | `DateTime`   | Last activity, drives the idle timeout.       |
use std::fmt;

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::{Identity, IdentityId, Role};

/// Number of random bytes behind every session token (256 bits).
const TOKEN_BYTES: usize = 32;

/// Opaque session token with 256 bits of entropy, used for lookups in the
/// session repository.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap an existing token string (e.g. the value of an incoming cookie)
    pub fn new(token: &str) -> Self {
        SessionToken(token.to_string())
    }

    /// Create a new random token
    pub fn new_random() -> Self {
        let mut bytes = [0u8; TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        SessionToken(BASE64_URL_SAFE_NO_PAD.encode(bytes))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SessionToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Tokens are bearer credentials; only a short prefix ever reaches the logs.
impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "SessionToken({prefix}…)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: SessionToken,
    pub identity_id: IdentityId,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

impl SessionRecord {
    /// Create a fresh record with a new random token for `identity`.
    pub fn for_identity(identity: &Identity) -> Self {
        let now = Utc::now();
        Self {
            token: SessionToken::new_random(),
            identity_id: identity.id.clone(),
            email: identity.email.clone(),
            role: identity.role,
            created_at: now,
            last_seen_at: now,
        }
    }

    /// Whether the session has seen no activity for at least `idle_timeout`.
    pub fn is_idle_expired(&self, idle_timeout: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_seen_at >= idle_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> Identity {
        Identity::builder()
            .email("agent@example.com")
            .password("pw")
            .role(Role::Admin)
            .build()
            .unwrap()
    }

    #[test]
    fn test_random_tokens_are_distinct() {
        let a = SessionToken::new_random();
        let b = SessionToken::new_random();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 43);
    }

    #[test]
    fn test_debug_does_not_leak_token() {
        let token = SessionToken::new("abcdefghijklmnopqrstuvwxyz");
        let debug = format!("{token:?}");
        assert!(debug.starts_with("SessionToken(abcdef"));
        assert!(!debug.contains("uvwxyz"));
    }

    #[test]
    fn test_record_carries_email_and_role() {
        let identity = identity();
        let record = SessionRecord::for_identity(&identity);
        assert_eq!(record.email, "agent@example.com");
        assert_eq!(record.role, Role::Admin);
        assert_eq!(record.identity_id, identity.id);
    }

    #[test]
    fn test_idle_expiry() {
        let record = SessionRecord::for_identity(&identity());
        let timeout = Duration::minutes(20);

        assert!(!record.is_idle_expired(timeout, record.last_seen_at + Duration::minutes(19)));
        assert!(record.is_idle_expired(timeout, record.last_seen_at + Duration::minutes(20)));
    }
}

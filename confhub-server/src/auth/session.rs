//! Session credential verification
//!
//! Sessions are issued by the identity provider as opaque tokens of the form
//! `<uid>.<expires_ms>.<hash>`, where `hash` is the hex SHA-256 of
//! `uid`, `expires_ms` and the shared session secret. The server only
//! verifies them.

use async_trait::async_trait;
use chrono::Utc;
use confhub_common::{Error, Result};
use sha2::{Digest, Sha256};

/// Maps a session credential to a user id
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Returns the verified uid, or `Unauthenticated`
    async fn verify(&self, credential: &str) -> Result<String>;
}

/// Calculate the session hash (64 lowercase hex characters)
pub fn session_hash(uid: &str, expires_ms: i64, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(uid.as_bytes());
    hasher.update(b".");
    hasher.update(expires_ms.to_string().as_bytes());
    hasher.update(b".");
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Build a session token for `uid` valid until `expires_ms` (Unix millis)
pub fn sign_session(uid: &str, expires_ms: i64, secret: &str) -> String {
    format!("{}.{}.{}", uid, expires_ms, session_hash(uid, expires_ms, secret))
}

/// Verifier for tokens produced by [`sign_session`]
pub struct SignedSessionVerifier {
    secret: String,
}

impl SignedSessionVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn check(&self, credential: &str, now_ms: i64) -> Result<String> {
        // uid may itself contain dots, so split from the right
        let mut parts = credential.rsplitn(3, '.');
        let (Some(hash), Some(expires), Some(uid)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(Error::Unauthenticated("malformed session token".to_string()));
        };

        if uid.is_empty() {
            return Err(Error::Unauthenticated("session token has no uid".to_string()));
        }
        let expires_ms: i64 = expires
            .parse()
            .map_err(|_| Error::Unauthenticated("malformed session expiry".to_string()))?;

        let expected = session_hash(uid, expires_ms, &self.secret);
        if !constant_time_eq(hash.as_bytes(), expected.as_bytes()) {
            return Err(Error::Unauthenticated("session hash mismatch".to_string()));
        }
        if expires_ms <= now_ms {
            return Err(Error::Unauthenticated("session expired".to_string()));
        }

        Ok(uid.to_string())
    }
}

#[async_trait]
impl IdentityVerifier for SignedSessionVerifier {
    async fn verify(&self, credential: &str) -> Result<String> {
        self.check(credential, Utc::now().timestamp_millis())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

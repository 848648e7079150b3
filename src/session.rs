//! Session service
//!
//! Issues an authenticated session once a ceremony succeeds. Token issuance
//! mechanics are opaque to the passkey core: the orchestrator returns a
//! credential record and the handler exchanges its owner for a session here.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use ring::hmac;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::passkey::generate_opaque_token;
use crate::settings::SessionSettings;

/// Session issuance failures
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session creation failed: {0}")]
    Creation(String),
}

/// An issued session
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Session {
    pub token: String, // Opaque bearer token, keyed with the session secret
    pub user_id: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Contract consumed by the ceremony endpoints
pub trait SessionService: Send + Sync {
    /// Issue a session for an authenticated account
    ///
    /// # Errors
    /// Returns `SessionError::Creation` if a session cannot be issued.
    fn login(&self, user_id: &str) -> Result<Session, SessionError>;

    /// Check that a bearer token was issued under the current secret
    fn validate(&self, token: &str) -> bool;
}

/// Stateless session manager issuing HMAC-keyed bearer tokens
///
/// Tokens are `<nonce>.<tag>`: a random nonce plus its HMAC-SHA256 tag under
/// the configured session secret. Rotating the secret invalidates every
/// outstanding token.
pub struct SessionManager {
    duration: Duration,
    key: hmac::Key,
}

impl SessionManager {
    #[must_use]
    pub fn new(settings: &SessionSettings) -> Self {
        Self {
            duration: Duration::hours(
                i64::try_from(settings.session_duration_hours).unwrap_or(24),
            ),
            key: hmac::Key::new(hmac::HMAC_SHA256, settings.session_secret.as_bytes()),
        }
    }
}

impl SessionService for SessionManager {
    fn login(&self, user_id: &str) -> Result<Session, SessionError> {
        let issued_at = Utc::now();
        let nonce = generate_opaque_token();
        let tag = hmac::sign(&self.key, nonce.as_bytes());
        Ok(Session {
            token: format!("{nonce}.{}", URL_SAFE_NO_PAD.encode(tag.as_ref())),
            user_id: user_id.to_string(),
            issued_at,
            expires_at: issued_at + self.duration,
        })
    }

    fn validate(&self, token: &str) -> bool {
        let Some((nonce, tag_b64)) = token.split_once('.') else {
            return false;
        };
        let Ok(tag) = URL_SAFE_NO_PAD.decode(tag_b64) else {
            return false;
        };
        hmac::verify(&self.key, nonce.as_bytes(), &tag).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(secret: &str) -> SessionSettings {
        SessionSettings {
            session_duration_hours: 24,
            session_secret: secret.to_string(),
        }
    }

    #[test]
    fn test_login_issues_distinct_tokens() {
        let manager = SessionManager::new(&settings("secret-1"));
        let first = manager.login("u1").unwrap();
        let second = manager.login("u1").unwrap();
        assert_ne!(first.token, second.token);
        assert_eq!(first.user_id, "u1");
    }

    #[test]
    fn test_issued_tokens_validate_under_same_secret() {
        let manager = SessionManager::new(&settings("secret-1"));
        let session = manager.login("u1").unwrap();
        assert!(manager.validate(&session.token));
    }

    #[test]
    fn test_rotated_secret_rejects_outstanding_tokens() {
        let session = SessionManager::new(&settings("secret-1"))
            .login("u1")
            .unwrap();
        let rotated = SessionManager::new(&settings("secret-2"));
        assert!(!rotated.validate(&session.token));
    }

    #[test]
    fn test_tampered_token_rejected() {
        let manager = SessionManager::new(&settings("secret-1"));
        let session = manager.login("u1").unwrap();

        let mut forged = session.token.clone();
        forged.replace_range(0..1, if forged.starts_with('A') { "B" } else { "A" });
        assert!(!manager.validate(&forged));
        assert!(!manager.validate("no-separator"));
        assert!(!manager.validate("nonce.!!!not-base64"));
    }

    #[test]
    fn test_session_expiry_follows_settings() {
        let settings = SessionSettings {
            session_duration_hours: 1,
            session_secret: "secret-1".to_string(),
        };
        let session = SessionManager::new(&settings).login("u1").unwrap();
        assert_eq!(session.expires_at - session.issued_at, Duration::hours(1));
    }
}

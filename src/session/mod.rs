use crate::auth::Role;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Access tokens are short-lived (hour scale).
pub const DEFAULT_ACCESS_TTL_SECS: i64 = 3600;

/// Refresh tokens are long-lived (week scale).
pub const DEFAULT_REFRESH_TTL_SECS: i64 = 7 * 24 * 3600;

/// Identity a token stands for: the user id and the role held at issuance.
/// Later role changes do not invalidate outstanding tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subject {
    pub id: i64,
    pub role: Role,
}

#[derive(Serialize, Deserialize, Debug)]
struct Claims {
    sub: String,
    id: i64,
    role: Role,
    iat: i64,
    exp: i64,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("token expired")]
    Expired,
    #[error("invalid token signature")]
    InvalidSignature,
    #[error("malformed token")]
    Malformed,
    #[error("failed to sign token")]
    Signing,
}

impl From<jsonwebtoken::errors::Error> for SessionError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            _ => Self::Malformed,
        }
    }
}

/// Mints and validates the HMAC-signed bearer tokens of a session.
/// Stateless: nothing is stored server-side and no revocation list exists.
#[derive(Clone)]
pub struct SessionIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl SessionIssuer {
    #[must_use]
    pub fn new(secret: &SecretString, access_ttl_secs: i64, refresh_ttl_secs: i64) -> Self {
        let secret = secret.expose_secret().as_bytes();

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            access_ttl: Duration::seconds(access_ttl_secs),
            refresh_ttl: Duration::seconds(refresh_ttl_secs),
        }
    }

    /// Signs a short-lived access token for `subject`.
    ///
    /// # Errors
    /// Returns `SessionError::Signing` if encoding fails.
    pub fn issue_access_token(&self, subject: Subject) -> Result<String, SessionError> {
        self.sign(subject, self.access_ttl)
    }

    /// Signs a long-lived refresh token for `subject`.
    ///
    /// # Errors
    /// Returns `SessionError::Signing` if encoding fails.
    pub fn issue_refresh_token(&self, subject: Subject) -> Result<String, SessionError> {
        self.sign(subject, self.refresh_ttl)
    }

    /// Verifies signature and expiration, returning the embedded subject.
    ///
    /// # Errors
    /// `Expired` past the expiration claim, `InvalidSignature` when
    /// tampered, `Malformed` for anything structurally invalid.
    pub fn verify(&self, token: &str) -> Result<Subject, SessionError> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.decoding_key, &validation)?;

        Ok(Subject {
            id: data.claims.id,
            role: data.claims.role,
        })
    }

    /// Exchanges a valid refresh token for a fresh access token carrying
    /// the same subject. The refresh token itself is not rotated.
    ///
    /// # Errors
    /// Propagates verification failures of the refresh token.
    pub fn refresh(&self, refresh_token: &str) -> Result<String, SessionError> {
        let subject = self.verify(refresh_token)?;

        self.issue_access_token(subject)
    }

    fn sign(&self, subject: Subject, ttl: Duration) -> Result<String, SessionError> {
        let now = Utc::now();

        let claims = Claims {
            sub: subject.id.to_string(),
            id: subject.id,
            role: subject.role,
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| SessionError::Signing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issuer() -> SessionIssuer {
        SessionIssuer::new(
            &SecretString::from("test-signing-key".to_string()),
            DEFAULT_ACCESS_TTL_SECS,
            DEFAULT_REFRESH_TTL_SECS,
        )
    }

    #[test]
    fn test_access_token_roundtrip() {
        let issuer = issuer();
        let subject = Subject { id: 42, role: Role::Seller };

        let token = issuer.issue_access_token(subject).expect("token");
        let verified = issuer.verify(&token).expect("verify");

        assert_eq!(verified, subject);
    }

    #[test]
    fn test_expired_token() {
        let expired = SessionIssuer::new(
            &SecretString::from("test-signing-key".to_string()),
            -10,
            -10,
        );
        let subject = Subject { id: 1, role: Role::User };

        let token = expired.issue_access_token(subject).expect("token");

        assert_eq!(issuer().verify(&token), Err(SessionError::Expired));
    }

    #[test]
    fn test_tampered_token() {
        let other = SessionIssuer::new(
            &SecretString::from("some-other-key".to_string()),
            DEFAULT_ACCESS_TTL_SECS,
            DEFAULT_REFRESH_TTL_SECS,
        );
        let subject = Subject { id: 1, role: Role::User };

        let token = other.issue_access_token(subject).expect("token");

        assert_eq!(issuer().verify(&token), Err(SessionError::InvalidSignature));
    }

    #[test]
    fn test_malformed_token() {
        assert_eq!(
            issuer().verify("not-a-token"),
            Err(SessionError::Malformed)
        );
    }

    #[test]
    fn test_refresh_preserves_subject() {
        let issuer = issuer();
        let subject = Subject { id: 7, role: Role::Admin };

        let refresh_token = issuer.issue_refresh_token(subject).expect("token");
        let access_token = issuer.refresh(&refresh_token).expect("refresh");

        assert_eq!(issuer.verify(&access_token).expect("verify"), subject);
    }

    #[test]
    fn test_refresh_rejects_expired() {
        let expired = SessionIssuer::new(
            &SecretString::from("test-signing-key".to_string()),
            DEFAULT_ACCESS_TTL_SECS,
            -10,
        );
        let subject = Subject { id: 7, role: Role::Admin };

        let refresh_token = expired.issue_refresh_token(subject).expect("token");

        assert_eq!(issuer().refresh(&refresh_token), Err(SessionError::Expired));
    }
}

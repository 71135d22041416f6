//! Signed session token creation and verification.
//!
//! Tokens are HS256 JWTs carrying the principal id, email, and a kind
//! discriminator. User and admin cookies are separate principals, so a
//! token of one kind never verifies as the other.

use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::Config, errors::Error};

/// Which kind of principal a session token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    User,
    Admin,
}

impl SessionKind {
    /// The configured token lifetime for this kind of session.
    pub fn ttl(self, config: &Config) -> std::time::Duration {
        match self {
            SessionKind::User => config.auth.user_session.timeout,
            SessionKind::Admin => config.auth.admin_session.timeout,
        }
    }
}

/// Session token claims
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: Uuid,         // Subject (principal ID)
    pub email: String,     // Principal email
    pub kind: SessionKind, // user or admin
    pub exp: i64,          // Expiration time
    pub iat: i64,          // Issued at
}

impl SessionClaims {
    pub fn new(principal_id: Uuid, email: &str, kind: SessionKind, config: &Config) -> Self {
        let now = Utc::now();
        let exp = now + kind.ttl(config);

        Self {
            sub: principal_id,
            email: email.to_string(),
            kind,
            exp: exp.timestamp(),
            iat: now.timestamp(),
        }
    }
}

/// Create a signed session token for a principal
pub fn issue_session_token(principal_id: Uuid, email: &str, kind: SessionKind, config: &Config) -> Result<String, Error> {
    let claims = SessionClaims::new(principal_id, email, kind, config);
    let secret_key = config.secret_key.as_ref().ok_or_else(|| Error::Internal {
        operation: "session tokens: secret_key is required".to_string(),
    })?;

    let key = EncodingKey::from_secret(secret_key.as_bytes());
    encode(&Header::default(), &claims, &key).map_err(|e| Error::Internal {
        operation: format!("create session token: {e}"),
    })
}

/// Verify and decode a session token, checking it is of the expected kind
pub fn verify_session_token(token: &str, expected_kind: SessionKind, config: &Config) -> Result<SessionClaims, Error> {
    let secret_key = config.secret_key.as_ref().ok_or_else(|| Error::Internal {
        operation: "session tokens: secret_key is required".to_string(),
    })?;

    let key = DecodingKey::from_secret(secret_key.as_bytes());
    let validation = Validation::default();

    let token_data = decode::<SessionClaims>(token, &key, &validation).map_err(|e| match e.kind() {
        // Client errors (401) - malformed tokens, invalid claims, expired tokens
        jsonwebtoken::errors::ErrorKind::InvalidToken
        | jsonwebtoken::errors::ErrorKind::InvalidSignature
        | jsonwebtoken::errors::ErrorKind::ExpiredSignature
        | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
        | jsonwebtoken::errors::ErrorKind::InvalidIssuer
        | jsonwebtoken::errors::ErrorKind::InvalidAudience
        | jsonwebtoken::errors::ErrorKind::InvalidSubject
        | jsonwebtoken::errors::ErrorKind::ImmatureSignature
        | jsonwebtoken::errors::ErrorKind::Base64(_)
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => Error::Unauthenticated { message: None },

        // Server errors (500) - key issues, internal failures
        jsonwebtoken::errors::ErrorKind::InvalidEcdsaKey
        | jsonwebtoken::errors::ErrorKind::InvalidRsaKey(_)
        | jsonwebtoken::errors::ErrorKind::RsaFailedSigning
        | jsonwebtoken::errors::ErrorKind::InvalidAlgorithmName
        | jsonwebtoken::errors::ErrorKind::InvalidKeyFormat
        | jsonwebtoken::errors::ErrorKind::MissingAlgorithm
        | jsonwebtoken::errors::ErrorKind::Json(_)
        | jsonwebtoken::errors::ErrorKind::Utf8(_)
        | jsonwebtoken::errors::ErrorKind::Crypto(_) => Error::Internal {
            operation: format!("session token verification: {e}"),
        },

        // Catch-all for any future error variants (default to server error for safety)
        _ => Error::Internal {
            operation: format!("session token verification (unknown error): {e}"),
        },
    })?;

    // A user token presented at an admin boundary (or vice versa) is not a
    // server fault, it's an unauthenticated request.
    if token_data.claims.kind != expected_kind {
        return Err(Error::Unauthenticated { message: None });
    }

    Ok(token_data.claims)
}

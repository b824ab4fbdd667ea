//! JWT session token issuance and verification
//!
//! Implements HMAC-SHA256 signed tokens carrying the username as subject.
//! The signing secret is fixed when the codec is built and never changes for
//! the life of the process.
//!
//! Verification order matters: the signature is checked before any claim is
//! trusted, and expiry is then checked against the injected [`Clock`] rather
//! than the library's own wall-clock read.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use tollgate_core::{AuthConfig, Clock};
use uuid::Uuid;

/// JWT Claims structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Token issuer
    pub iss: String,
    /// Subject - username
    pub sub: String,
    /// JWT ID - makes every issued token distinct
    pub jti: String,
    /// Issued at timestamp (Unix epoch)
    pub iat: i64,
    /// Expiration timestamp (Unix epoch)
    pub exp: i64,
}

impl Claims {
    /// Expiration as a UTC timestamp
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    Malformed,

    #[error("Token has expired")]
    Expired,

    #[error("Token lifetime is out of range")]
    LifetimeOutOfRange,

    #[error("Invalid token signature")]
    InvalidSignature,
}

/// A freshly signed token and its expiration
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies session tokens
#[derive(Clone)]
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenCodec {
    pub fn new(secret: &[u8], issuer: impl Into<String>, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer: issuer.into(),
            clock,
        }
    }

    pub fn from_config(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self::new(config.secret.as_bytes(), config.issuer.clone(), clock)
    }

    /// Sign a token for `username` that expires `ttl` from now
    ///
    /// # Example
    ///
    /// ```no_run
    /// use std::sync::Arc;
    /// use chrono::Duration;
    /// use tollgate_api::auth::jwt::TokenCodec;
    /// use tollgate_core::SystemClock;
    ///
    /// let codec = TokenCodec::new(b"secret", "tollgate", Arc::new(SystemClock));
    /// let issued = codec.issue("alice", Duration::hours(24)).expect("Failed to sign token");
    /// let claims = codec.verify(&issued.token).expect("Invalid token");
    /// assert_eq!(claims.sub, "alice");
    /// ```
    pub fn issue(&self, username: &str, ttl: Duration) -> Result<IssuedToken, TokenError> {
        let now = self.clock.now();
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(TokenError::LifetimeOutOfRange)?;

        let claims = Claims {
            iss: self.issuer.clone(),
            sub: username.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)?;

        Ok(IssuedToken {
            token,
            // Second precision, matching what the token itself carries
            expires_at: claims.expires_at(),
        })
    }

    /// Verify signature, issuer and expiry, then return the claims
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "iss"]);
        // Expiry is judged by the injected clock below
        validation.validate_exp = false;
        validation.leeway = 0;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        let claims = token_data.claims;
        if self.clock.now().timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

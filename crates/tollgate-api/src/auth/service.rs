//! Authentication service layer
//!
//! Provides the three use cases of the service: registration, login and token
//! validation. The service is a stateless coordinator over the credential and
//! session stores; it holds no locks and no per-request state, and every store
//! call is bounded by the configured timeout.

use super::jwt::{TokenCodec, TokenError};
use super::password::{PasswordConfig, PasswordError, PasswordHasher};
use crate::audit::{audit_log, AuditEvent, RejectReason};
use crate::error::AppError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tollgate_core::{AuthConfig, CredentialStore, SessionStore, StoreError, User};
use utoipa::ToSchema;
use uuid::Uuid;

/// Verified against when the username is unknown, so both failure paths cost the same
const DUMMY_PASSWORD: &str = "tollgate-timing-equalizer";

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    /// Bearer token to present on validation
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Public user information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserInfo {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

/// A token that passed every validation check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSession {
    pub user_id: Uuid,
    pub username: String,
    pub expires_at: DateTime<Utc>,
}

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    credentials: Arc<dyn CredentialStore>,
    sessions: Arc<dyn SessionStore>,
    codec: TokenCodec,
    hasher: PasswordHasher,
    session_ttl: Duration,
    store_timeout: std::time::Duration,
    dummy_hash: Arc<OnceCell<String>>,
}

impl AuthService {
    /// Create a new authentication service
    ///
    /// Defaults to a 24 hour session lifetime, a 5 second store timeout and
    /// production Argon2 parameters.
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        sessions: Arc<dyn SessionStore>,
        codec: TokenCodec,
    ) -> Self {
        Self {
            credentials,
            sessions,
            codec,
            hasher: PasswordHasher::default(),
            session_ttl: Duration::hours(24),
            store_timeout: std::time::Duration::from_secs(5),
            dummy_hash: Arc::new(OnceCell::new()),
        }
    }

    pub fn with_password_config(mut self, config: PasswordConfig) -> Self {
        self.hasher = PasswordHasher::new(config);
        self
    }

    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    pub fn with_store_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    /// Apply session lifetime from configuration
    pub fn with_auth_config(self, config: &AuthConfig) -> Self {
        let ttl = i64::try_from(config.session_ttl_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX);
        self.with_session_ttl(ttl)
    }

    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }

    /// Register a new user
    ///
    /// # Returns
    ///
    /// * `Ok(UserInfo)` - Newly created user
    /// * `Err(AppError::BadRequest)` - Empty username or password
    /// * `Err(AppError::Conflict)` - Username already taken
    /// * `Err(AppError::Internal)` - Hashing or store failure
    pub async fn register(&self, request: RegisterRequest) -> Result<UserInfo, AppError> {
        if request.username.is_empty() || request.password.is_empty() {
            return Err(AppError::BadRequest(
                "Username and password are required".to_string(),
            ));
        }

        let password_hash = self.hash_password(request.password).await?;

        let created = self
            .bounded(self.credentials.create(&request.username, &password_hash))
            .await;

        match created {
            Ok(user) => {
                audit_log(&AuditEvent::RegistrationSuccess {
                    user_id: user.id,
                    username: user.username.clone(),
                });
                Ok(user.into())
            }
            Err(StoreError::Conflict(_)) => {
                audit_log(&AuditEvent::RegistrationConflict {
                    username: request.username,
                });
                Err(AppError::Conflict("Username already exists".to_string()))
            }
            Err(e) => Err(AppError::Internal(format!("Failed to create user: {e}"))),
        }
    }

    /// Login with username and password
    ///
    /// A successful login shadows every earlier session of the user. The token
    /// is only returned once its session row has been recorded.
    ///
    /// # Returns
    ///
    /// * `Ok(LoginResponse)` - Signed token and its expiration
    /// * `Err(AppError::Unauthorized)` - Unknown user or wrong password
    /// * `Err(AppError::Internal)` - Store or signing failure
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AppError> {
        let found = self
            .bounded(self.credentials.find_by_username(&request.username))
            .await;

        let user = match found {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => {
                self.burn_verification(request.password).await;
                audit_log(&AuditEvent::LoginFailure {
                    username: request.username,
                    reason: "unknown user".to_string(),
                });
                return Err(AppError::Unauthorized);
            }
            Err(e) => return Err(AppError::Internal(format!("Failed to fetch user: {e}"))),
        };

        let password_valid = match self
            .verify_password(request.password, user.password_hash.clone())
            .await?
        {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Stored password hash is unusable");
                false
            }
        };

        if !password_valid {
            audit_log(&AuditEvent::LoginFailure {
                username: user.username,
                reason: "wrong password".to_string(),
            });
            return Err(AppError::Unauthorized);
        }

        let issued = self
            .codec
            .issue(&user.username, self.session_ttl)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {e}")))?;

        self.bounded(self.sessions.put(user.id, &issued.token, issued.expires_at))
            .await
            .map_err(|e| AppError::Internal(format!("Failed to store session token: {e}")))?;

        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            username: user.username,
            expires_at: issued.expires_at,
        });

        Ok(LoginResponse {
            token: issued.token,
            expires_at: issued.expires_at,
        })
    }

    /// Validate a presented bearer token
    ///
    /// The token must verify cryptographically, must not be expired, and must
    /// be byte-for-byte the latest session recorded for its user.
    pub async fn validate(&self, token: &str) -> Result<ValidatedSession, AppError> {
        if token.is_empty() {
            audit_log(&AuditEvent::TokenRejected {
                username: None,
                reason: RejectReason::Missing,
            });
            return Err(AppError::Unauthorized);
        }

        let claims = match self.codec.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                let reason = match e {
                    TokenError::Expired => RejectReason::Expired,
                    TokenError::InvalidSignature => RejectReason::BadSignature,
                    _ => RejectReason::Malformed,
                };
                audit_log(&AuditEvent::TokenRejected {
                    username: None,
                    reason,
                });
                return Err(AppError::Unauthorized);
            }
        };

        let found = self
            .bounded(self.credentials.find_by_username(&claims.sub))
            .await;

        let user = match found {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => {
                // Validly signed token for a user that does not exist
                audit_log(&AuditEvent::TokenRejected {
                    username: Some(claims.sub.clone()),
                    reason: RejectReason::UnknownUser,
                });
                return Err(AppError::Internal(format!(
                    "Signed token references missing user {}",
                    claims.sub
                )));
            }
            Err(e) => return Err(AppError::Internal(format!("Failed to fetch user: {e}"))),
        };

        let latest = match self.bounded(self.sessions.get_latest(user.id)).await {
            Ok(latest) => latest,
            Err(StoreError::NotFound(_)) => {
                audit_log(&AuditEvent::TokenRejected {
                    username: Some(user.username),
                    reason: RejectReason::NoSession,
                });
                return Err(AppError::Unauthorized);
            }
            Err(e) => {
                return Err(AppError::Internal(format!(
                    "Failed to fetch session token: {e}"
                )))
            }
        };

        if latest.token.as_bytes() != token.as_bytes() {
            audit_log(&AuditEvent::TokenRejected {
                username: Some(user.username),
                reason: RejectReason::Shadowed,
            });
            return Err(AppError::Unauthorized);
        }

        audit_log(&AuditEvent::TokenAccepted {
            user_id: user.id,
            username: user.username.clone(),
        });

        Ok(ValidatedSession {
            user_id: user.id,
            username: user.username,
            expires_at: latest.expires_at,
        })
    }

    /// Check the stores are reachable
    pub async fn ping(&self) -> Result<(), StoreError> {
        self.bounded(self.credentials.ping()).await
    }

    /// Run a store call under the configured deadline
    async fn bounded<T, F>(&self, call: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, StoreError>>,
    {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .unwrap_or(Err(StoreError::Timeout))
    }

    async fn hash_password(&self, password: String) -> Result<String, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| AppError::Internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
    }

    async fn verify_password(
        &self,
        password: String,
        hash: String,
    ) -> Result<Result<bool, PasswordError>, AppError> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| AppError::Internal(format!("Password verification task failed: {e}")))
    }

    /// Spend one verification's worth of work on a throwaway hash
    async fn burn_verification(&self, password: String) {
        let dummy = self
            .dummy_hash
            .get_or_try_init(|| self.hash_password(DUMMY_PASSWORD.to_string()))
            .await;

        if let Ok(hash) = dummy {
            let _ = self.verify_password(password, hash.clone()).await;
        }
    }
}

//! Tollgate Core - Domain models, store contracts, and shared types
//!
//! This crate defines the core abstractions used by the Tollgate services:
//! - User and session-token models
//! - Credential and session store traits
//! - PostgreSQL and in-memory store backends
//! - Injectable clock
//! - Configuration management

pub mod clock;
pub mod config;
pub mod memory;
pub mod postgres;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, StoreBackend,
    MAX_SESSION_TTL_SECS,
};
pub use memory::MemoryStore;
pub use postgres::PgStore;
pub use store::{CredentialStore, SessionStore};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Errors surfaced by credential and session stores
#[derive(Error, Debug)]
pub enum StoreError {
    /// Unique constraint violated (duplicate username)
    #[error("Record already exists: {0}")]
    Conflict(String),

    #[error("Record not found: {0}")]
    NotFound(String),

    /// The store call did not finish within the caller's deadline
    #[error("Store operation timed out")]
    Timeout,

    #[error("Database error: {0}")]
    Database(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

// ============================================================================
// Domain Models
// ============================================================================

/// A registered account
///
/// Created once by registration and never updated or deleted afterwards.
/// The password hash is kept out of every serialized form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Identifier assigned by the store
    pub id: Uuid,

    /// Globally unique, immutable login name
    pub username: String,

    /// PHC-format password digest
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
}

/// One issued bearer token
///
/// Rows are append-only. The row with the greatest `expires_at` for a user is
/// that user's current session; older rows are shadowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    /// Store-assigned identifier, increasing with insertion order
    pub id: i64,

    /// Owner of the token
    pub user_id: Uuid,

    /// Serialized signed token
    pub token: String,

    /// Absolute expiration time
    pub expires_at: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

impl SessionToken {
    /// Check whether the token has passed its expiration at `now`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_user_serialization_hides_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            password_hash: "$argon2id$v=19$secret".to_string(),
            created_at: Utc::now(),
        };

        let json = serde_json::to_string(&user).unwrap();
        assert!(json.contains("alice"));
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("argon2id"));
    }

    #[test]
    fn test_session_token_expiry() {
        let now = Utc::now();
        let token = SessionToken {
            id: 1,
            user_id: Uuid::new_v4(),
            token: "t".to_string(),
            expires_at: now + Duration::hours(24),
            created_at: now,
        };

        assert!(!token.is_expired_at(now));
        assert!(token.is_expired_at(now + Duration::hours(24)));
        assert!(token.is_expired_at(now + Duration::hours(25)));
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Conflict("username alice".to_string());
        assert_eq!(err.to_string(), "Record already exists: username alice");
        assert_eq!(StoreError::Timeout.to_string(), "Store operation timed out");
    }
}

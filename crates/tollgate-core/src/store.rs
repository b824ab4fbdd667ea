//! Store contracts for credentials and sessions
//!
//! Both traits are implemented by [`crate::PgStore`] and [`crate::MemoryStore`].
//! All cross-request mutable state lives behind these traits, so implementations
//! carry the concurrency guarantees:
//! - `CredentialStore::create` is an atomic check-and-insert on the username
//! - `SessionStore::put` is append-only
//! - `SessionStore::get_latest` only ever returns fully committed rows

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Result, SessionToken, User};

/// Username to user identity and password hash
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert a new user
    ///
    /// Fails with [`crate::StoreError::Conflict`] when the username is taken.
    async fn create(&self, username: &str, password_hash: &str) -> Result<User>;

    /// Look up a user by username
    ///
    /// Fails with [`crate::StoreError::NotFound`] when no such user exists.
    async fn find_by_username(&self, username: &str) -> Result<User>;

    /// Cheap connectivity check for readiness probes
    async fn ping(&self) -> Result<()>;
}

/// Append-only record of issued tokens
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Record a newly issued token; existing rows are left untouched
    async fn put(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionToken>;

    /// The user's current session: greatest `expires_at`, newest insertion on ties
    ///
    /// Fails with [`crate::StoreError::NotFound`] when the user has no sessions.
    async fn get_latest(&self, user_id: Uuid) -> Result<SessionToken>;
}

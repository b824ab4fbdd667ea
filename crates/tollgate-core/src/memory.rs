//! In-memory store backend
//!
//! Used by tests and by local runs with `STORE_BACKEND=memory`. Nothing is
//! persisted across restarts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::{CredentialStore, SessionStore};
use crate::{Result, SessionToken, StoreError, User};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    sessions: Vec<SessionToken>,
    next_session_id: i64,
}

/// In-memory credential and session store
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of session rows recorded for a user, shadowed ones included
    pub async fn session_count(&self, user_id: Uuid) -> usize {
        self.tables
            .read()
            .await
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .count()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create(&self, username: &str, password_hash: &str) -> Result<User> {
        // Check and insert under one write guard
        let mut tables = self.tables.write().await;
        if tables.users.contains_key(username) {
            return Err(StoreError::Conflict(format!("username {username}")));
        }

        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        tables.users.insert(username.to_string(), user.clone());

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<User> {
        self.tables
            .read()
            .await
            .users
            .get(username)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("user {username}")))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn put(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionToken> {
        let mut tables = self.tables.write().await;
        tables.next_session_id += 1;

        let session = SessionToken {
            id: tables.next_session_id,
            user_id,
            token: token.to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        tables.sessions.push(session.clone());

        Ok(session)
    }

    async fn get_latest(&self, user_id: Uuid) -> Result<SessionToken> {
        self.tables
            .read()
            .await
            .sessions
            .iter()
            .filter(|s| s.user_id == user_id)
            .max_by(|a, b| a.expires_at.cmp(&b.expires_at).then(a.id.cmp(&b.id)))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("session for user {user_id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_create_and_find_user() {
        let store = MemoryStore::new();
        let created = store.create("alice", "hash").await.unwrap();

        let found = store.find_by_username("alice").await.unwrap();
        assert_eq!(found, created);
        assert_eq!(found.password_hash, "hash");
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts_without_overwrite() {
        let store = MemoryStore::new();
        store.create("alice", "first").await.unwrap();

        let result = store.create("alice", "second").await;
        assert!(matches!(result, Err(StoreError::Conflict(_))));

        let found = store.find_by_username("alice").await.unwrap();
        assert_eq!(found.password_hash, "first");
    }

    #[tokio::test]
    async fn test_unknown_user_not_found() {
        let store = MemoryStore::new();
        let result = store.find_by_username("nobody").await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_concurrent_creates_yield_single_success() {
        let store = Arc::new(MemoryStore::new());

        let attempts = (0..16).map(|i| {
            let store = store.clone();
            tokio::spawn(async move { store.create("bob", &format!("hash-{i}")).await })
        });
        let results = futures::future::join_all(attempts).await;

        let successes = results
            .iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Ok(Err(StoreError::Conflict(_)))))
            .count();
        assert_eq!(successes, 1);
        assert_eq!(conflicts, 15);
    }

    #[tokio::test]
    async fn test_get_latest_orders_by_expiration() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let now = Utc::now();

        store.put(user_id, "later", now + Duration::hours(2)).await.unwrap();
        store.put(user_id, "earlier", now + Duration::hours(1)).await.unwrap();

        let latest = store.get_latest(user_id).await.unwrap();
        assert_eq!(latest.token, "later");
        assert_eq!(store.session_count(user_id).await, 2);
    }

    #[tokio::test]
    async fn test_get_latest_tie_breaks_by_insertion() {
        let store = MemoryStore::new();
        let user_id = Uuid::new_v4();
        let expires_at = Utc::now() + Duration::hours(24);

        store.put(user_id, "first", expires_at).await.unwrap();
        store.put(user_id, "second", expires_at).await.unwrap();

        let latest = store.get_latest(user_id).await.unwrap();
        assert_eq!(latest.token, "second");
    }

    #[tokio::test]
    async fn test_get_latest_is_per_user() {
        let store = MemoryStore::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let now = Utc::now();

        store.put(alice, "alice-token", now + Duration::hours(1)).await.unwrap();
        store.put(bob, "bob-token", now + Duration::hours(2)).await.unwrap();

        assert_eq!(store.get_latest(alice).await.unwrap().token, "alice-token");
        assert!(matches!(
            store.get_latest(Uuid::new_v4()).await,
            Err(StoreError::NotFound(_))
        ));
    }
}

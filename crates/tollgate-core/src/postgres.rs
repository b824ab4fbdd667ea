//! PostgreSQL store backend
//!
//! Implements the credential and session stores using SQLx and PostgreSQL.
//! Username uniqueness is enforced by a UNIQUE constraint, so concurrent
//! registrations race inside the database and exactly one insert wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::{CredentialStore, SessionStore};
use crate::{Result, SessionToken, StoreError, User};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        username TEXT NOT NULL UNIQUE,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS session_tokens (
        id BIGSERIAL PRIMARY KEY,
        user_id UUID NOT NULL REFERENCES users(id),
        token TEXT NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS session_tokens_latest_idx
        ON session_tokens (user_id, expires_at DESC, id DESC)
    "#,
];

/// PostgreSQL credential and session store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store connection
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| StoreError::Database(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create tables and indexes if they do not exist yet
    pub async fn migrate(&self) -> Result<()> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::Database(format!("Failed to apply schema: {e}")))?;
        }

        tracing::info!("Database schema is up to date");
        Ok(())
    }
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            created_at: row.created_at,
        }
    }
}

/// Session token row from database
#[derive(Debug, FromRow)]
struct SessionRow {
    id: i64,
    user_id: Uuid,
    token: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<SessionRow> for SessionToken {
    fn from(row: SessionRow) -> Self {
        SessionToken {
            id: row.id,
            user_id: row.user_id,
            token: row.token,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false)
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create(&self, username: &str, password_hash: &str) -> Result<User> {
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (id, username, password_hash, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(username)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Conflict(format!("username {username}"))
            } else {
                StoreError::Database(format!("Failed to create user: {e}"))
            }
        })?;

        Ok(row.into())
    }

    async fn find_by_username(&self, username: &str) -> Result<User> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT id, username, password_hash, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to fetch user: {e}")))?;

        row.map(User::from)
            .ok_or_else(|| StoreError::NotFound(format!("user {username}")))
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::Database(format!("Ping failed: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn put(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<SessionToken> {
        let row: SessionRow = sqlx::query_as(
            r#"
            INSERT INTO session_tokens (user_id, token, expires_at, created_at)
            VALUES ($1, $2, $3, NOW())
            RETURNING id, user_id, token, expires_at, created_at
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to store session token: {e}")))?;

        Ok(row.into())
    }

    async fn get_latest(&self, user_id: Uuid) -> Result<SessionToken> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT id, user_id, token, expires_at, created_at
            FROM session_tokens
            WHERE user_id = $1
            ORDER BY expires_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("Failed to fetch session token: {e}")))?;

        row.map(SessionToken::from)
            .ok_or_else(|| StoreError::NotFound(format!("session for user {user_id}")))
    }
}
